use crate::model::ButtonId;
use anyhow::Result;
use std::fs;
use tracing::{debug, info, warn};

/// Edge-detected button polling. Whoever holds the pins must `teardown`
/// before anyone else calls `setup`.
pub(crate) trait ButtonSource {
    /// Acquire the pins. Calling it twice is harmless.
    fn setup(&mut self);
    fn teardown(&mut self);
    /// True once for every press (high to low) since the previous call for
    /// `button`.
    fn poll_pressed(&mut self, button: ButtonId) -> bool;
}

/// Stand-in when there is no HAT attached.
#[derive(Default)]
pub(crate) struct NullButtons;

impl ButtonSource for NullButtons {
    fn setup(&mut self) {}
    fn teardown(&mut self) {}
    fn poll_pressed(&mut self, _button: ButtonId) -> bool {
        false
    }
}

const DEVICE_MODEL: &str = "/proc/device-tree/model";

/// An input line whose falling edges are queued by the kernel.
pub(crate) trait EdgeLine {
    /// Takes one queued falling edge, if there is one. Never blocks.
    fn take_falling(&mut self) -> Result<bool>;
}

/// Opens a button's line with falling-edge events enabled.
pub(crate) trait LineOpener {
    type Line: EdgeLine;
    fn open(&mut self, button: ButtonId) -> Result<Self::Line>;
}

/// Buttons whose presses are latched where they happen, so a tap that is
/// over before the next frame still counts.
pub(crate) struct LatchedButtons<O: LineOpener> {
    opener: O,
    lines: Vec<(ButtonId, O::Line)>,
}

impl<O: LineOpener> LatchedButtons<O> {
    pub(crate) fn new(opener: O) -> Self {
        Self {
            opener,
            lines: Vec::new(),
        }
    }
}

impl<O: LineOpener> ButtonSource for LatchedButtons<O> {
    fn setup(&mut self) {
        if !self.lines.is_empty() {
            return;
        }
        for button in ButtonId::ALL {
            match self.opener.open(button) {
                Ok(line) => self.lines.push((button, line)),
                Err(e) => warn!(
                    button = button.label(),
                    pin = button.board_pin(),
                    error = %e,
                    "gpio setup failed"
                ),
            }
        }
        debug!(lines = self.lines.len(), "gpio lines ready");
    }

    fn teardown(&mut self) {
        // dropping a line hands the pin back
        self.lines.clear();
    }

    fn poll_pressed(&mut self, button: ButtonId) -> bool {
        let Some((_, line)) = self.lines.iter_mut().find(|(b, _)| *b == button) else {
            return false;
        };
        match line.take_falling() {
            Ok(fell) => fell,
            Err(e) => {
                debug!(button = button.label(), error = %e, "gpio poll failed");
                false
            }
        }
    }
}

#[cfg(target_os = "linux")]
mod pi {
    use super::{EdgeLine, LineOpener};
    use crate::model::ButtonId;
    use anyhow::{Context, Result};
    use rppal::gpio::{Gpio, InputPin, Trigger};
    use std::time::Duration;

    /// The Pi's own GPIO block, addressed by BCM line.
    pub(crate) struct PiLines {
        gpio: Gpio,
    }

    impl PiLines {
        pub(crate) fn new() -> Result<Self> {
            let gpio = Gpio::new().context("could not open the GPIO device")?;
            Ok(Self { gpio })
        }
    }

    impl LineOpener for PiLines {
        type Line = InputPin;

        fn open(&mut self, button: ButtonId) -> Result<InputPin> {
            let bcm = button.bcm_line() as u8;
            let mut pin = self
                .gpio
                .get(bcm)
                .with_context(|| format!("gpio line {bcm}"))?
                .into_input_pullup();
            pin.set_interrupt(Trigger::FallingEdge)
                .with_context(|| format!("edge events on gpio line {bcm}"))?;
            Ok(pin)
        }
    }

    impl EdgeLine for InputPin {
        fn take_falling(&mut self) -> Result<bool> {
            Ok(self.poll_interrupt(false, Some(Duration::ZERO))?.is_some())
        }
    }
}

/// Picks the real pins on a Raspberry Pi and the stub everywhere else.
pub(crate) fn detect() -> Box<dyn ButtonSource> {
    let model = fs::read_to_string(DEVICE_MODEL).unwrap_or_default();
    if !model.contains("Raspberry Pi") {
        info!("no GPIO hardware found, using keyboard only");
        return Box::new(NullButtons);
    }
    open_pi(model.trim_end_matches('\0'))
}

#[cfg(target_os = "linux")]
fn open_pi(model: &str) -> Box<dyn ButtonSource> {
    match pi::PiLines::new() {
        Ok(lines) => {
            info!(model, "using GPIO buttons");
            Box::new(LatchedButtons::new(lines))
        }
        Err(e) => {
            warn!(model, "{e:#}, using keyboard only");
            Box::new(NullButtons)
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn open_pi(model: &str) -> Box<dyn ButtonSource> {
    warn!(model, "GPIO is only supported on Linux, using keyboard only");
    Box::new(NullButtons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    #[derive(Default)]
    struct Pad {
        high: bool,
        open: bool,
        queued: u32,
    }

    /// Plays the kernel's part: while a line is open, every high to low
    /// change is queued until read.
    #[derive(Clone, Default)]
    struct Board {
        pads: Rc<RefCell<HashMap<ButtonId, Pad>>>,
        broken: Option<ButtonId>,
        opens: Rc<RefCell<u32>>,
    }

    impl Board {
        fn set_level(&self, button: ButtonId, high: bool) {
            let mut pads = self.pads.borrow_mut();
            let pad = pads.entry(button).or_insert(Pad {
                high: true,
                ..Pad::default()
            });
            if pad.open && pad.high && !high {
                pad.queued += 1;
            }
            pad.high = high;
        }

        fn tap(&self, button: ButtonId) {
            self.set_level(button, false);
            self.set_level(button, true);
        }

        fn is_open(&self, button: ButtonId) -> bool {
            self.pads.borrow().get(&button).is_some_and(|p| p.open)
        }
    }

    struct FakeLine {
        button: ButtonId,
        board: Board,
    }

    impl EdgeLine for FakeLine {
        fn take_falling(&mut self) -> Result<bool> {
            let mut pads = self.board.pads.borrow_mut();
            let Some(pad) = pads.get_mut(&self.button) else {
                return Ok(false);
            };
            if pad.queued == 0 {
                return Ok(false);
            }
            pad.queued -= 1;
            Ok(true)
        }
    }

    impl Drop for FakeLine {
        fn drop(&mut self) {
            if let Some(pad) = self.board.pads.borrow_mut().get_mut(&self.button) {
                pad.open = false;
                pad.queued = 0;
            }
        }
    }

    impl LineOpener for Board {
        type Line = FakeLine;

        fn open(&mut self, button: ButtonId) -> Result<FakeLine> {
            if self.broken == Some(button) {
                bail!("line busy");
            }
            *self.opens.borrow_mut() += 1;
            let mut pads = self.pads.borrow_mut();
            let pad = pads.entry(button).or_insert(Pad {
                high: true,
                ..Pad::default()
            });
            pad.open = true;
            Ok(FakeLine {
                button,
                board: self.clone(),
            })
        }
    }

    fn latched() -> (Board, LatchedButtons<Board>) {
        let board = Board::default();
        let mut s = LatchedButtons::new(board.clone());
        s.setup();
        (board, s)
    }

    #[test]
    fn null_source_never_reports() {
        let mut s = NullButtons;
        s.setup();
        for b in ButtonId::ALL {
            assert!(!s.poll_pressed(b));
        }
        s.teardown();
    }

    #[test]
    fn tap_between_polls_is_reported() {
        let (board, mut s) = latched();
        assert!(!s.poll_pressed(ButtonId::A));
        board.tap(ButtonId::A);
        assert!(s.poll_pressed(ButtonId::A));
        assert!(!s.poll_pressed(ButtonId::A));
        assert!(!s.poll_pressed(ButtonId::B));
    }

    #[test]
    fn every_tap_between_polls_counts() {
        let (board, mut s) = latched();
        board.tap(ButtonId::JoystickUp);
        board.tap(ButtonId::JoystickUp);
        assert!(s.poll_pressed(ButtonId::JoystickUp));
        assert!(s.poll_pressed(ButtonId::JoystickUp));
        assert!(!s.poll_pressed(ButtonId::JoystickUp));
    }

    #[test]
    fn held_button_reports_once() {
        let (board, mut s) = latched();
        board.set_level(ButtonId::B, false);
        assert!(s.poll_pressed(ButtonId::B));
        assert!(!s.poll_pressed(ButtonId::B));
        board.set_level(ButtonId::B, true);
        assert!(!s.poll_pressed(ButtonId::B));
    }

    #[test]
    fn setup_is_idempotent() {
        let (board, mut s) = latched();
        s.setup();
        assert_eq!(*board.opens.borrow(), ButtonId::ALL.len() as u32);
        assert_eq!(s.lines.len(), ButtonId::ALL.len());
    }

    #[test]
    fn teardown_releases_lines() {
        let (board, mut s) = latched();
        board.tap(ButtonId::B);
        s.teardown();
        assert!(!board.is_open(ButtonId::B));
        board.tap(ButtonId::B);
        assert!(!s.poll_pressed(ButtonId::B));

        // the next holder starts clean
        s.setup();
        assert!(!s.poll_pressed(ButtonId::B));
    }

    #[test]
    fn broken_line_is_skipped() {
        let board = Board {
            broken: Some(ButtonId::JoystickIn),
            ..Board::default()
        };
        let mut s = LatchedButtons::new(board.clone());
        s.setup();
        assert_eq!(s.lines.len(), ButtonId::ALL.len() - 1);
        board.tap(ButtonId::JoystickIn);
        board.tap(ButtonId::A);
        assert!(!s.poll_pressed(ButtonId::JoystickIn));
        assert!(s.poll_pressed(ButtonId::A));
    }
}
