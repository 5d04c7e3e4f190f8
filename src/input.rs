use crate::gpio::ButtonSource;
use crate::model::{ButtonId, InputEvent, DEV_CODE};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info};

/// What the host window/terminal can tell us.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HostEvent {
    Press(ButtonId),
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StopReason {
    HostQuit,
    DevCode,
}

#[derive(Debug, Default)]
pub(crate) struct FrameInput {
    pub(crate) events: Vec<InputEvent>,
    pub(crate) stop: Option<StopReason>,
}

impl FrameInput {
    pub(crate) fn pressed(&self, button: ButtonId) -> bool {
        self.events.iter().any(|e| e.button == button)
    }
}

/// Merges pin polling and host key presses into one debounced stream and
/// watches it for the dev code.
pub(crate) struct InputTranslator {
    last_accepted: Option<Duration>,
    log: VecDeque<ButtonId>,
}

impl InputTranslator {
    pub(crate) fn new() -> Self {
        Self {
            last_accepted: None,
            log: VecDeque::with_capacity(DEV_CODE.len()),
        }
    }

    /// Everything accepted this frame: host events first, then each pin in
    /// `ButtonId::ALL` order.
    pub(crate) fn collect(
        &mut self,
        host: &[HostEvent],
        source: &mut dyn ButtonSource,
        now: Duration,
        frame_time: Duration,
    ) -> FrameInput {
        let mut out = FrameInput::default();

        for ev in host {
            match *ev {
                HostEvent::Quit => {
                    info!("quit requested by host");
                    out.stop.get_or_insert(StopReason::HostQuit);
                }
                HostEvent::Press(button) => self.activate(button, now, frame_time, &mut out),
            }
        }

        for button in ButtonId::ALL {
            if source.poll_pressed(button) {
                self.activate(button, now, frame_time, &mut out);
            }
        }

        out
    }

    pub(crate) fn activate(
        &mut self,
        button: ButtonId,
        now: Duration,
        frame_time: Duration,
        out: &mut FrameInput,
    ) {
        if let Some(last) = self.last_accepted {
            if now.saturating_sub(last) <= frame_time * 2 {
                debug!(button = button.label(), "press dropped by debounce");
                return;
            }
        }
        self.last_accepted = Some(now);

        if self.log.len() == DEV_CODE.len() {
            self.log.pop_front();
        }
        self.log.push_back(button);
        out.events.push(InputEvent { button, at: now });

        if self.log.iter().eq(DEV_CODE.iter()) {
            info!("dev code entered");
            out.stop.get_or_insert(StopReason::DevCode);
        }
    }
}

pub(crate) fn map_key(key: KeyEvent) -> Option<HostEvent> {
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
    {
        return Some(HostEvent::Quit);
    }
    let button = match key.code {
        KeyCode::Esc => return Some(HostEvent::Quit),
        KeyCode::Char('a') | KeyCode::Char('A') => ButtonId::A,
        KeyCode::Char('b') | KeyCode::Char('B') => ButtonId::B,
        KeyCode::Char('.') => ButtonId::JoystickIn,
        KeyCode::Up => ButtonId::JoystickUp,
        KeyCode::Down => ButtonId::JoystickDown,
        KeyCode::Left => ButtonId::JoystickLeft,
        KeyCode::Right => ButtonId::JoystickRight,
        _ => return None,
    };
    Some(HostEvent::Press(button))
}

pub(crate) fn collect_host_nonblocking() -> anyhow::Result<Vec<HostEvent>> {
    let mut out = Vec::new();

    while event::poll(Duration::ZERO)? {
        if let Event::Key(k) = event::read()? {
            if k.kind == KeyEventKind::Press {
                if let Some(ev) = map_key(k) {
                    out.push(ev);
                }
                if out.len() >= 32 {
                    break;
                }
            }
        }
    }
    Ok(out)
}
