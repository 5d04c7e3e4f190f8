use crate::app::App;
use crate::clock::FrameClock;
use crate::config::Settings;
use crate::gpio::ButtonSource;
use crate::input::{InputTranslator, StopReason};
use crate::model::ButtonId;
use crate::render::{Frontend, View};
use crate::storage::SaveStore;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::process::Command;
use tracing::{error, info, warn};

pub(crate) const EXIT_OK: u8 = 0;
/// Asks the supervisor script to launch the menu again.
pub(crate) const EXIT_RESTART: u8 = 3;

const MENU_FPS: u32 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MenuId {
    Main,
    Shutdown,
    Restart,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    StartGame,
    RunButtonTest,
    RestartMenu,
    ChangeMenu(MenuId),
    Shutdown,
    Restart,
    Quit,
}

pub(crate) struct MenuOption {
    pub(crate) text: &'static str,
    pub(crate) action: Action,
}

const fn opt(text: &'static str, action: Action) -> MenuOption {
    MenuOption { text, action }
}

static MAIN_OPTIONS: [MenuOption; 6] = [
    opt("Start Game", Action::StartGame),
    opt("Button Test", Action::RunButtonTest),
    opt("Restart Dev Menu", Action::RestartMenu),
    opt("Shutdown Pi", Action::ChangeMenu(MenuId::Shutdown)),
    opt("Restart Pi", Action::ChangeMenu(MenuId::Restart)),
    opt("Quit Dev Menu", Action::ChangeMenu(MenuId::Quit)),
];

static SHUTDOWN_OPTIONS: [MenuOption; 2] = [
    opt("No", Action::ChangeMenu(MenuId::Main)),
    opt("Yes", Action::Shutdown),
];

static RESTART_OPTIONS: [MenuOption; 2] = [
    opt("No", Action::ChangeMenu(MenuId::Main)),
    opt("Yes", Action::Restart),
];

static QUIT_OPTIONS: [MenuOption; 2] = [
    opt("No", Action::ChangeMenu(MenuId::Main)),
    opt("Yes", Action::Quit),
];

/// A titled list with one selected option.
pub(crate) struct Menu {
    id: MenuId,
    title: String,
    options: &'static [MenuOption],
    selection: usize,
}

impl Menu {
    pub(crate) fn new(id: MenuId) -> Self {
        let (title, options): (String, &'static [MenuOption]) = match id {
            MenuId::Main => (
                format!(
                    "Pocket Friends Dev Menu\nGame Version {}",
                    env!("CARGO_PKG_VERSION")
                ),
                &MAIN_OPTIONS,
            ),
            MenuId::Shutdown => (
                "Are you sure you want to shutdown?".to_string(),
                &SHUTDOWN_OPTIONS,
            ),
            MenuId::Restart => (
                "Are you sure you want to restart?".to_string(),
                &RESTART_OPTIONS,
            ),
            MenuId::Quit => ("Are you sure you want to exit?".to_string(), &QUIT_OPTIONS),
        };
        Self {
            id,
            title,
            options,
            selection: 0,
        }
    }

    pub(crate) fn id(&self) -> MenuId {
        self.id
    }

    pub(crate) fn title(&self) -> &str {
        &self.title
    }

    pub(crate) fn options(&self) -> &[MenuOption] {
        self.options
    }

    pub(crate) fn selection(&self) -> usize {
        self.selection
    }

    pub(crate) fn select_next(&mut self) {
        self.selection = (self.selection + 1) % self.options.len();
    }

    pub(crate) fn select_prev(&mut self) {
        let n = self.options.len();
        self.selection = (self.selection + n - 1) % n;
    }

    pub(crate) fn selected_action(&self) -> Action {
        self.options[self.selection].action
    }
}

/// Runs the privileged commands behind the power options.
pub(crate) trait Power {
    fn run(&mut self, args: &[&str]) -> Result<()>;
}

pub(crate) struct Sudo;

impl Power for Sudo {
    fn run(&mut self, args: &[&str]) -> Result<()> {
        let status = Command::new("sudo")
            .args(args)
            .status()
            .context("could not run sudo")?;
        if !status.success() {
            bail!("sudo {} exited with {status}", args.join(" "));
        }
        Ok(())
    }
}

/// On-device maintenance menu. Owns the pins between game runs.
pub(crate) struct DevMenu<'a> {
    settings: &'a Settings,
    save_path: PathBuf,
    buttons: &'a mut dyn ButtonSource,
    frontend: &'a mut dyn Frontend,
    power: &'a mut dyn Power,
    clock: FrameClock,
    input: InputTranslator,
    menu: Menu,
}

impl<'a> DevMenu<'a> {
    pub(crate) fn new(
        settings: &'a Settings,
        save_path: PathBuf,
        buttons: &'a mut dyn ButtonSource,
        frontend: &'a mut dyn Frontend,
        power: &'a mut dyn Power,
    ) -> Self {
        Self {
            settings,
            save_path,
            buttons,
            frontend,
            power,
            clock: FrameClock::new(MENU_FPS),
            input: InputTranslator::new(),
            menu: Menu::new(MenuId::Main),
        }
    }

    /// Returns the process exit code.
    pub(crate) fn run(&mut self) -> Result<u8> {
        self.buttons.setup();
        info!("dev menu started");
        let res = self.run_loop();
        self.buttons.teardown();
        res
    }

    fn run_loop(&mut self) -> Result<u8> {
        loop {
            let frame_time = self.clock.tick();
            let host = self.frontend.host_events()?;
            let input = self
                .input
                .collect(&host, &mut *self.buttons, self.clock.now(), frame_time);
            if input.stop == Some(StopReason::HostQuit) {
                return Ok(EXIT_OK);
            }

            for ev in &input.events {
                match ev.button {
                    ButtonId::JoystickDown => self.menu.select_next(),
                    ButtonId::JoystickUp => self.menu.select_prev(),
                    ButtonId::A => {
                        if let Some(code) = self.perform(self.menu.selected_action())? {
                            info!(code, "dev menu exiting");
                            return Ok(code);
                        }
                        break;
                    }
                    _ => {}
                }
            }

            self.frontend.present(&View::DevMenu { menu: &self.menu })?;
        }
    }

    fn perform(&mut self, action: Action) -> Result<Option<u8>> {
        info!(?action, menu = ?self.menu.id(), "dev menu action");
        match action {
            Action::StartGame => {
                self.buttons.teardown();
                let store = SaveStore::new(self.save_path.clone());
                let res = App::new(self.settings, store, &mut *self.buttons, &mut *self.frontend)
                    .run();
                if let Err(e) = res {
                    error!("game stopped with an error: {e:#}");
                }
                self.buttons.setup();
            }
            Action::RunButtonTest => {
                self.buttons.teardown();
                button_test(&mut *self.buttons, &mut *self.frontend, self.settings.fps)?;
                self.buttons.setup();
            }
            Action::RestartMenu => return Ok(Some(EXIT_RESTART)),
            Action::ChangeMenu(id) => self.menu = Menu::new(id),
            Action::Shutdown => self.power_off(&["shutdown", "now"]),
            Action::Restart => self.power_off(&["reboot"]),
            Action::Quit => return Ok(Some(EXIT_OK)),
        }
        // input that arrived during a nested run belongs to it
        self.input = InputTranslator::new();
        Ok(None)
    }

    fn power_off(&mut self, args: &[&str]) {
        if let Err(e) = self.power.run(args) {
            warn!("{e:#}");
        }
    }
}

/// Lists every accepted press until the dev code or a host quit.
fn button_test(buttons: &mut dyn ButtonSource, frontend: &mut dyn Frontend, fps: u32) -> Result<()> {
    let mut clock = FrameClock::new(fps);
    run_button_test(buttons, frontend, &mut clock)
}

fn run_button_test(
    buttons: &mut dyn ButtonSource,
    frontend: &mut dyn Frontend,
    clock: &mut FrameClock,
) -> Result<()> {
    let mut input = InputTranslator::new();
    let mut log: Vec<String> = Vec::new();
    buttons.setup();
    info!("button test started");

    let res = loop {
        let frame_time = clock.tick();
        let host = match frontend.host_events() {
            Ok(host) => host,
            Err(e) => break Err(e),
        };
        let out = input.collect(&host, buttons, clock.now(), frame_time);
        for ev in &out.events {
            info!(button = ev.button.label(), at_ms = ev.at.as_millis() as u64, "button test press");
            log.push(format!("event: {}", ev.button.label()));
        }
        if out.stop.is_some() {
            break Ok(());
        }
        if let Err(e) = frontend.present(&View::ButtonTest { log: &log }) {
            break Err(e);
        }
    };

    buttons.teardown();
    res
}
