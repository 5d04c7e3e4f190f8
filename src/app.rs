use crate::clock::FrameClock;
use crate::config::Settings;
use crate::eggs::{InfoText, EGGS};
use crate::gpio::ButtonSource;
use crate::grid::Grid;
use crate::input::{FrameInput, InputTranslator, StopReason};
use crate::model::{ButtonId, EggSubmenu, SaveRecord, ScreenState};
use crate::render::{Frontend, View};
use crate::sim::{Ageing, Friend, PopupMenu};
use crate::storage::SaveStore;
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Working data for whatever screen is showing. Rebuilt on every entry.
enum Scene {
    Title { since: Duration },
    Init,
    EggGrid,
    EggInfo(InfoText),
    Playground { friend: Friend, popup: PopupMenu },
    Error { frames: u32 },
}

/// The game: one screen state machine driven at a fixed frame rate.
pub(crate) struct App<'a> {
    settings: &'a Settings,
    store: SaveStore,
    record: SaveRecord,
    buttons: &'a mut dyn ButtonSource,
    frontend: &'a mut dyn Frontend,
    clock: FrameClock,
    input: InputTranslator,
    ageing: Ageing,
    state: ScreenState,
    scene: Scene,
    running: bool,
    stop: Option<StopReason>,
}

impl<'a> App<'a> {
    pub(crate) fn new(
        settings: &'a Settings,
        store: SaveStore,
        buttons: &'a mut dyn ButtonSource,
        frontend: &'a mut dyn Frontend,
    ) -> Self {
        let clock = FrameClock::new(settings.fps);
        Self::with_clock(settings, store, buttons, frontend, clock)
    }

    fn with_clock(
        settings: &'a Settings,
        store: SaveStore,
        buttons: &'a mut dyn ButtonSource,
        frontend: &'a mut dyn Frontend,
        clock: FrameClock,
    ) -> Self {
        let since = clock.now();
        Self {
            settings,
            store,
            record: SaveRecord::default(),
            buttons,
            frontend,
            clock,
            input: InputTranslator::new(),
            ageing: Ageing::default(),
            state: ScreenState::Title,
            scene: Scene::Title { since },
            running: true,
            stop: None,
        }
    }

    /// Runs until the host asks to quit or the dev code is entered. Pins are
    /// held for the whole run and released on the way out, errors included.
    pub(crate) fn run(&mut self) -> Result<Option<StopReason>> {
        self.buttons.setup();
        info!(fps = self.clock.fps(), "game started");
        let res = self.run_loop();
        self.buttons.teardown();
        res.map(|()| self.stop)
    }

    fn run_loop(&mut self) -> Result<()> {
        while self.running {
            self.frame()?;
        }
        if self.record.has_creature() {
            if let Err(e) = self.store.save(&self.record) {
                warn!("save on exit failed: {e:#}");
            }
        }
        info!(reason = ?self.stop, "game stopped");
        Ok(())
    }

    /// One pass: wait for the frame, read input, update, draw, then switch
    /// screens if the handler asked to.
    fn frame(&mut self) -> Result<()> {
        let frame_time = self.clock.tick();
        let host = self.frontend.host_events()?;
        let input = self
            .input
            .collect(&host, &mut *self.buttons, self.clock.now(), frame_time);

        if let Some(reason) = input.stop {
            self.stop = Some(reason);
            self.running = false;
            return Ok(());
        }

        let next = self.update(&input)?;
        self.draw()?;
        if let Some(next) = next {
            self.enter(next);
        }
        Ok(())
    }

    fn update(&mut self, input: &FrameInput) -> Result<Option<ScreenState>> {
        let fps = self.clock.fps();
        let grid = Grid::new(EGGS.len(), self.settings.eggs_per_row);

        let next = match (self.state, &mut self.scene) {
            (ScreenState::Title, Scene::Title { since }) => {
                let shown = self.clock.now().saturating_sub(*since);
                (shown >= Duration::from_millis(self.settings.title_ms))
                    .then_some(ScreenState::Init)
            }

            (ScreenState::Init, Scene::Init) => {
                self.record = self.store.load().context("could not load save file")?;
                if self.record.has_creature() {
                    info!(kind = %self.record.creature_kind, age = self.record.age, "welcome back");
                    Some(ScreenState::playground())
                } else {
                    Some(ScreenState::egg_select())
                }
            }

            (
                ScreenState::EggSelect {
                    submenu: EggSubmenu::Main,
                    selected,
                },
                Scene::EggGrid,
            ) => {
                let mut cursor = selected;
                let mut next = None;
                for ev in &input.events {
                    match ev.button {
                        ButtonId::JoystickLeft => cursor = grid.left(cursor),
                        ButtonId::JoystickRight => cursor = grid.right(cursor),
                        ButtonId::JoystickUp => cursor = grid.up(cursor),
                        ButtonId::JoystickDown => cursor = grid.down(cursor),
                        ButtonId::A => {
                            next = Some(ScreenState::EggSelect {
                                submenu: EggSubmenu::Info,
                                selected: cursor,
                            });
                            break;
                        }
                        _ => {}
                    }
                }
                self.state = ScreenState::EggSelect {
                    submenu: EggSubmenu::Main,
                    selected: cursor,
                };
                next
            }

            (
                ScreenState::EggSelect {
                    submenu: EggSubmenu::Info,
                    selected,
                },
                Scene::EggInfo(info),
            ) => {
                let mut next = None;
                for ev in &input.events {
                    match ev.button {
                        ButtonId::JoystickDown => info.scroll_down(),
                        ButtonId::JoystickUp => info.scroll_up(),
                        ButtonId::A => {
                            next = Some(match self.state.selected_kind() {
                                Some(kind) => {
                                    self.record.hatch(kind);
                                    self.store
                                        .save(&self.record)
                                        .context("could not save new creature")?;
                                    info!(kind, "egg chosen");
                                    ScreenState::playground()
                                }
                                None => ScreenState::Error,
                            });
                            break;
                        }
                        ButtonId::B => {
                            next = Some(ScreenState::EggSelect {
                                submenu: EggSubmenu::Main,
                                selected,
                            });
                            break;
                        }
                        _ => {}
                    }
                }
                next
            }

            (ScreenState::Playground { .. }, Scene::Playground { friend, popup }) => {
                friend.update();
                if self.ageing.update(&mut self.record, fps) {
                    match self.store.save(&self.record) {
                        Ok(()) => debug!(age = self.record.age, "autosaved"),
                        Err(e) => warn!("autosave failed: {e:#}"),
                    }
                }

                let mut next = None;
                for ev in &input.events {
                    match ev.button {
                        ButtonId::JoystickRight => popup.next(),
                        ButtonId::JoystickLeft => popup.prev(),
                        ButtonId::B => popup.toggle(),
                        ButtonId::A if popup.visible => {
                            next = Some(ScreenState::Playground {
                                submenu: popup.current(),
                            });
                            break;
                        }
                        ButtonId::A => friend.pet(),
                        _ => {}
                    }
                }
                next
            }

            (ScreenState::Error, Scene::Error { frames }) => {
                *frames += 1;
                if *frames >= fps {
                    *frames = 0;
                }
                input.pressed(ButtonId::B).then_some(ScreenState::Title)
            }

            (state, _) => {
                warn!(?state, "no handler for screen");
                Some(ScreenState::Error)
            }
        };
        Ok(next)
    }

    fn draw(&mut self) -> Result<()> {
        let grid = Grid::new(EGGS.len(), self.settings.eggs_per_row);
        let view = match (self.state, &self.scene) {
            (_, Scene::Title { .. }) => View::Title,
            (_, Scene::Init) => View::Loading,
            (ScreenState::EggSelect { selected, .. }, Scene::EggGrid) => View::EggGrid {
                eggs: &EGGS,
                grid,
                selected,
            },
            (ScreenState::EggSelect { selected, .. }, Scene::EggInfo(info))
                if selected < EGGS.len() =>
            {
                View::EggInfo {
                    egg: &EGGS[selected],
                    info,
                }
            }
            (_, Scene::Playground { friend, popup }) => View::Playground {
                record: &self.record,
                friend,
                popup,
            },
            (_, Scene::Error { frames }) => View::Error { frames: *frames },
            _ => View::Error { frames: 0 },
        };
        self.frontend.present(&view)
    }

    fn enter(&mut self, next: ScreenState) {
        let next = next.checked(EGGS.len());
        if next == ScreenState::Error {
            warn!(from = ?self.state, "entering error screen");
        } else {
            info!(from = ?self.state, to = ?next, "screen change");
        }

        self.scene = match next {
            ScreenState::Title => Scene::Title {
                since: self.clock.now(),
            },
            ScreenState::Init => Scene::Init,
            ScreenState::EggSelect {
                submenu: EggSubmenu::Main,
                ..
            } => Scene::EggGrid,
            ScreenState::EggSelect {
                submenu: EggSubmenu::Info,
                selected,
            } => Scene::EggInfo(InfoText::new(EGGS[selected].description)),
            ScreenState::Playground { .. } => Scene::Playground {
                friend: Friend::new(&self.record, self.clock.fps()),
                popup: PopupMenu::default(),
            },
            ScreenState::Error => Scene::Error { frames: 0 },
        };
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::NullButtons;
    use crate::input::HostEvent;
    use crate::model::{PlaygroundSubmenu, DEV_CODE};
    use crate::render::Scripted;
    use std::fs;
    use tempfile::TempDir;

    fn save_path(tmp: &TempDir) -> std::path::PathBuf {
        tmp.path().join("save.json")
    }

    fn app<'a>(
        tmp: &TempDir,
        settings: &'a Settings,
        buttons: &'a mut NullButtons,
        frontend: &'a mut Scripted,
    ) -> App<'a> {
        let store = SaveStore::new(save_path(tmp));
        let clock = FrameClock::stepped(settings.fps);
        App::with_clock(settings, store, buttons, frontend, clock)
    }

    fn frames(app: &mut App<'_>, n: usize) {
        for _ in 0..n {
            app.frame().unwrap();
        }
    }

    fn seed_creature(tmp: &TempDir, kind: &str) {
        let mut r = SaveRecord::default();
        r.hatch(kind);
        SaveStore::new(save_path(tmp)).save(&r).unwrap();
    }

    fn saved(tmp: &TempDir) -> SaveRecord {
        SaveStore::new(save_path(tmp)).load().unwrap()
    }

    #[test]
    fn title_gives_way_to_init_after_a_second() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::default();
        let (mut b, mut f) = (NullButtons, Scripted::default());
        let mut app = app(&tmp, &settings, &mut b, &mut f);
        frames(&mut app, 15);
        assert_eq!(app.state, ScreenState::Title);
        frames(&mut app, 1);
        assert_eq!(app.state, ScreenState::Init);
    }

    #[test]
    fn fresh_install_goes_to_egg_select() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::default();
        let (mut b, mut f) = (NullButtons, Scripted::default());
        let mut app = app(&tmp, &settings, &mut b, &mut f);
        app.enter(ScreenState::Init);
        frames(&mut app, 1);
        assert_eq!(app.state, ScreenState::egg_select());
        assert!(save_path(&tmp).exists());
    }

    #[test]
    fn existing_creature_goes_to_playground() {
        let tmp = TempDir::new().unwrap();
        seed_creature(&tmp, "blue");
        let settings = Settings::default();
        let (mut b, mut f) = (NullButtons, Scripted::default());
        let mut app = app(&tmp, &settings, &mut b, &mut f);
        app.enter(ScreenState::Init);
        frames(&mut app, 2);
        assert_eq!(app.state, ScreenState::playground());
        assert_eq!(app.record.creature_kind, "blue");
    }

    #[test]
    fn choosing_an_egg_is_persisted() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::default();
        let (mut b, mut f) = (NullButtons, Scripted::default());
        f.idle(1);
        f.press(ButtonId::JoystickRight);
        f.press(ButtonId::A);
        f.press(ButtonId::A);
        let mut app = app(&tmp, &settings, &mut b, &mut f);
        app.enter(ScreenState::Init);
        frames(&mut app, 7);
        assert_eq!(
            app.state,
            ScreenState::EggSelect {
                submenu: EggSubmenu::Info,
                selected: 1
            }
        );
        frames(&mut app, 3);
        assert_eq!(app.state, ScreenState::playground());

        let r = saved(&tmp);
        assert_eq!(r.creature_kind, "blue");
        assert_eq!(r.evolution_stage, "egg");
        assert_eq!((r.health, r.hunger, r.happiness), (10, 10, 10));
    }

    #[test]
    fn back_from_info_keeps_the_cursor() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::default();
        let (mut b, mut f) = (NullButtons, Scripted::default());
        f.press(ButtonId::JoystickRight);
        f.press(ButtonId::JoystickRight);
        f.press(ButtonId::A);
        f.press(ButtonId::JoystickDown);
        f.press(ButtonId::B);
        let mut app = app(&tmp, &settings, &mut b, &mut f);
        app.enter(ScreenState::egg_select());
        frames(&mut app, 15);
        assert_eq!(
            app.state,
            ScreenState::EggSelect {
                submenu: EggSubmenu::Main,
                selected: 2
            }
        );
        drop(app);
        assert!(f.shown.contains(&"egg info"));
    }

    #[test]
    fn playground_ages_and_autosaves() {
        let tmp = TempDir::new().unwrap();
        seed_creature(&tmp, "rainbow");
        let settings = Settings::default();
        let (mut b, mut f) = (NullButtons, Scripted::default());
        let mut app = app(&tmp, &settings, &mut b, &mut f);
        app.enter(ScreenState::Init);
        frames(&mut app, 1);
        assert_eq!(app.state, ScreenState::playground());

        frames(&mut app, 159);
        assert_eq!(app.record.age, 9);
        assert_eq!(saved(&tmp).age, 0);
        frames(&mut app, 1);
        assert_eq!(app.record.age, 10);
        assert_eq!(saved(&tmp).age, 10);
    }

    #[test]
    fn failed_autosave_keeps_playing() {
        let tmp = TempDir::new().unwrap();
        seed_creature(&tmp, "blue");
        let settings = Settings::default();
        let (mut b, mut f) = (NullButtons, Scripted::default());
        let mut app = app(&tmp, &settings, &mut b, &mut f);
        app.enter(ScreenState::Init);
        frames(&mut app, 1);
        // the temp file can't be written when a directory sits in its place
        fs::create_dir(tmp.path().join("save.json.tmp")).unwrap();
        frames(&mut app, 160);
        assert_eq!(app.record.age, 10);
        assert_eq!(app.state, ScreenState::playground());
    }

    #[test]
    fn failed_commit_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::default();
        let (mut b, mut f) = (NullButtons, Scripted::default());
        f.press(ButtonId::A);
        f.press(ButtonId::A);
        let mut app = app(&tmp, &settings, &mut b, &mut f);
        app.enter(ScreenState::egg_select());
        frames(&mut app, 3);
        fs::create_dir(tmp.path().join("save.json.tmp")).unwrap();
        assert!(app.frame().is_err());
    }

    #[test]
    fn popup_category_routes_to_error_and_back_to_title() {
        let tmp = TempDir::new().unwrap();
        seed_creature(&tmp, "blue");
        let settings = Settings::default();
        let (mut b, mut f) = (NullButtons, Scripted::default());
        f.press(ButtonId::B);
        f.press(ButtonId::JoystickRight);
        f.press(ButtonId::A);
        let mut app = app(&tmp, &settings, &mut b, &mut f);
        app.enter(ScreenState::playground());
        frames(&mut app, 9);
        assert_eq!(app.state, ScreenState::Error);
    }

    #[test]
    fn error_screen_b_returns_to_title() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::default();
        let (mut b, mut f) = (NullButtons, Scripted::default());
        f.idle(20);
        f.press(ButtonId::B);
        let mut app = app(&tmp, &settings, &mut b, &mut f);
        app.enter(ScreenState::Error);
        frames(&mut app, 20);
        match app.scene {
            Scene::Error { frames } => assert_eq!(frames, 20 - 16),
            _ => panic!("expected error scene"),
        }
        frames(&mut app, 1);
        assert_eq!(app.state, ScreenState::Title);
    }

    #[test]
    fn unhandled_states_become_error() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::default();
        let (mut b, mut f) = (NullButtons, Scripted::default());
        let mut app = app(&tmp, &settings, &mut b, &mut f);
        app.enter(ScreenState::Playground {
            submenu: PlaygroundSubmenu::Stats,
        });
        assert_eq!(app.state, ScreenState::Error);
        app.enter(ScreenState::EggSelect {
            submenu: EggSubmenu::Info,
            selected: 9,
        });
        assert_eq!(app.state, ScreenState::Error);
    }

    #[test]
    fn dev_code_ends_the_run() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::default();
        let (mut b, mut f) = (NullButtons, Scripted::default());
        for button in DEV_CODE {
            f.press(button);
        }
        f.press(ButtonId::A);
        let mut app = app(&tmp, &settings, &mut b, &mut f);
        assert_eq!(app.run().unwrap(), Some(StopReason::DevCode));
        drop(app);
        assert!(!f.script.is_empty());
    }

    #[test]
    fn host_quit_saves_the_creature() {
        let tmp = TempDir::new().unwrap();
        seed_creature(&tmp, "blue");
        let settings = Settings::default();
        let (mut b, mut f) = (NullButtons, Scripted::default());
        f.idle(16 + 1 + 16);
        f.script.push_back(vec![HostEvent::Quit]);
        let mut app = app(&tmp, &settings, &mut b, &mut f);
        assert_eq!(app.run().unwrap(), Some(StopReason::HostQuit));
        assert_eq!(app.state, ScreenState::playground());
        drop(app);
        assert!(saved(&tmp).age >= 1);
    }
}
