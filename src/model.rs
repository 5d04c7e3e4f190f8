use serde::{Deserialize, Serialize};
use std::time::Duration;

pub(crate) const SCHEMA_VERSION: u32 = 1;

/// Width of the logical screen in game units; everything on the playground is
/// laid out against this.
pub(crate) const GAME_RES: i32 = 80;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum ButtonId {
    A,
    B,
    JoystickIn,
    JoystickUp,
    JoystickDown,
    JoystickLeft,
    JoystickRight,
}

impl ButtonId {
    pub(crate) const ALL: [ButtonId; 7] = [
        ButtonId::A,
        ButtonId::B,
        ButtonId::JoystickIn,
        ButtonId::JoystickUp,
        ButtonId::JoystickDown,
        ButtonId::JoystickLeft,
        ButtonId::JoystickRight,
    ];

    /// Physical pin on the HAT header (BOARD numbering).
    pub(crate) fn board_pin(self) -> u32 {
        match self {
            ButtonId::A => 31,
            ButtonId::B => 29,
            ButtonId::JoystickIn => 7,
            ButtonId::JoystickUp => 11,
            ButtonId::JoystickDown => 15,
            ButtonId::JoystickLeft => 13,
            ButtonId::JoystickRight => 16,
        }
    }

    /// Same pin in the SoC's own numbering, which is what the GPIO driver wants.
    pub(crate) fn bcm_line(self) -> u32 {
        match self {
            ButtonId::A => 6,
            ButtonId::B => 5,
            ButtonId::JoystickIn => 4,
            ButtonId::JoystickUp => 17,
            ButtonId::JoystickDown => 22,
            ButtonId::JoystickLeft => 27,
            ButtonId::JoystickRight => 23,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            ButtonId::A => "a",
            ButtonId::B => "b",
            ButtonId::JoystickIn => "j_i",
            ButtonId::JoystickUp => "j_u",
            ButtonId::JoystickDown => "j_d",
            ButtonId::JoystickLeft => "j_l",
            ButtonId::JoystickRight => "j_r",
        }
    }
}

/// Down, Down, Up, Up, Down, Down, Up, Up, A, A, B
pub(crate) const DEV_CODE: [ButtonId; 11] = [
    ButtonId::JoystickDown,
    ButtonId::JoystickDown,
    ButtonId::JoystickUp,
    ButtonId::JoystickUp,
    ButtonId::JoystickDown,
    ButtonId::JoystickDown,
    ButtonId::JoystickUp,
    ButtonId::JoystickUp,
    ButtonId::A,
    ButtonId::A,
    ButtonId::B,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct InputEvent {
    pub(crate) button: ButtonId,
    /// Time since the frame clock started.
    pub(crate) at: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SaveRecord {
    pub(crate) schema_version: u32,
    pub(crate) time_elapsed: u64,
    pub(crate) creature_kind: String,
    pub(crate) age: u32,
    pub(crate) health: i32,
    pub(crate) hunger: i32,
    pub(crate) happiness: i32,
    pub(crate) care_counter: i32,
    pub(crate) missed_care: i32,
    pub(crate) adult_variant: i32,
    pub(crate) evolution_stage: String,
}

impl Default for SaveRecord {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            time_elapsed: 0,
            creature_kind: String::new(),
            age: 0,
            health: 0,
            hunger: 0,
            happiness: 0,
            care_counter: 0,
            missed_care: 0,
            adult_variant: 0,
            evolution_stage: String::new(),
        }
    }
}

impl SaveRecord {
    pub(crate) fn has_creature(&self) -> bool {
        !self.creature_kind.is_empty()
    }

    pub(crate) fn is_egg(&self) -> bool {
        self.evolution_stage == "egg"
    }

    /// Fills in a freshly hatched creature of the given kind.
    pub(crate) fn hatch(&mut self, kind: &str) {
        self.creature_kind = kind.to_string();
        self.health = 10;
        self.hunger = 10;
        self.happiness = 10;
        self.evolution_stage = "egg".to_string();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EggSubmenu {
    Main,
    Info,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PlaygroundSubmenu {
    Main,
    Food,
    Training,
    Stats,
    Games,
    Sleep,
}

impl PlaygroundSubmenu {
    /// Popup icons in display order.
    pub(crate) const ICONS: [PlaygroundSubmenu; 5] = [
        PlaygroundSubmenu::Food,
        PlaygroundSubmenu::Training,
        PlaygroundSubmenu::Stats,
        PlaygroundSubmenu::Games,
        PlaygroundSubmenu::Sleep,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            PlaygroundSubmenu::Main => "Main",
            PlaygroundSubmenu::Food => "Food",
            PlaygroundSubmenu::Training => "Train",
            PlaygroundSubmenu::Stats => "Stats",
            PlaygroundSubmenu::Games => "Play",
            PlaygroundSubmenu::Sleep => "Sleep",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ScreenState {
    Title,
    Init,
    EggSelect {
        submenu: EggSubmenu,
        selected: usize,
    },
    Playground {
        submenu: PlaygroundSubmenu,
    },
    Error,
}

impl ScreenState {
    pub(crate) fn egg_select() -> Self {
        ScreenState::EggSelect {
            submenu: EggSubmenu::Main,
            selected: 0,
        }
    }

    pub(crate) fn playground() -> Self {
        ScreenState::Playground {
            submenu: PlaygroundSubmenu::Main,
        }
    }

    /// True for every (screen, submenu) pair the machine has a handler for.
    pub(crate) fn is_handled(&self, egg_count: usize) -> bool {
        match *self {
            ScreenState::Title | ScreenState::Init | ScreenState::Error => true,
            ScreenState::EggSelect { selected, .. } => selected < egg_count,
            ScreenState::Playground { submenu } => submenu == PlaygroundSubmenu::Main,
        }
    }

    /// Routes anything without a handler to `Error`.
    pub(crate) fn checked(self, egg_count: usize) -> Self {
        if self.is_handled(egg_count) {
            self
        } else {
            ScreenState::Error
        }
    }

    /// The kind string of the egg under the cursor, if this is an egg screen.
    pub(crate) fn selected_kind(&self) -> Option<&'static str> {
        match *self {
            ScreenState::EggSelect { selected, .. } => {
                crate::eggs::EGGS.get(selected).map(|e| e.kind)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_has_no_creature() {
        let r = SaveRecord::default();
        assert!(!r.has_creature());
        assert_eq!(r.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn hatch_sets_starting_stats() {
        let mut r = SaveRecord::default();
        r.hatch("blue");
        assert!(r.has_creature());
        assert!(r.is_egg());
        assert_eq!((r.health, r.hunger, r.happiness), (10, 10, 10));
    }

    #[test]
    fn playground_categories_route_to_error() {
        for icon in PlaygroundSubmenu::ICONS {
            let st = ScreenState::Playground { submenu: icon };
            assert_eq!(st.checked(3), ScreenState::Error);
        }
        assert_eq!(ScreenState::playground().checked(3), ScreenState::playground());
    }

    #[test]
    fn egg_select_out_of_range_routes_to_error() {
        let st = ScreenState::EggSelect {
            submenu: EggSubmenu::Info,
            selected: 7,
        };
        assert_eq!(st.checked(3), ScreenState::Error);
        assert_eq!(ScreenState::egg_select().checked(3), ScreenState::egg_select());
    }

    #[test]
    fn dev_code_is_eleven_presses() {
        assert_eq!(DEV_CODE.len(), 11);
        assert_eq!(DEV_CODE[10], ButtonId::B);
    }
}
