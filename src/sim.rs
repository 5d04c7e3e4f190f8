use crate::model::{PlaygroundSubmenu, SaveRecord, GAME_RES};

/// Once-a-second game logic driven by the frame count.
#[derive(Debug, Default)]
pub(crate) struct Ageing {
    frames_passed: u32,
}

impl Ageing {
    /// Returns true when the record should be written out.
    pub(crate) fn update(&mut self, record: &mut SaveRecord, fps: u32) -> bool {
        self.frames_passed += 1;
        if self.frames_passed < fps {
            return false;
        }
        self.frames_passed = 0;
        record.age += 1;
        record.age % 10 == 0
    }
}

const MARGIN: i32 = 9;
const STEP: i32 = 2;
pub(crate) const FRIEND_WIDTH: i32 = 16;
const ANIM_FRAMES: u32 = 4;
const PET_FRAMES: u32 = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Facing {
    Left,
    Right,
}

/// The creature wandering around the playground.
#[derive(Debug)]
pub(crate) struct Friend {
    pub(crate) x: i32,
    pub(crate) facing: Facing,
    pub(crate) anim: u32,
    pub(crate) hearts: u32,
    wanders: bool,
    move_every: u32,
    frame: u32,
}

impl Friend {
    pub(crate) fn new(record: &SaveRecord, fps: u32) -> Self {
        Self {
            x: GAME_RES / 2 - FRIEND_WIDTH / 2,
            facing: Facing::Left,
            anim: 0,
            hearts: 0,
            wanders: !record.is_egg(),
            move_every: (fps / 2).max(1),
            frame: 0,
        }
    }

    pub(crate) fn update(&mut self) {
        self.frame += 1;
        if self.frame >= self.move_every {
            self.frame = 0;
            if self.wanders {
                if self.x < MARGIN {
                    self.facing = Facing::Right;
                } else if self.x > GAME_RES - MARGIN - FRIEND_WIDTH {
                    self.facing = Facing::Left;
                }
                match self.facing {
                    Facing::Left => self.x -= STEP,
                    Facing::Right => self.x += STEP,
                }
            }
        }
        self.anim = (self.anim + 1) % ANIM_FRAMES;
        self.hearts = self.hearts.saturating_sub(1);
    }

    pub(crate) fn pet(&mut self) {
        self.hearts = PET_FRAMES;
    }
}

/// Icon bar shown over the playground.
#[derive(Debug, Default)]
pub(crate) struct PopupMenu {
    pub(crate) visible: bool,
    pub(crate) selected: usize,
}

impl PopupMenu {
    pub(crate) fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub(crate) fn next(&mut self) {
        if self.visible {
            self.selected = (self.selected + 1) % PlaygroundSubmenu::ICONS.len();
        }
    }

    pub(crate) fn prev(&mut self) {
        if self.visible {
            let n = PlaygroundSubmenu::ICONS.len();
            self.selected = (self.selected + n - 1) % n;
        }
    }

    pub(crate) fn current(&self) -> PlaygroundSubmenu {
        PlaygroundSubmenu::ICONS[self.selected]
    }
}
