use crate::devmenu::Menu;
use crate::eggs::{Egg, InfoText};
use crate::grid::Grid;
use crate::input::{collect_host_nonblocking, HostEvent};
use crate::model::{SaveRecord, GAME_RES};
use crate::sim::{Facing, Friend, PopupMenu, FRIEND_WIDTH};
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

/// One frame's worth of what to show.
pub(crate) enum View<'a> {
    Title,
    Loading,
    EggGrid {
        eggs: &'a [Egg],
        grid: Grid,
        selected: usize,
    },
    EggInfo {
        egg: &'a Egg,
        info: &'a InfoText,
    },
    Playground {
        record: &'a SaveRecord,
        friend: &'a Friend,
        popup: &'a PopupMenu,
    },
    Error {
        frames: u32,
    },
    DevMenu {
        menu: &'a Menu,
    },
    ButtonTest {
        log: &'a [String],
    },
}

/// The window the game draws into and reads keys from.
pub(crate) trait Frontend {
    fn host_events(&mut self) -> anyhow::Result<Vec<HostEvent>>;
    fn present(&mut self, view: &View<'_>) -> anyhow::Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
    pub(crate) fn clear(&mut self, bg: Color) {
        for c in &mut self.cells {
            *c = Cell { bg, ..Cell::default() };
        }
    }
    #[cfg(test)]
    pub(crate) fn row_text(&self, y: u16) -> String {
        (0..self.w).map(|x| self.cells[self.idx(x, y)].ch).collect()
    }
}

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg });
    }
}

/// Where the game screen sits inside the terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Frame {
    pub(crate) x: u16,
    pub(crate) y: u16,
    pub(crate) w: u16,
    pub(crate) h: u16,
}

impl Frame {
    /// Terminal cells are about twice as tall as wide, so a square screen of
    /// `size` pixels becomes `size/8` by `size/16` cells.
    pub(crate) fn for_size(size: u32, cols: u16, rows: u16) -> Self {
        let w = ((size / 8).max(20) as u16).min(cols).max(3);
        let h = ((size / 16).max(12) as u16).min(rows).max(3);
        Self {
            x: cols.saturating_sub(w) / 2,
            y: rows.saturating_sub(h) / 2,
            w,
            h,
        }
    }

    fn inner_w(&self) -> u16 {
        self.w.saturating_sub(2)
    }

    /// Maps a game x coordinate (0..GAME_RES) to a column inside the border.
    fn col(&self, game_x: i32) -> u16 {
        let x = game_x.clamp(0, GAME_RES) as u32 * self.inner_w() as u32 / GAME_RES as u32;
        self.x + 1 + x as u16
    }

    fn text(&self, buf: &mut CellBuffer, row: u16, s: &str, fg: Color) {
        if row + 1 >= self.h {
            return;
        }
        let clipped: String = s.chars().take(self.inner_w() as usize).collect();
        draw_text(buf, self.x + 1, self.y + row, &clipped, fg, Color::Black);
    }

    fn centered(&self, buf: &mut CellBuffer, row: u16, s: &str, fg: Color) {
        let len = s.chars().count() as u16;
        let pad = self.inner_w().saturating_sub(len) / 2;
        let padded = format!("{}{}", " ".repeat(pad as usize), s);
        self.text(buf, row, &padded, fg);
    }
}

fn draw_border(buf: &mut CellBuffer, f: Frame, title: &str) {
    let put = |buf: &mut CellBuffer, x: u16, y: u16, ch: char| {
        buf.set(
            x,
            y,
            Cell {
                ch,
                fg: Color::Grey,
                ..Cell::default()
            },
        )
    };
    let (x1, y1) = (f.x + f.w - 1, f.y + f.h - 1);
    for x in f.x..=x1 {
        put(buf, x, f.y, '─');
        put(buf, x, y1, '─');
    }
    for y in f.y..=y1 {
        put(buf, f.x, y, '│');
        put(buf, x1, y, '│');
    }
    put(buf, f.x, f.y, '┌');
    put(buf, x1, f.y, '┐');
    put(buf, f.x, y1, '└');
    put(buf, x1, y1, '┘');
    draw_text(buf, f.x + 2, f.y, title, Color::White, Color::Black);
}

fn stars(n: u8) -> String {
    (0..5).map(|i| if i < n { '★' } else { '☆' }).collect()
}

fn kind_color(kind: &str, anim: u32) -> Color {
    match kind {
        "blue" => Color::Blue,
        "rainbow" => [Color::Red, Color::Yellow, Color::Green, Color::Cyan][anim as usize % 4],
        _ => Color::Grey,
    }
}

/// Draws `view` into `buf` inside `f`.
pub(crate) fn draw_view(buf: &mut CellBuffer, f: Frame, view: &View<'_>) {
    let title = match view {
        View::DevMenu { .. } | View::ButtonTest { .. } => " dev ",
        _ => " Pocket Friends ",
    };
    draw_border(buf, f, title);

    match view {
        View::Title => {
            let mid = f.h / 2;
            f.centered(buf, mid - 1, "POCKET", Color::Yellow);
            f.centered(buf, mid, "FRIENDS", Color::Yellow);
        }
        View::Loading => {
            f.centered(buf, f.h / 2, "...", Color::Grey);
        }
        View::EggGrid {
            eggs,
            grid,
            selected,
        } => {
            f.centered(buf, 1, "Choose an egg", Color::White);
            for (i, egg) in eggs.iter().enumerate() {
                let (col, row) = grid.cell(i);
                let in_row = grid.row_len(row) as u16;
                let slot = f.inner_w() / grid.columns().max(1) as u16;
                // rows are centered even when short
                let left = f.x + 1 + (f.inner_w() - slot * in_row) / 2;
                let x = left + slot * col as u16;
                let y = f.y + 3 + row as u16 * 3;
                let color = kind_color(egg.kind, 0);
                let mark = if i == *selected { '>' } else { ' ' };
                draw_text(buf, x, y, &format!("{mark}(_)"), color, Color::Black);
                let name: String = egg.name.chars().take(slot.saturating_sub(1) as usize).collect();
                draw_text(buf, x, y + 1, &name, Color::Grey, Color::Black);
            }
            f.text(buf, f.h - 2, "A: look closer", Color::DarkGrey);
        }
        View::EggInfo { egg, info } => {
            f.text(buf, 1, &format!("(_) {}", egg.name), kind_color(egg.kind, 0));
            f.text(buf, 2, &format!("☺ {}", stars(egg.contentedness)), Color::Yellow);
            f.text(buf, 3, &format!("♣ {}", stars(egg.metabolism)), Color::Green);
            if info.more_above() {
                f.centered(buf, 4, "^", Color::Grey);
            }
            for (i, line) in info.visible_lines().iter().enumerate() {
                f.text(buf, 5 + i as u16, line, Color::White);
            }
            if info.more_below() {
                f.centered(buf, 11, "v", Color::Grey);
            }
            f.text(buf, f.h - 2, "A: hatch  B: back", Color::DarkGrey);
        }
        View::Playground {
            record,
            friend,
            popup,
        } => {
            if popup.visible {
                let mut x = f.x + 1;
                for (i, icon) in crate::model::PlaygroundSubmenu::ICONS.iter().enumerate() {
                    let (fg, bg) = if i == popup.selected {
                        (Color::Black, Color::White)
                    } else {
                        (Color::White, Color::Black)
                    };
                    draw_text(buf, x, f.y + 1, icon.label(), fg, bg);
                    x += icon.label().len() as u16 + 1;
                }
            }

            let ground = f.h.saturating_sub(3);
            let color = kind_color(&record.creature_kind, friend.anim);
            let sprite = if record.is_egg() {
                if friend.anim % 2 == 0 { "(  )" } else { " (  )" }
            } else {
                match friend.facing {
                    Facing::Left => "<o o)",
                    Facing::Right => "(o o>",
                }
            };
            let right = (f.x + f.w).saturating_sub(1 + sprite.chars().count() as u16);
            let x = f.col(friend.x).min(right);
            draw_text(buf, x, f.y + ground, sprite, color, Color::Black);
            // no room for hearts above the ground row
            if friend.hearts > 0 && ground > 0 {
                let hx = f.col(friend.x + FRIEND_WIDTH / 2);
                draw_text(buf, hx, f.y + ground - 1, "♥", Color::Red, Color::Black);
            }
            f.text(
                buf,
                f.h - 2,
                &format!("age {}  {}", record.age, record.evolution_stage),
                Color::DarkGrey,
            );
        }
        View::Error { frames } => {
            f.centered(buf, f.h / 2 - 1, "INVALID STATE", Color::Red);
            f.centered(buf, f.h / 2 + 1, "B: back to title", Color::Grey);
            f.text(buf, f.h - 2, &format!("frames: {frames}"), Color::DarkGrey);
        }
        View::DevMenu { menu } => {
            let mut row = 1;
            for line in menu.title().lines() {
                f.text(buf, row, line, Color::White);
                row += 1;
            }
            row += 1;
            for (i, option) in menu.options().iter().enumerate() {
                let mark = if i == menu.selection() { '>' } else { ' ' };
                f.text(buf, row, &format!("{mark} {}", option.text), Color::White);
                row += 1;
            }
        }
        View::ButtonTest { log } => {
            f.text(buf, 1, "Button test", Color::White);
            let rows = f.h.saturating_sub(4) as usize;
            let start = log.len().saturating_sub(rows);
            for (i, line) in log[start..].iter().enumerate() {
                f.text(buf, 2 + i as u16, line, Color::Grey);
            }
        }
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        queue!(self.out, Clear(ClearType::All))?;
        Ok(true)
    }

    pub(crate) fn present(&mut self, diff_only: bool) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if diff_only && c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }
                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

/// Full-screen terminal frontend used on the desktop and over SSH.
pub(crate) struct TerminalFrontend {
    term: Terminal,
    size: u32,
}

impl TerminalFrontend {
    pub(crate) fn begin(size: u32) -> anyhow::Result<Self> {
        Ok(Self {
            term: Terminal::begin()?,
            size,
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        self.term.end()
    }
}

impl Frontend for TerminalFrontend {
    fn host_events(&mut self) -> anyhow::Result<Vec<HostEvent>> {
        collect_host_nonblocking()
    }

    fn present(&mut self, view: &View<'_>) -> anyhow::Result<()> {
        let resized = self.term.resize_if_needed()?;
        self.term.cur.clear(Color::Black);
        let frame = Frame::for_size(self.size, self.term.cols, self.term.rows);
        draw_view(&mut self.term.cur, frame, view);
        self.term.present(!resized)
    }
}

/// Headless frontend for tests: plays back queued key presses and records
/// which screen was shown each frame.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct Scripted {
    pub(crate) script: std::collections::VecDeque<Vec<HostEvent>>,
    pub(crate) shown: Vec<&'static str>,
}

#[cfg(test)]
impl Scripted {
    /// Queues a press followed by enough quiet frames to clear the debounce.
    pub(crate) fn press(&mut self, button: crate::model::ButtonId) {
        self.script.push_back(vec![HostEvent::Press(button)]);
        self.idle(2);
    }

    pub(crate) fn idle(&mut self, frames: usize) {
        for _ in 0..frames {
            self.script.push_back(vec![]);
        }
    }
}

#[cfg(test)]
impl Frontend for Scripted {
    fn host_events(&mut self) -> anyhow::Result<Vec<HostEvent>> {
        Ok(self.script.pop_front().unwrap_or_default())
    }

    fn present(&mut self, view: &View<'_>) -> anyhow::Result<()> {
        self.shown.push(match view {
            View::Title => "title",
            View::Loading => "loading",
            View::EggGrid { .. } => "egg grid",
            View::EggInfo { .. } => "egg info",
            View::Playground { .. } => "playground",
            View::Error { .. } => "error",
            View::DevMenu { .. } => "dev menu",
            View::ButtonTest { .. } => "button test",
        });
        Ok(())
    }
}
