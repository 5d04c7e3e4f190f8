#[derive(Clone, Copy, Debug)]
pub(crate) struct Egg {
    pub(crate) kind: &'static str,
    pub(crate) name: &'static str,
    pub(crate) description: &'static str,
    /// 0..=5 stars
    pub(crate) contentedness: u8,
    /// 0..=5 stars
    pub(crate) metabolism: u8,
}

pub(crate) static EGGS: [Egg; 3] = [
    Egg {
        kind: "dev_egg",
        name: "Dev Egg",
        description: "A plain grey egg used for testing. It hums quietly and does not seem to mind \
                      being poked, prodded, or rebuilt from scratch.",
        contentedness: 3,
        metabolism: 3,
    },
    Egg {
        kind: "blue",
        name: "Blue",
        description: "A calm blue bloop. Easy going and patient, it rarely gets upset, but it \
                      gets hungry quickly and likes frequent snacks.",
        contentedness: 4,
        metabolism: 2,
    },
    Egg {
        kind: "rainbow",
        name: "Rainbow",
        description: "A shimmering egg that never looks the same colour twice. Rainbow bloops \
                      are hard to please, but they can go a long time without food.",
        contentedness: 1,
        metabolism: 5,
    },
];

pub(crate) const INFO_LINE_WIDTH: usize = 18;
pub(crate) const INFO_VISIBLE_LINES: usize = 6;

const CUT_CHARS: &[char] = &['.', ',', '!', ' '];

/// Word-wrapped, scrollable description text for the egg info screen.
#[derive(Clone, Debug)]
pub(crate) struct InfoText {
    lines: Vec<String>,
    offset: usize,
    visible: usize,
}

impl InfoText {
    pub(crate) fn new(text: &str) -> Self {
        Self::with_layout(text, INFO_LINE_WIDTH, INFO_VISIBLE_LINES)
    }

    pub(crate) fn with_layout(text: &str, width: usize, visible: usize) -> Self {
        Self {
            lines: wrap(text, width.max(2)),
            offset: 0,
            visible: visible.max(1),
        }
    }

    pub(crate) fn visible_lines(&self) -> &[String] {
        let end = (self.offset + self.visible).min(self.lines.len());
        &self.lines[self.offset..end]
    }

    pub(crate) fn more_above(&self) -> bool {
        self.offset > 0
    }

    pub(crate) fn more_below(&self) -> bool {
        self.offset + self.visible < self.lines.len()
    }

    pub(crate) fn scroll_down(&mut self) {
        if self.more_below() {
            self.offset += 1;
        }
    }

    pub(crate) fn scroll_up(&mut self) {
        self.offset = self.offset.saturating_sub(1);
    }
}

/// Greedy wrap that breaks after a cut character, or hyphenates a word that
/// has none within the line.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.split_whitespace().collect::<Vec<_>>().join(" ").chars().collect();
    let mut lines = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        // drop the space a previous break left at the head of the line
        if chars[start] == ' ' {
            start += 1;
            continue;
        }

        let rest = chars.len() - start;
        if rest <= width {
            lines.push(chars[start..].iter().collect());
            break;
        }

        let window = &chars[start..start + width];
        let line: String = match window.iter().rposition(|c| CUT_CHARS.contains(c)) {
            Some(cut) => {
                let s: String = window[..=cut].iter().collect();
                start += cut + 1;
                s
            }
            None => {
                let mut s: String = window[..width - 1].iter().collect();
                s.push('-');
                start += width - 1;
                s
            }
        };
        lines.push(line.trim_end().to_string());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_breaks_after_cut_characters() {
        let lines = wrap("hello there, friend of mine", 14);
        assert_eq!(lines, vec!["hello there,", "friend of mine"]);
    }

    #[test]
    fn wrap_hyphenates_long_words() {
        let lines = wrap("abcdefghijklmnop", 6);
        assert_eq!(lines, vec!["abcde-", "fghij-", "klmnop"]);
    }

    #[test]
    fn wrapped_lines_fit_width() {
        for egg in &EGGS {
            for line in wrap(egg.description, INFO_LINE_WIDTH) {
                assert!(line.chars().count() <= INFO_LINE_WIDTH, "{line:?}");
            }
        }
    }

    #[test]
    fn scrolling_is_clamped() {
        let mut info = InfoText::with_layout("aa bb cc dd ee", 3, 2);
        assert!(!info.more_above());
        assert!(info.more_below());

        for _ in 0..20 {
            info.scroll_down();
        }
        assert!(!info.more_below());
        assert_eq!(info.visible_lines().len(), 2);

        for _ in 0..20 {
            info.scroll_up();
        }
        assert!(!info.more_above());
        assert_eq!(info.visible_lines(), ["aa", "bb"]);
    }

    #[test]
    fn star_ratings_are_in_range() {
        for egg in &EGGS {
            assert!(egg.contentedness <= 5 && egg.metabolism <= 5);
        }
    }
}
