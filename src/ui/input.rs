//! Single-line text input shared by the form dialogs.

use ratatui::prelude::*;

#[derive(Debug, Clone, Default)]
pub struct TextInput {
    pub value: String,
    pub cursor: usize,
}

impl TextInput {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.len();
        Self { value, cursor }
    }

    pub fn handle_char(&mut self, c: char) {
        self.value.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let prev = floor_char_boundary(&self.value, self.cursor - 1);
            self.value.remove(prev);
            self.cursor = prev;
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.len() {
            self.value.remove(self.cursor);
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor > 0 {
            self.cursor = floor_char_boundary(&self.value, self.cursor - 1);
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.value.len() {
            let mut next = self.cursor + 1;
            while next < self.value.len() && !self.value.is_char_boundary(next) {
                next += 1;
            }
            self.cursor = next;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.len();
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }

    /// The value as an optional field: trimmed, empty becomes None.
    pub fn as_optional(&self) -> Option<String> {
        let trimmed = self.value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Render the value with a cursor bar when focused, masked if requested.
    pub fn display_line(&self, focused: bool, masked: bool) -> Line<'static> {
        let shown = if masked {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        };
        if !focused {
            return Line::from(shown);
        }
        let cursor = if masked {
            self.value[..self.cursor].chars().count()
        } else {
            self.cursor
        };
        let (before, after) = shown.split_at(cursor.min(shown.len()));
        Line::from(vec![
            Span::raw(before.to_string()),
            Span::styled(
                "|",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(after.to_string()),
        ])
    }
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_cursor() {
        let mut input = TextInput::default();
        for c in "abc".chars() {
            input.handle_char(c);
        }
        assert_eq!(input.value, "abc");
        input.move_left();
        input.handle_char('x');
        assert_eq!(input.value, "abxc");
    }

    #[test]
    fn test_backspace_at_boundaries() {
        let mut input = TextInput::new("ab");
        input.backspace();
        assert_eq!(input.value, "a");
        input.move_home();
        input.backspace();
        assert_eq!(input.value, "a");
    }

    #[test]
    fn test_multibyte_editing() {
        let mut input = TextInput::new("öä");
        input.backspace();
        assert_eq!(input.value, "ö");
        input.move_home();
        input.move_right();
        assert_eq!(input.cursor, "ö".len());
    }

    #[test]
    fn test_optional_trims_whitespace() {
        assert_eq!(TextInput::new("  ").as_optional(), None);
        assert_eq!(
            TextInput::new(" 555-0101 ").as_optional(),
            Some("555-0101".to_string())
        );
    }
}
