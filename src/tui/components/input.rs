use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};

/// Text input. `cursor` counts chars, not bytes.
#[derive(Debug, Clone)]
pub struct InputField {
    pub value: String,
    pub cursor: usize,
    pub placeholder: String,
    pub label: String,
    pub focused: bool,
    /// Enter inserts a line break instead of being left to the caller.
    pub multiline: bool,
}

impl InputField {
    pub fn new(label: &str, placeholder: &str) -> Self {
        Self {
            value: String::new(),
            cursor: 0,
            placeholder: placeholder.to_string(),
            label: label.to_string(),
            focused: false,
            multiline: false,
        }
    }

    pub fn multiline(label: &str, placeholder: &str) -> Self {
        Self {
            multiline: true,
            ..Self::new(label, placeholder)
        }
    }

    fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    fn char_count(&self) -> usize {
        self.value.chars().count()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c) => {
                self.insert(c);
                true
            }
            KeyCode::Enter if self.multiline => {
                self.insert('\n');
                true
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_index(self.cursor);
                    self.value.remove(at);
                }
                true
            }
            KeyCode::Delete => {
                if self.cursor < self.char_count() {
                    let at = self.byte_index(self.cursor);
                    self.value.remove(at);
                }
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                true
            }
            KeyCode::Right => {
                if self.cursor < self.char_count() {
                    self.cursor += 1;
                }
                true
            }
            KeyCode::Home => {
                self.cursor = 0;
                true
            }
            KeyCode::End => {
                self.cursor = self.char_count();
                true
            }
            _ => false,
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.label.as_str())
            .border_style(if self.focused {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::Gray)
            });

        let mut scroll = 0;
        let text = if self.value.is_empty() && !self.focused {
            Text::from(Line::from(Span::styled(
                &self.placeholder,
                Style::default().fg(Color::DarkGray),
            )))
        } else if self.focused {
            let (before, after) = self.value.split_at(self.byte_index(self.cursor));

            let mut before_lines: Vec<&str> = before.split('\n').collect();
            let current = before_lines.pop().unwrap_or_default();
            let mut after_lines = after.split('\n');
            let rest = after_lines.next().unwrap_or_default();

            // Keep the cursor row in view
            let visible = area.height.saturating_sub(2);
            scroll = (before_lines.len() as u16 + 1).saturating_sub(visible);

            let mut lines: Vec<Line> = before_lines.into_iter().map(Line::raw).collect();
            lines.push(Line::from(vec![
                Span::raw(current),
                Span::styled("│", Style::default().fg(Color::Yellow)),
                Span::raw(rest),
            ]));
            lines.extend(after_lines.map(Line::raw));
            Text::from(lines)
        } else {
            Text::raw(self.value.as_str())
        };

        let paragraph = Paragraph::new(text)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0));
        f.render_widget(paragraph, area);
    }

    pub fn is_valid(&self) -> bool {
        !self.value.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(field: &mut InputField, code: KeyCode) {
        field.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_str(field: &mut InputField, text: &str) {
        for c in text.chars() {
            press(field, KeyCode::Char(c));
        }
    }

    #[test]
    fn typing_and_editing_in_the_middle() {
        let mut field = InputField::new("URL", "");
        type_str(&mut field, "youtu.be");
        press(&mut field, KeyCode::Home);
        type_str(&mut field, "https://");
        assert_eq!(field.value, "https://youtu.be");

        press(&mut field, KeyCode::End);
        press(&mut field, KeyCode::Backspace);
        assert_eq!(field.value, "https://youtu.b");
    }

    #[test]
    fn multibyte_characters_do_not_break_the_cursor() {
        let mut field = InputField::new("Strategy", "");
        type_str(&mut field, "RSI ≤ 30 → BUY");
        press(&mut field, KeyCode::Left);
        press(&mut field, KeyCode::Left);
        press(&mut field, KeyCode::Left);
        press(&mut field, KeyCode::Left);
        press(&mut field, KeyCode::Backspace);
        assert_eq!(field.value, "RSI ≤ 30→ BUY");

        press(&mut field, KeyCode::Delete);
        assert_eq!(field.value, "RSI ≤ 30 BUY");
    }

    #[test]
    fn enter_breaks_lines_only_when_multiline() {
        let mut single = InputField::new("URL", "");
        assert!(!single.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
        assert!(single.value.is_empty());

        let mut field = InputField::multiline("Strategy", "");
        type_str(&mut field, "Entry: RSI < 30");
        press(&mut field, KeyCode::Enter);
        press(&mut field, KeyCode::Enter);
        type_str(&mut field, "Exit: RSI > 70");
        assert_eq!(field.value, "Entry: RSI < 30\n\nExit: RSI > 70");
        assert_eq!(field.cursor, field.value.chars().count());
    }

    #[test]
    fn whitespace_only_is_not_valid() {
        let mut field = InputField::new("URL", "");
        type_str(&mut field, "   ");
        assert!(!field.is_valid());
        field.clear();
        assert_eq!(field.cursor, 0);
    }
}
