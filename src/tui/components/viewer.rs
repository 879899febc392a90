use crossterm::event::{KeyCode, KeyEvent, MouseEvent, MouseEventKind};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use std::path::Path;

const PYTHON_KEYWORDS: [&str; 12] = [
    "def ", "class ", "import ", "from ", "return", "if ", "elif ", "else:", "for ", "while ",
    "try:", "except",
];

/// Decides how lines are colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Markdown,
    Json,
    Code,
}

impl ContentKind {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("md") => Self::Markdown,
            Some("json") => Self::Json,
            Some("py") => Self::Code,
            _ => Self::Text,
        }
    }

    fn style_line(self, line: &str) -> Line<'_> {
        let trimmed = line.trim_start();
        let style = match self {
            Self::Text => Style::default(),
            Self::Markdown => {
                if line.starts_with('#') {
                    Style::default().fg(Color::Yellow)
                } else if line.starts_with('|') && line.ends_with('|') {
                    Style::default().fg(Color::Cyan)
                } else if line.starts_with('-') || line.starts_with('*') {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default()
                }
            }
            Self::Json => {
                if trimmed.starts_with('"') && trimmed.contains("\":") {
                    Style::default().fg(Color::Cyan)
                } else {
                    Style::default().fg(Color::Gray)
                }
            }
            Self::Code => {
                if trimmed.starts_with('#') || trimmed.starts_with("```") {
                    Style::default().fg(Color::DarkGray)
                } else if trimmed.starts_with("def ") || trimmed.starts_with("class ") {
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                } else if PYTHON_KEYWORDS.iter().any(|kw| trimmed.starts_with(kw)) {
                    Style::default().fg(Color::Blue)
                } else {
                    Style::default().fg(Color::White)
                }
            }
        };
        Line::from(Span::styled(line, style))
    }
}

pub struct ContentViewer {
    pub content: String,
    pub scroll: usize,
    pub title: String,
    pub kind: ContentKind,
}

impl ContentViewer {
    pub fn new(content: String, title: String, kind: ContentKind) -> Self {
        Self {
            content,
            scroll: 0,
            title,
            kind,
        }
    }

    pub fn from_file(content: String, path: &Path) -> Self {
        let title = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        Self::new(content, title, ContentKind::from_path(path))
    }

    fn max_scroll(&self, area_height: usize) -> usize {
        self.content
            .lines()
            .count()
            .saturating_sub(area_height.saturating_sub(2))
    }

    pub fn handle_key(&mut self, key: KeyEvent, area_height: usize) -> bool {
        let page_size = area_height.saturating_sub(2);
        match key.code {
            KeyCode::Up => {
                self.scroll = self.scroll.saturating_sub(1);
                true
            }
            KeyCode::Down => {
                if self.scroll < self.max_scroll(area_height) {
                    self.scroll += 1;
                }
                true
            }
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(page_size);
                true
            }
            KeyCode::PageDown => {
                self.scroll = (self.scroll + page_size).min(self.max_scroll(area_height));
                true
            }
            KeyCode::Home => {
                self.scroll = 0;
                true
            }
            KeyCode::End => {
                self.scroll = self.max_scroll(area_height);
                true
            }
            _ => false,
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent, area_height: usize) -> bool {
        match mouse.kind {
            MouseEventKind::ScrollUp => {
                self.scroll = self.scroll.saturating_sub(3);
                true
            }
            MouseEventKind::ScrollDown => {
                self.scroll = (self.scroll + 3).min(self.max_scroll(area_height));
                true
            }
            _ => false,
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let visible_lines = area.height.saturating_sub(2) as usize;
        let lines: Vec<Line> = self
            .content
            .lines()
            .skip(self.scroll)
            .take(visible_lines)
            .map(|line| self.kind.style_line(line))
            .collect();

        let total_lines = self.content.lines().count();
        let scroll_info = if total_lines > visible_lines {
            format!(
                " (Lines {}-{} of {})",
                self.scroll + 1,
                (self.scroll + visible_lines).min(total_lines),
                total_lines
            )
        } else {
            String::new()
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("{}{scroll_info}", self.title));

        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false });

        f.render_widget(paragraph, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn kind_follows_the_extension() {
        assert_eq!(
            ContentKind::from_path(Path::new("code/code_abc.py")),
            ContentKind::Code
        );
        assert_eq!(
            ContentKind::from_path(Path::new("strategies/strategy_abc.json")),
            ContentKind::Json
        );
        assert_eq!(
            ContentKind::from_path(Path::new("strategies/strategy_abc.md")),
            ContentKind::Markdown
        );
        assert_eq!(
            ContentKind::from_path(Path::new("transcripts/transcript_abc.txt")),
            ContentKind::Text
        );
    }

    #[test]
    fn scrolling_stops_at_the_last_page() {
        let content = (0..20).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let mut viewer = ContentViewer::new(content, "t".to_string(), ContentKind::Text);

        // 12 rows tall leaves 10 visible lines
        viewer.handle_key(key(KeyCode::End), 12);
        assert_eq!(viewer.scroll, 10);
        viewer.handle_key(key(KeyCode::Down), 12);
        assert_eq!(viewer.scroll, 10);
        viewer.handle_key(key(KeyCode::PageUp), 12);
        assert_eq!(viewer.scroll, 0);
        viewer.handle_key(key(KeyCode::Up), 12);
        assert_eq!(viewer.scroll, 0);
    }
}
