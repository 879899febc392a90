use crate::core::{FileEntry, FileType};
use crossterm::event::{KeyCode, KeyEvent, MouseEvent, MouseEventKind};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};

/// Scrollable list of saved files with multi-select for deletion.
pub struct FileList {
    pub items: Vec<FileEntry>,
    pub state: ListState,
    pub marked: Vec<bool>,
    viewport_size: usize,
}

impl FileList {
    pub fn new(items: Vec<FileEntry>) -> Self {
        let mut list = Self {
            items: Vec::new(),
            state: ListState::default(),
            marked: Vec::new(),
            viewport_size: 0,
        };
        list.update_items(items);
        list
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let page = self.viewport_size.max(1) as isize;
        match key.code {
            KeyCode::Up => self.cycle(-1),
            KeyCode::Down => self.cycle(1),
            KeyCode::PageUp => self.move_by(-page),
            KeyCode::PageDown => self.move_by(page),
            KeyCode::Home => self.move_by(isize::MIN),
            KeyCode::End => self.move_by(isize::MAX),
            KeyCode::Char(' ') => self.toggle_marked(),
            _ => return false,
        }
        true
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) -> bool {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.move_by(-1),
            MouseEventKind::ScrollDown => self.move_by(1),
            _ => return false,
        }
        true
    }

    /// Up/Down wrap around at either end.
    fn cycle(&mut self, step: isize) {
        if self.items.is_empty() {
            return;
        }
        let len = self.items.len() as isize;
        let current = self.state.selected().unwrap_or(0) as isize;
        self.state
            .select(Some((current + step).rem_euclid(len) as usize));
        self.adjust_offset();
    }

    /// Paging and scrolling stop at either end.
    fn move_by(&mut self, step: isize) {
        if self.items.is_empty() {
            return;
        }
        let last = self.items.len() - 1;
        let current = self.state.selected().unwrap_or(0);
        let target = if step < 0 {
            current.saturating_sub(step.unsigned_abs())
        } else {
            current.saturating_add(step as usize).min(last)
        };
        self.state.select(Some(target));
        self.adjust_offset();
    }

    pub fn toggle_marked(&mut self) {
        if let Some(i) = self.state.selected()
            && let Some(flag) = self.marked.get_mut(i)
        {
            *flag = !*flag;
        }
    }

    pub fn selected(&self) -> Option<&FileEntry> {
        self.state.selected().and_then(|i| self.items.get(i))
    }

    /// Marked entries, or the highlighted one when nothing is marked.
    pub fn deletion_targets(&self) -> Vec<&FileEntry> {
        let marked: Vec<&FileEntry> = self
            .items
            .iter()
            .zip(&self.marked)
            .filter_map(|(item, &marked)| marked.then_some(item))
            .collect();

        if marked.is_empty() {
            self.selected().into_iter().collect()
        } else {
            marked
        }
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, title: &str) {
        self.viewport_size = (area.height.saturating_sub(2) as usize).max(1);
        self.adjust_offset();

        let items: Vec<ListItem> = self
            .items
            .iter()
            .zip(&self.marked)
            .map(|(file, &marked)| {
                let checkbox = if marked { "☑ " } else { "☐ " };
                let (icon, color) = match file.file_type {
                    FileType::Transcript => ("📄", Color::White),
                    FileType::Strategy => ("📈", Color::Cyan),
                    FileType::Code => ("🐍", Color::Green),
                };

                ListItem::new(Line::from(vec![
                    Span::raw(checkbox),
                    Span::raw(icon),
                    Span::raw(" "),
                    Span::styled(&file.name, Style::default().fg(color)),
                    Span::styled(
                        format!(" ({})", file.size_label()),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            );

        f.render_stateful_widget(list, area, &mut self.state);
    }

    pub fn update_items(&mut self, new_items: Vec<FileEntry>) {
        self.items = new_items;
        self.marked = vec![false; self.items.len()];

        if self.items.is_empty() {
            self.state.select(None);
        } else {
            let index = self.state.selected().unwrap_or(0).min(self.items.len() - 1);
            self.state.select(Some(index));
        }

        self.adjust_offset();
    }

    fn adjust_offset(&mut self) {
        let Some(selected) = self.state.selected() else {
            *self.state.offset_mut() = 0;
            return;
        };

        let viewport = self.viewport_size.max(1);
        let max_offset = self.items.len().saturating_sub(viewport);
        let mut offset = self.state.offset().min(max_offset);

        if selected < offset {
            offset = selected;
        } else if selected >= offset + viewport {
            offset = selected + 1 - viewport;
        }
        *self.state.offset_mut() = offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn entry(name: &str, file_type: FileType) -> FileEntry {
        FileEntry {
            path: PathBuf::from(name),
            name: name.to_string(),
            file_type,
            size: 2048,
            modified: SystemTime::UNIX_EPOCH,
        }
    }

    fn sample() -> FileList {
        FileList::new(vec![
            entry("code_abc.py", FileType::Code),
            entry("strategy_abc.md", FileType::Strategy),
            entry("transcript_abc.txt", FileType::Transcript),
        ])
    }

    fn press(list: &mut FileList, code: KeyCode) {
        list.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn arrows_wrap_but_paging_clamps() {
        let mut list = sample();
        press(&mut list, KeyCode::Up);
        assert_eq!(list.state.selected(), Some(2));
        press(&mut list, KeyCode::Down);
        assert_eq!(list.state.selected(), Some(0));

        press(&mut list, KeyCode::End);
        press(&mut list, KeyCode::PageDown);
        assert_eq!(list.state.selected(), Some(2));
        press(&mut list, KeyCode::Home);
        assert_eq!(list.state.selected(), Some(0));
    }

    #[test]
    fn deletion_targets_prefer_marked_entries() {
        let mut list = sample();
        assert_eq!(list.deletion_targets()[0].name, "code_abc.py");

        press(&mut list, KeyCode::Down);
        press(&mut list, KeyCode::Char(' '));
        press(&mut list, KeyCode::Down);
        press(&mut list, KeyCode::Char(' '));

        let names: Vec<&str> = list
            .deletion_targets()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["strategy_abc.md", "transcript_abc.txt"]);
    }

    #[test]
    fn shrinking_the_list_keeps_a_valid_selection() {
        let mut list = sample();
        press(&mut list, KeyCode::End);
        list.update_items(vec![entry("code_abc.py", FileType::Code)]);
        assert_eq!(list.state.selected(), Some(0));

        list.update_items(Vec::new());
        assert_eq!(list.state.selected(), None);
        assert!(list.deletion_targets().is_empty());
    }
}
