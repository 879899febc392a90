use crate::core::{ProgressEvent, Stage};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
};

pub struct ProgressBar {
    pub percent: u16,
    pub status: String,
    pub logs: Vec<String>,
    pub max_logs: usize,
    pub error: Option<String>,
    pub current: Option<Stage>,
    pub done: Vec<Stage>,
}

impl ProgressBar {
    pub fn new() -> Self {
        Self {
            percent: 0,
            status: String::new(),
            logs: Vec::new(),
            max_logs: 50,
            error: None,
            current: None,
            done: Vec::new(),
        }
    }

    pub fn apply(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { stage, status } => {
                self.current = Some(*stage);
                self.status = status.clone();
                self.add_log(format!("{stage}: {status}"));
            }
            ProgressEvent::Completed { stage, percent } => {
                self.percent = (*percent).min(100);
                self.done.push(*stage);
                self.add_log(format!("{stage} complete"));
            }
            ProgressEvent::Log(message) => self.add_log(message.clone()),
        }
    }

    /// Clears the gauge and keeps the message visible until reset.
    pub fn fail(&mut self, message: String) {
        self.percent = 0;
        self.done.clear();
        self.status = "Failed".to_string();
        self.add_log(format!("Error: {message}"));
        self.error = Some(message);
    }

    pub fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
    }

    pub fn add_log(&mut self, log: String) {
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        self.logs.push(format!("[{timestamp}] {log}"));

        if self.logs.len() > self.max_logs {
            self.logs.remove(0);
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect, source: &str) {
        let error_height = if self.error.is_some() { 5 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),            // Source
                Constraint::Length(3),            // Gauge
                Constraint::Length(1),            // Stages
                Constraint::Length(1),            // Status
                Constraint::Length(error_height), // Error
                Constraint::Min(1),               // Logs
            ])
            .split(area);

        let source_paragraph =
            Paragraph::new(format!("Source: {source}")).style(Style::default().fg(Color::White));
        f.render_widget(source_paragraph, chunks[0]);

        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Progress"))
            .gauge_style(Style::default().fg(Color::Green))
            .percent(self.percent);
        f.render_widget(gauge, chunks[1]);

        f.render_widget(Paragraph::new(self.stage_line()), chunks[2]);

        let status_paragraph = Paragraph::new(format!("Status: {}", self.status))
            .style(Style::default().fg(Color::Yellow));
        f.render_widget(status_paragraph, chunks[3]);

        if let Some(error) = &self.error {
            let error_paragraph = Paragraph::new(error.as_str())
                .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title("Error"));
            f.render_widget(error_paragraph, chunks[4]);
        }

        // Tail of the log that fits the remaining space
        let visible = chunks[5].height.saturating_sub(2) as usize;
        let skip = self.logs.len().saturating_sub(visible);
        let log_lines: Vec<Line> = self
            .logs
            .iter()
            .skip(skip)
            .map(|log| Line::from(Span::raw(log)))
            .collect();

        let logs_paragraph =
            Paragraph::new(log_lines).block(Block::default().borders(Borders::ALL).title("Log"));
        f.render_widget(logs_paragraph, chunks[5]);
    }

    fn stage_line(&self) -> Line<'static> {
        let mut spans = Vec::new();
        for (i, stage) in Stage::ALL.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" → ", Style::default().fg(Color::DarkGray)));
            }
            let (mark, style) = if self.done.contains(stage) {
                ("✓", Style::default().fg(Color::Green))
            } else if self.current == Some(*stage) && self.error.is_some() {
                ("✗", Style::default().fg(Color::Red))
            } else if self.current == Some(*stage) {
                ("…", Style::default().fg(Color::Yellow))
            } else {
                ("·", Style::default().fg(Color::DarkGray))
            };
            spans.push(Span::styled(format!("{mark} {stage}"), style));
        }
        Line::from(spans)
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.done.clear();
        self.percent = 0;
        self.status.clear();
        self.logs.clear();
        self.error = None;
    }
}

impl Default for ProgressBar {
    fn default() -> Self {
        Self::new()
    }
}
