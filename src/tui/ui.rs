use crate::core::AnalysisMode;
use crate::tui::app::{
    App, AppState, FOCUS_INPUT, FOCUS_METHOD, FOCUS_MODE, FOCUS_SUBMIT, FileFilter, InputMethod, ResultTab,
};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Tabs, Wrap},
};

pub fn draw(f: &mut Frame, app: &mut App) {
    match &app.state {
        AppState::Home => draw_home(f, app),
        AppState::NewStrategy => draw_new_strategy(f, app),
        AppState::Processing => draw_processing(f, app),
        AppState::Results => draw_results(f, app),
        AppState::Browser => draw_browser(f, app),
        AppState::Viewer { .. } => draw_viewer(f, app),
        AppState::Settings => draw_settings(f, app),
    }
}

fn selected_style(selected: bool) -> Style {
    if selected {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    }
}

fn radio(selected: bool) -> &'static str {
    if selected { "●" } else { "○" }
}

fn draw_title(f: &mut Frame, area: Rect, title: &str) {
    let title = Paragraph::new(title.to_string())
        .style(selected_style(true))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, area);
}

fn draw_help(f: &mut Frame, area: Rect, help: &str) {
    let help = Paragraph::new(help.to_string())
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, area);
}

/// Title bar, body and help bar.
fn frame_layout(area: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2]]
}

fn draw_home(f: &mut Frame, app: &App) {
    let [title, body, help] = frame_layout(f.area());
    draw_title(f, title, "Strategy2Code");

    let results_label = if app.last_output.is_some() {
        "Last Results"
    } else {
        "Last Results (none yet)"
    };
    let options = ["New Strategy", results_label, "Saved Files", "Settings"];

    let menu_items: Vec<ListItem> = options
        .iter()
        .enumerate()
        .map(|(i, option)| {
            let selected = i == app.selected_option;
            ListItem::new(Line::from(Span::styled(
                format!("{} {}. {option}", radio(selected), i + 1),
                selected_style(selected),
            )))
        })
        .collect();

    let menu = List::new(menu_items).block(Block::default().borders(Borders::ALL).title("Menu"));
    f.render_widget(menu, body);

    draw_help(f, help, "[↑↓] Navigate  [1-4] Jump  [Enter] Select  [q] Exit");
}

fn draw_new_strategy(f: &mut Frame, app: &App) {
    let [title, body, help] = frame_layout(f.area());
    draw_title(f, title, "New Strategy");

    let input_height = match app.input_method {
        InputMethod::Video => 3,
        InputMethod::Manual => 8,
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // Input method
            Constraint::Length(input_height), // URL or description
            Constraint::Length(3),            // Analysis mode
            Constraint::Length(3),            // Submit
            Constraint::Min(0),               // Form error
        ])
        .split(body);

    let video = app.input_method == InputMethod::Video;
    let method_line = Line::from(vec![
        Span::styled(format!("{} YouTube URL", radio(video)), selected_style(video)),
        Span::raw("    "),
        Span::styled(
            format!("{} Manual description", radio(!video)),
            selected_style(!video),
        ),
    ]);
    f.render_widget(
        Paragraph::new(method_line).block(focus_block("Input Method", app.input_focus == FOCUS_METHOD)),
        chunks[0],
    );

    match app.input_method {
        InputMethod::Video => app.url_input.render(f, chunks[1]),
        InputMethod::Manual => app.description_input.render(f, chunks[1]),
    }

    let extract = app.mode == AnalysisMode::Extract;
    let mode_line = Line::from(vec![
        Span::styled(
            format!("{} Extract structured data", radio(extract)),
            selected_style(extract),
        ),
        Span::raw("    "),
        Span::styled(
            format!("{} Summarize", radio(!extract)),
            selected_style(!extract),
        ),
    ]);
    f.render_widget(
        Paragraph::new(mode_line).block(focus_block("Analysis Mode", app.input_focus == FOCUS_MODE)),
        chunks[2],
    );

    let submit = Paragraph::new("[ Generate Code ]")
        .alignment(Alignment::Center)
        .style(selected_style(app.input_focus == FOCUS_SUBMIT))
        .block(focus_block("", app.input_focus == FOCUS_SUBMIT));
    f.render_widget(submit, chunks[3]);

    if let Some(error) = &app.form_error {
        let error = Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red));
        f.render_widget(error, chunks[4]);
    }

    let help_text = match app.input_method {
        InputMethod::Manual if app.input_focus == FOCUS_INPUT => {
            "[Tab/Shift+Tab] Focus  [Enter] New line  [Esc] Back"
        }
        _ => "[Tab/Shift+Tab] Focus  [Space/←→] Toggle  [Enter] Next/Generate  [Esc] Back",
    };
    draw_help(f, help, help_text);
}

fn focus_block(title: &str, focused: bool) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Gray)
        })
}

fn draw_processing(f: &mut Frame, app: &App) {
    let [title, body, help] = frame_layout(f.area());
    let heading = if app.running {
        "Processing..."
    } else if app.progress_bar.error.is_some() {
        "Run Failed"
    } else {
        "Processing"
    };
    draw_title(f, title, heading);

    app.progress_bar.render(f, body, &app.source_label);

    let help_text = if app.running {
        "Run in progress"
    } else {
        "[Esc] Back to form"
    };
    draw_help(f, help, help_text);
}

fn draw_results(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Min(1),    // Content
            Constraint::Length(3), // Saved files
            Constraint::Length(3), // Help
        ])
        .split(f.area());

    let titles: Vec<Line> = ResultTab::ALL
        .iter()
        .enumerate()
        .map(|(i, tab)| Line::from(format!("{}. {}", i + 1, tab.title())))
        .collect();
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title("Results"))
        .select(app.result_tab.index())
        .highlight_style(selected_style(true));
    f.render_widget(tabs, chunks[0]);

    app.viewer_height = chunks[1].height;
    if let Some(viewer) = &app.result_viewer {
        viewer.render(f, chunks[1]);
    }

    let saved = match app.last_output.as_ref().and_then(|o| o.saved.as_ref()) {
        Some(saved) => saved
            .paths()
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("  "),
        None => "Not saved".to_string(),
    };
    let saved = Paragraph::new(saved)
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Saved"));
    f.render_widget(saved, chunks[2]);

    draw_help(
        f,
        chunks[3],
        "[←→/1-3] Tabs  [↑↓/PgUp/PgDn] Scroll  [n] New strategy  [Esc] Home",
    );
}

fn draw_browser(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(22), Constraint::Min(1)])
        .split(f.area());

    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Filters
            Constraint::Length(3), // Search
            Constraint::Min(0),
        ])
        .split(chunks[0]);

    let filter_items: Vec<ListItem> = FileFilter::ALL
        .iter()
        .enumerate()
        .map(|(i, filter)| {
            let selected = *filter == app.filter;
            ListItem::new(Line::from(Span::styled(
                format!("{} {}. {}", radio(selected), i + 1, filter.label()),
                selected_style(selected),
            )))
        })
        .collect();

    let filters =
        List::new(filter_items).block(Block::default().borders(Borders::ALL).title("Filters"));
    f.render_widget(filters, left_chunks[0]);

    app.search_input.render(f, left_chunks[1]);

    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(chunks[1]);

    let title = format!("Files in {}", app.storage.root().display());
    app.file_list.render(f, right_chunks[0], &title);

    if let Some(message) = &app.status_message {
        let status = Paragraph::new(message.as_str()).style(Style::default().fg(Color::Yellow));
        f.render_widget(status, right_chunks[1]);
    }

    draw_help(
        f,
        right_chunks[2],
        "[Enter] Open  [Del/d] Delete  [Space] Mark  [/] Search  [1-4] Filters  [r] Refresh",
    );
}

fn draw_viewer(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(f.area());

    app.viewer_height = chunks[0].height;
    if let Some(viewer) = &app.content_viewer {
        viewer.render(f, chunks[0]);
    }

    let help = app
        .status_message
        .as_deref()
        .unwrap_or("[↑↓] Scroll  [PgUp/PgDn] Page  [Tab] Related file  [Esc] Back");
    draw_help(f, chunks[1], help);
}

fn draw_settings(f: &mut Frame, app: &App) {
    let [title, body, help] = frame_layout(f.area());
    draw_title(f, title, "Settings");

    let config = &app.config;
    let api_key = if config.require_api_key().is_ok() {
        "set"
    } else {
        "missing"
    };
    let rows = [
        ("Model", config.model.clone()),
        ("Temperature", config.temperature.to_string()),
        ("Chunk size", config.chunk_size.to_string()),
        ("Chunk overlap", config.chunk_overlap.to_string()),
        ("Transcript languages", config.languages.join(", ")),
        ("Data directory", config.data_dir.display().to_string()),
        ("API key", api_key.to_string()),
    ];

    let lines: Vec<Line> = rows
        .into_iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(format!("{label:<22}"), Style::default().fg(Color::Cyan)),
                Span::raw(value),
            ])
        })
        .chain([
            Line::from(""),
            Line::from(Span::styled(
                "Change these with command-line flags or STRATEGY2CODE_* environment variables.",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .collect();

    let settings = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    f.render_widget(settings, body);

    draw_help(f, help, "[Esc] Back");
}
