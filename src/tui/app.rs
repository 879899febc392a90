use crate::config::Config;
use crate::core::{
    AnalysisMode, FileEntry, FileType, Pipeline, ProgressEvent, RunOutput, StorageService,
    StrategyInput,
};
use crate::error::{Error, Result};
use crate::tui::components::{ContentKind, ContentViewer, FileList, InputField, ProgressBar};
use crate::tui::events::AppEvent;
use crossterm::event::{KeyCode, KeyEvent, MouseEvent};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Home,
    NewStrategy,
    Processing,
    Results,
    Browser,
    Viewer { file_path: PathBuf },
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMethod {
    Video,
    Manual,
}

impl InputMethod {
    pub fn toggle(self) -> Self {
        match self {
            Self::Video => Self::Manual,
            Self::Manual => Self::Video,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFilter {
    All,
    Transcripts,
    Strategies,
    Code,
}

impl FileFilter {
    pub const ALL: [FileFilter; 4] = [Self::All, Self::Transcripts, Self::Strategies, Self::Code];

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Transcripts => "Transcripts",
            Self::Strategies => "Strategies",
            Self::Code => "Code",
        }
    }

    pub fn matches(self, file: &FileEntry) -> bool {
        match self {
            Self::All => true,
            Self::Transcripts => file.file_type == FileType::Transcript,
            Self::Strategies => file.file_type == FileType::Strategy,
            Self::Code => file.file_type == FileType::Code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultTab {
    Strategy,
    StructuredData,
    Code,
}

impl ResultTab {
    pub const ALL: [ResultTab; 3] = [Self::Strategy, Self::StructuredData, Self::Code];

    pub fn title(self) -> &'static str {
        match self {
            Self::Strategy => "Strategy",
            Self::StructuredData => "Structured Data",
            Self::Code => "Generated Code",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|tab| *tab == self).unwrap_or(0)
    }

    fn offset(self, step: isize) -> Self {
        let len = Self::ALL.len() as isize;
        Self::ALL[(self.index() as isize + step).rem_euclid(len) as usize]
    }
}

/// Sent from a background run back to the UI loop.
#[derive(Debug)]
pub enum ProcessingMessage {
    Progress(ProgressEvent),
    Finished(Box<Result<RunOutput>>),
}

// Focus order on the new strategy form
pub const FOCUS_METHOD: usize = 0;
pub const FOCUS_INPUT: usize = 1;
pub const FOCUS_MODE: usize = 2;
pub const FOCUS_SUBMIT: usize = 3;
const FOCUS_COUNT: usize = 4;

const HOME_OPTIONS: usize = 4;

pub struct App {
    pub state: AppState,
    pub should_quit: bool,
    pub config: Config,
    pub storage: StorageService,

    // Home screen
    pub selected_option: usize,

    // New strategy screen
    pub input_method: InputMethod,
    pub url_input: InputField,
    pub description_input: InputField,
    pub mode: AnalysisMode,
    pub input_focus: usize,
    pub form_error: Option<String>,

    // Processing screen
    pub progress_bar: ProgressBar,
    pub running: bool,
    pub source_label: String,

    // Results screen
    pub last_output: Option<RunOutput>,
    pub result_tab: ResultTab,
    pub result_viewer: Option<ContentViewer>,

    // Browser screen
    pub file_list: FileList,
    pub search_input: InputField,
    pub filter: FileFilter,
    pub status_message: Option<String>,

    // Viewer screen
    pub content_viewer: Option<ContentViewer>,
    pub viewer_height: u16,

    // Async communication
    pub processing_tx: Option<mpsc::UnboundedSender<ProcessingMessage>>,
    pub processing_rx: Option<mpsc::UnboundedReceiver<ProcessingMessage>>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let storage = StorageService::new(&config.data_dir);
        let files = storage.list_files()?;

        let mut url_input = InputField::new("YouTube URL", "https://www.youtube.com/watch?v=...");
        url_input.focused = true;

        Ok(Self {
            state: AppState::Home,
            should_quit: false,
            config,
            storage,

            selected_option: 0,

            input_method: InputMethod::Video,
            url_input,
            description_input: InputField::multiline(
                "Strategy Description",
                "Buy when RSI(14) drops below 30, sell when it rises above 70...",
            ),
            mode: AnalysisMode::default(),
            input_focus: FOCUS_INPUT,
            form_error: None,

            progress_bar: ProgressBar::new(),
            running: false,
            source_label: String::new(),

            last_output: None,
            result_tab: ResultTab::Strategy,
            result_viewer: None,

            file_list: FileList::new(files),
            search_input: InputField::new("Search", "Filter files..."),
            filter: FileFilter::All,
            status_message: None,

            content_viewer: None,
            viewer_height: 0,

            processing_tx: None,
            processing_rx: None,
        })
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::Quit => {
                self.should_quit = true;
            }
            AppEvent::Key(key) => {
                self.handle_key(key)?;
            }
            AppEvent::Mouse(mouse) => {
                self.handle_mouse(mouse);
            }
            AppEvent::Tick => {
                self.handle_tick()?;
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        match &self.state {
            AppState::Home => self.handle_home_key(key),
            AppState::NewStrategy => self.handle_new_strategy_key(key),
            AppState::Processing => self.handle_processing_key(key),
            AppState::Results => self.handle_results_key(key),
            AppState::Browser => self.handle_browser_key(key),
            AppState::Viewer { .. } => self.handle_viewer_key(key),
            AppState::Settings => self.handle_settings_key(key),
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let height = self.viewer_height as usize;
        match self.state {
            AppState::Browser => {
                self.file_list.handle_mouse(mouse);
            }
            AppState::Viewer { .. } => {
                if let Some(viewer) = &mut self.content_viewer {
                    viewer.handle_mouse(mouse, height);
                }
            }
            AppState::Results => {
                if let Some(viewer) = &mut self.result_viewer {
                    viewer.handle_mouse(mouse, height);
                }
            }
            _ => {}
        }
    }

    fn handle_home_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Up => {
                self.selected_option = self.selected_option.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected_option + 1 < HOME_OPTIONS {
                    self.selected_option += 1;
                }
            }
            KeyCode::Char(c @ '1'..='4') => {
                self.selected_option = c as usize - '1' as usize;
            }
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Enter => match self.selected_option {
                0 => self.open_new_strategy(),
                1 => {
                    if self.last_output.is_some() {
                        self.state = AppState::Results;
                    }
                }
                2 => {
                    self.filter = FileFilter::All;
                    self.search_input.clear();
                    self.status_message = None;
                    let refreshed = self.refresh_file_list();
                    self.report("list files", refreshed);
                    self.state = AppState::Browser;
                }
                3 => {
                    self.state = AppState::Settings;
                }
                _ => {}
            },
            _ => {}
        }
        Ok(())
    }

    fn open_new_strategy(&mut self) {
        self.form_error = None;
        self.set_focus(FOCUS_INPUT);
        self.state = AppState::NewStrategy;
    }

    fn active_input(&mut self) -> &mut InputField {
        match self.input_method {
            InputMethod::Video => &mut self.url_input,
            InputMethod::Manual => &mut self.description_input,
        }
    }

    fn set_focus(&mut self, focus: usize) {
        self.input_focus = focus;
        self.url_input.focused = false;
        self.description_input.focused = false;
        if focus == FOCUS_INPUT {
            self.active_input().focused = true;
        }
    }

    fn handle_new_strategy_key(&mut self, key: KeyEvent) -> Result<()> {
        match (self.input_focus, key.code) {
            (_, KeyCode::Esc) => {
                self.state = AppState::Home;
            }
            (_, KeyCode::Tab) => {
                self.set_focus((self.input_focus + 1) % FOCUS_COUNT);
            }
            (_, KeyCode::BackTab) => {
                self.set_focus((self.input_focus + FOCUS_COUNT - 1) % FOCUS_COUNT);
            }
            (FOCUS_SUBMIT, KeyCode::Enter) => {
                self.start_processing()?;
            }
            (FOCUS_INPUT, KeyCode::Enter) if self.input_method == InputMethod::Manual => {
                self.description_input.handle_key(key);
            }
            (_, KeyCode::Enter) => {
                self.set_focus(self.input_focus + 1);
            }
            (FOCUS_METHOD, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')) => {
                self.input_method = self.input_method.toggle();
                self.form_error = None;
            }
            (FOCUS_MODE, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')) => {
                self.mode = self.mode.toggle();
            }
            (FOCUS_INPUT, _) => {
                self.active_input().handle_key(key);
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_processing_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.code != KeyCode::Esc {
            return Ok(());
        }

        if self.running {
            self.progress_bar
                .add_log("A run in progress cannot be cancelled".to_string());
        } else {
            self.progress_bar.reset();
            self.open_new_strategy();
        }
        Ok(())
    }

    fn handle_results_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.state = AppState::Home;
            }
            KeyCode::Char('n') => {
                self.open_new_strategy();
            }
            KeyCode::Tab | KeyCode::Right => {
                self.select_result_tab(self.result_tab.offset(1));
            }
            KeyCode::BackTab | KeyCode::Left => {
                self.select_result_tab(self.result_tab.offset(-1));
            }
            KeyCode::Char(c @ '1'..='3') => {
                self.select_result_tab(ResultTab::ALL[c as usize - '1' as usize]);
            }
            _ => {
                let height = self.viewer_height as usize;
                if let Some(viewer) = &mut self.result_viewer {
                    viewer.handle_key(key, height);
                }
            }
        }
        Ok(())
    }

    /// File errors stay on screen instead of ending the session.
    fn report(&mut self, action: &str, result: Result<()>) {
        if let Err(e) = result {
            warn!(error = %e, "could not {action}");
            self.status_message = Some(format!("Could not {action}: {e}"));
        }
    }

    fn handle_browser_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.search_input.focused {
            match key.code {
                KeyCode::Esc => {
                    self.search_input.focused = false;
                    self.search_input.clear();
                    let refreshed = self.refresh_file_list();
                    self.report("list files", refreshed);
                }
                KeyCode::Enter => {
                    self.search_input.focused = false;
                }
                _ => {
                    self.search_input.handle_key(key);
                    let refreshed = self.refresh_file_list();
                    self.report("list files", refreshed);
                }
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Esc => {
                self.status_message = None;
                self.state = AppState::Home;
            }
            KeyCode::Enter => {
                if let Some(file) = self.file_list.selected().cloned() {
                    let opened = self.open_file(file);
                    self.report("open file", opened);
                }
            }
            KeyCode::Delete | KeyCode::Char('d') => {
                let deleted = self.delete_selected_files();
                self.report("refresh files", deleted);
            }
            KeyCode::Char('/') => {
                self.search_input.focused = true;
            }
            KeyCode::Char('r') => {
                self.status_message = None;
                let refreshed = self.refresh_file_list();
                self.report("list files", refreshed);
            }
            KeyCode::Char(c @ '1'..='4') => {
                self.filter = FileFilter::ALL[c as usize - '1' as usize];
                let refreshed = self.refresh_file_list();
                self.report("list files", refreshed);
            }
            _ => {
                self.file_list.handle_key(key);
            }
        }
        Ok(())
    }

    fn handle_viewer_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.state = AppState::Browser;
            }
            KeyCode::Tab => {
                let opened = self.open_next_related();
                self.report("open related file", opened);
            }
            _ => {
                let height = self.viewer_height as usize;
                if let Some(viewer) = &mut self.content_viewer {
                    viewer.handle_key(key, height);
                }
            }
        }
        Ok(())
    }

    fn handle_settings_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.code == KeyCode::Esc {
            self.state = AppState::Home;
        }
        Ok(())
    }

    fn handle_tick(&mut self) -> Result<()> {
        let mut messages = Vec::new();
        if let Some(rx) = &mut self.processing_rx {
            while let Ok(message) = rx.try_recv() {
                messages.push(message);
            }
        }

        for message in messages {
            match message {
                ProcessingMessage::Progress(event) => self.progress_bar.apply(&event),
                ProcessingMessage::Finished(result) => {
                    self.running = false;
                    match *result {
                        Ok(output) => {
                            self.progress_bar.add_log("Run complete".to_string());
                            self.show_results(output);
                            let refreshed = self.refresh_file_list();
                            self.report("list files", refreshed);
                        }
                        Err(e) => {
                            warn!(error = %e, "strategy run failed");
                            self.progress_bar.fail(e.to_string());
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn start_processing(&mut self) -> Result<()> {
        if !self.active_input().is_valid() {
            self.form_error = Some(match self.input_method {
                InputMethod::Video => "Enter a YouTube URL or video ID".to_string(),
                InputMethod::Manual => "Enter a strategy description".to_string(),
            });
            return Ok(());
        }
        self.form_error = None;

        let input = match self.input_method {
            InputMethod::Video => StrategyInput::Video(self.url_input.value.trim().to_string()),
            InputMethod::Manual => StrategyInput::Description(self.description_input.value.clone()),
        };
        self.source_label = match &input {
            StrategyInput::Video(url) => url.clone(),
            StrategyInput::Description(_) => "Manual description".to_string(),
        };

        self.progress_bar.reset();
        self.state = AppState::Processing;

        // Built per run so a missing key shows up here rather than at startup
        let pipeline = match Pipeline::new(&self.config) {
            Ok(pipeline) => pipeline.with_storage(self.storage.clone()),
            Err(e) => {
                self.progress_bar.fail(e.to_string());
                return Ok(());
            }
        };

        let tx = self
            .processing_tx
            .clone()
            .ok_or_else(|| Error::custom("Processing channel is not initialized"))?;

        self.running = true;
        self.progress_bar.set_status("Starting...");
        info!(mode = %self.mode, source = %self.source_label, "starting strategy run");

        let mode = self.mode;
        tokio::spawn(async move {
            let progress_tx = tx.clone();
            let result = pipeline
                .run(&input, mode, move |event| {
                    let _ = progress_tx.send(ProcessingMessage::Progress(event));
                })
                .await;
            let _ = tx.send(ProcessingMessage::Finished(Box::new(result)));
        });

        Ok(())
    }

    fn show_results(&mut self, output: RunOutput) {
        self.last_output = Some(output);
        self.select_result_tab(ResultTab::Strategy);
        self.selected_option = 1;
        self.state = AppState::Results;
    }

    fn select_result_tab(&mut self, tab: ResultTab) {
        self.result_tab = tab;
        self.result_viewer = self
            .last_output
            .as_ref()
            .map(|output| result_viewer(output, tab));
    }

    fn refresh_file_list(&mut self) -> Result<()> {
        let search_term = self.search_input.value.trim().to_lowercase();
        let files: Vec<FileEntry> = self
            .storage
            .list_files()?
            .into_iter()
            .filter(|file| self.filter.matches(file))
            .filter(|file| search_term.is_empty() || file.name.to_lowercase().contains(&search_term))
            .collect();

        self.file_list.update_items(files);
        Ok(())
    }

    fn open_file(&mut self, file: FileEntry) -> Result<()> {
        let content = std::fs::read_to_string(&file.path)?;
        self.status_message = None;
        self.content_viewer = Some(ContentViewer::from_file(content, &file.path));
        self.state = AppState::Viewer {
            file_path: file.path,
        };
        Ok(())
    }

    /// Cycles through the transcript, strategy and code files of the same run.
    fn open_next_related(&mut self) -> Result<()> {
        let AppState::Viewer { file_path } = &self.state else {
            return Ok(());
        };
        let file_path = file_path.clone();

        let files = self.storage.list_files()?;
        let Some(slug) = files
            .iter()
            .find(|f| f.path == file_path)
            .and_then(|f| f.slug())
        else {
            return Ok(());
        };

        let mut related: Vec<&FileEntry> = files.iter().filter(|f| f.slug() == Some(slug)).collect();
        related.sort_by(|a, b| a.path.cmp(&b.path));

        let position = related
            .iter()
            .position(|f| f.path == file_path)
            .unwrap_or(0);
        if let Some(next) = related.get((position + 1) % related.len()) {
            let next = (*next).clone();
            self.open_file(next)?;
        }
        Ok(())
    }

    fn delete_selected_files(&mut self) -> Result<()> {
        let targets: Vec<PathBuf> = self
            .file_list
            .deletion_targets()
            .into_iter()
            .map(|file| file.path.clone())
            .collect();

        let mut deleted = 0;
        for path in &targets {
            match self.storage.delete_file(path) {
                Ok(()) => deleted += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "delete failed");
                    self.status_message = Some(format!("Could not delete {}: {e}", path.display()));
                }
            }
        }
        if deleted > 0 {
            self.status_message = Some(format!("Deleted {deleted} file(s)"));
        }

        self.refresh_file_list()
    }
}

fn result_viewer(output: &RunOutput, tab: ResultTab) -> ContentViewer {
    let (content, kind) = match tab {
        ResultTab::Strategy => (output.strategy_text().to_string(), ContentKind::Markdown),
        ResultTab::StructuredData => match &output.structured {
            Some(data) => (
                data.to_pretty_json()
                    .unwrap_or_else(|e| format!("Could not render strategy data: {e}")),
                ContentKind::Json,
            ),
            None => (
                format!("No structured data: this run used {} mode.", output.mode),
                ContentKind::Text,
            ),
        },
        ResultTab::Code => (output.code.source.clone(), ContentKind::Code),
    };
    ContentViewer::new(content, tab.title().to_string(), kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GeneratedCode, StrategyData};
    use crossterm::event::KeyModifiers;

    fn app_in(dir: &std::path::Path) -> App {
        let config = Config {
            data_dir: dir.to_path_buf(),
            ..Config::default()
        };
        let mut app = App::new(config).expect("app");
        let (tx, rx) = mpsc::unbounded_channel();
        app.processing_tx = Some(tx);
        app.processing_rx = Some(rx);
        app
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_event(AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)))
            .unwrap();
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn sample_output() -> RunOutput {
        RunOutput {
            mode: AnalysisMode::Extract,
            transcript: None,
            source_text: "Buy when RSI < 30".to_string(),
            summary: None,
            structured: Some(
                StrategyData::from_model_output(
                    r#"{"indicators": {"rsi": {"name": "RSI"}}, "conditions": {"entry": ["RSI < 30"]}}"#,
                )
                .unwrap(),
            ),
            code: GeneratedCode {
                source: "def generate_trading_signal(df):\n    return {\"ACTION\": \"HOLD\"}"
                    .to_string(),
            },
            saved: None,
        }
    }

    #[test]
    fn blank_input_stays_on_the_form() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app_in(tmp.path());

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.state, AppState::NewStrategy);

        // Input -> mode -> submit
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.state, AppState::NewStrategy);
        assert!(app.form_error.is_some());
    }

    #[test]
    fn method_and_mode_toggle_from_the_form() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app_in(tmp.path());
        press(&mut app, KeyCode::Enter);

        press(&mut app, KeyCode::BackTab);
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.input_method, InputMethod::Manual);

        press(&mut app, KeyCode::Tab);
        type_str(&mut app, "RSI dip buy");
        press(&mut app, KeyCode::Enter);
        type_str(&mut app, "Sell above 70");
        assert_eq!(app.input_focus, FOCUS_INPUT);
        assert_eq!(app.description_input.value, "RSI dip buy\nSell above 70");
        assert!(app.url_input.value.is_empty());

        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.mode, AnalysisMode::Summarize);
    }

    #[test]
    fn missing_api_key_is_reported_on_the_processing_screen() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app_in(tmp.path());
        press(&mut app, KeyCode::Enter);
        type_str(&mut app, "https://youtu.be/abc123");
        app.set_focus(FOCUS_SUBMIT);
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.state, AppState::Processing);
        assert!(!app.running);
        let error = app.progress_bar.error.clone().expect("error shown");
        assert!(error.contains("OPENAI_API_KEY"));

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.state, AppState::NewStrategy);
        assert!(app.progress_bar.error.is_none());
    }

    #[test]
    fn finished_run_opens_results_and_tabs_switch() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app_in(tmp.path());
        app.state = AppState::Processing;
        app.running = true;

        let tx = app.processing_tx.clone().unwrap();
        tx.send(ProcessingMessage::Progress(ProgressEvent::Completed {
            stage: crate::core::Stage::Input,
            percent: 25,
        }))
        .unwrap();
        tx.send(ProcessingMessage::Finished(Box::new(Ok(sample_output()))))
            .unwrap();
        app.handle_event(AppEvent::Tick).unwrap();

        assert_eq!(app.state, AppState::Results);
        assert!(!app.running);
        assert_eq!(app.progress_bar.percent, 25);
        assert_eq!(
            app.result_viewer.as_ref().unwrap().content,
            "Buy when RSI < 30"
        );

        press(&mut app, KeyCode::Right);
        assert_eq!(app.result_tab, ResultTab::StructuredData);
        assert!(app.result_viewer.as_ref().unwrap().content.contains("\"rsi\""));

        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.result_viewer.as_ref().unwrap().kind, ContentKind::Code);

        press(&mut app, KeyCode::Right);
        assert_eq!(app.result_tab, ResultTab::Strategy);
    }

    #[test]
    fn failed_run_keeps_the_error_until_escape() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app_in(tmp.path());
        app.state = AppState::Processing;
        app.running = true;

        let err = Error::stage_failed(
            crate::core::Stage::Analyze,
            Error::StrategyExtraction {
                reason: "expected value".to_string(),
            },
        );
        app.processing_tx
            .as_ref()
            .unwrap()
            .send(ProcessingMessage::Finished(Box::new(Err(err))))
            .unwrap();
        app.handle_event(AppEvent::Tick).unwrap();
        app.handle_event(AppEvent::Tick).unwrap();

        assert_eq!(app.state, AppState::Processing);
        assert_eq!(app.progress_bar.percent, 0);
        assert!(app
            .progress_bar
            .error
            .as_deref()
            .unwrap()
            .contains("Failed to extract trading strategy details"));
        assert!(app.last_output.is_none());
    }

    #[tokio::test]
    async fn browser_filters_and_deletes_saved_files() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = StorageService::new(tmp.path());
        let output = sample_output();
        storage
            .save_run(
                "manual_20260101_120000",
                output.strategy_text(),
                output.structured.as_ref(),
                &output.code,
            )
            .await
            .unwrap();

        let mut app = app_in(tmp.path());
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.state, AppState::Browser);
        assert_eq!(app.file_list.items.len(), 3);

        press(&mut app, KeyCode::Char('4'));
        assert_eq!(app.file_list.items.len(), 1);
        assert_eq!(app.file_list.items[0].file_type, FileType::Code);

        press(&mut app, KeyCode::Delete);
        assert!(app.file_list.items.is_empty());

        press(&mut app, KeyCode::Char('1'));
        assert_eq!(app.file_list.items.len(), 2);

        press(&mut app, KeyCode::Char('/'));
        type_str(&mut app, ".json");
        assert_eq!(app.file_list.items.len(), 1);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.file_list.items.len(), 2);
        assert_eq!(app.state, AppState::Browser);
    }

    #[tokio::test]
    async fn viewer_cycles_through_files_of_one_run() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = StorageService::new(tmp.path());
        let output = sample_output();
        storage
            .save_run("abc123", output.strategy_text(), None, &output.code)
            .await
            .unwrap();

        let mut app = app_in(tmp.path());
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('4'));
        press(&mut app, KeyCode::Enter);

        let AppState::Viewer { file_path } = &app.state else {
            panic!("expected viewer");
        };
        assert!(file_path.ends_with("code/code_abc123.py"));

        press(&mut app, KeyCode::Tab);
        let AppState::Viewer { file_path } = &app.state else {
            panic!("expected viewer");
        };
        assert!(file_path.ends_with("strategies/strategy_abc123.md"));
        assert_eq!(
            app.content_viewer.as_ref().unwrap().kind,
            ContentKind::Markdown
        );
    }

    #[tokio::test]
    async fn unreadable_file_is_reported_without_leaving_the_browser() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = StorageService::new(tmp.path());
        let output = sample_output();
        let saved = storage
            .save_run("abc123", output.strategy_text(), None, &output.code)
            .await
            .unwrap();

        let mut app = app_in(tmp.path());
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('4'));
        assert_eq!(app.file_list.items.len(), 1);

        // Removed behind the list's back
        std::fs::remove_file(&saved.code).unwrap();
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.state, AppState::Browser);
        assert!(!app.should_quit);
        assert!(app
            .status_message
            .as_deref()
            .unwrap()
            .starts_with("Could not open file"));

        press(&mut app, KeyCode::Char('r'));
        assert!(app.status_message.is_none());
        assert!(app.file_list.items.is_empty());
    }
}
