use crate::config::Config;
use crate::core::chunker::TextSplitter;
use crate::core::codegen::{CodeGenerator, GeneratedCode, StrategyDescription};
use crate::core::llm::{LanguageModel, OpenAiModel};
use crate::core::storage::{SavedRun, StorageService};
use crate::core::strategy::{StrategyAnalyzer, StrategyData};
use crate::core::transcript::{Transcript, TranscriptService, extract_video_id};
use crate::error::{Error, Result};
use derive_more::Display;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The four steps of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Stage {
    #[display("Input")]
    Input,
    #[display("Analysis")]
    Analyze,
    #[display("Code generation")]
    Generate,
    #[display("Finalize")]
    Finalize,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Input, Stage::Analyze, Stage::Generate, Stage::Finalize];

    /// Percentage shown once this stage has completed.
    pub fn progress(self) -> u16 {
        match self {
            Self::Input => 25,
            Self::Analyze => 50,
            Self::Generate => 75,
            Self::Finalize => 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, clap::ValueEnum)]
pub enum AnalysisMode {
    /// Structured indicators and rules as validated JSON
    #[default]
    #[display("extract")]
    Extract,
    /// Free-text summary, one model call per chunk
    #[display("summarize")]
    Summarize,
}

impl AnalysisMode {
    pub fn toggle(self) -> Self {
        match self {
            Self::Extract => Self::Summarize,
            Self::Summarize => Self::Extract,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StrategyInput {
    Video(String),
    Description(String),
}

impl StrategyInput {
    fn ensure_present(&self) -> Result<()> {
        let value = match self {
            Self::Video(url) => url,
            Self::Description(text) => text,
        };
        if value.trim().is_empty() {
            return Err(Error::EmptyInput);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Started { stage: Stage, status: String },
    Completed { stage: Stage, percent: u16 },
    Log(String),
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub mode: AnalysisMode,
    pub transcript: Option<Transcript>,
    /// The transcript or manual description the run was based on.
    pub source_text: String,
    pub summary: Option<String>,
    pub structured: Option<StrategyData>,
    pub code: GeneratedCode,
    pub saved: Option<SavedRun>,
}

impl RunOutput {
    /// Text for the "Strategy" view: the summary when there is one, else the source.
    pub fn strategy_text(&self) -> &str {
        self.summary.as_deref().unwrap_or(&self.source_text)
    }

    /// Video ID for video runs, a timestamped name for manual ones.
    pub fn slug(&self) -> String {
        match &self.transcript {
            Some(transcript) => transcript.video_id.clone(),
            None => format!("manual_{}", chrono::Local::now().format("%Y%m%d_%H%M%S")),
        }
    }
}

/// Linear run: input, analysis, code generation, finalize.
///
/// The first failing stage ends the run with [`Error::StageFailed`]; nothing
/// after it executes.
#[derive(Clone)]
pub struct Pipeline {
    transcripts: TranscriptService,
    analyzer: StrategyAnalyzer,
    generator: CodeGenerator,
    storage: Option<StorageService>,
}

impl Pipeline {
    pub fn new(config: &Config) -> Result<Self> {
        let model: Arc<dyn LanguageModel> = Arc::new(OpenAiModel::new(config)?);
        let transcripts = TranscriptService::new(config)?;
        Ok(Self::from_parts(
            transcripts,
            model,
            TextSplitter::from_config(config),
        ))
    }

    pub fn from_parts(
        transcripts: TranscriptService,
        model: Arc<dyn LanguageModel>,
        splitter: TextSplitter,
    ) -> Self {
        Self {
            transcripts,
            analyzer: StrategyAnalyzer::new(model.clone(), splitter),
            generator: CodeGenerator::new(model),
            storage: None,
        }
    }

    pub fn with_storage(mut self, storage: StorageService) -> Self {
        self.storage = Some(storage);
        self
    }

    pub async fn run<F>(
        &self,
        input: &StrategyInput,
        mode: AnalysisMode,
        on_progress: F,
    ) -> Result<RunOutput>
    where
        F: Fn(ProgressEvent) + Send + Sync,
    {
        input.ensure_present()?;

        let started = |stage: Stage, status: &str| {
            on_progress(ProgressEvent::Started {
                stage,
                status: status.to_string(),
            })
        };
        let completed = |stage: Stage| {
            on_progress(ProgressEvent::Completed {
                stage,
                percent: stage.progress(),
            })
        };

        // Input
        let (transcript, source_text) = match input {
            StrategyInput::Video(url) => {
                started(Stage::Input, "Fetching transcript from video...");
                let (transcript, cached) = self
                    .load_or_fetch(url)
                    .await
                    .map_err(|e| fail(Stage::Input, e))?;
                let verb = if cached { "Loaded saved" } else { "Fetched" };
                on_progress(ProgressEvent::Log(format!(
                    "{verb} transcript for {} ({} lines)",
                    transcript.video_id, transcript.fragment_count
                )));
                let text = transcript.text.clone();
                (Some(transcript), text)
            }
            StrategyInput::Description(text) => {
                started(Stage::Input, "Using manual strategy description...");
                (None, text.trim().to_string())
            }
        };
        completed(Stage::Input);

        // Analyze
        let (summary, structured) = match mode {
            AnalysisMode::Summarize => {
                started(Stage::Analyze, "Summarizing strategy...");
                let summary = self
                    .analyzer
                    .summarize(&source_text)
                    .await
                    .map_err(|e| fail(Stage::Analyze, e))?;
                (Some(summary), None)
            }
            AnalysisMode::Extract => {
                started(Stage::Analyze, "Extracting strategy details...");
                let data = self
                    .analyzer
                    .extract(&source_text)
                    .await
                    .map_err(|e| fail(Stage::Analyze, e))?;
                on_progress(ProgressEvent::Log(format!(
                    "Identified indicators: {}",
                    data.indicator_ids().collect::<Vec<_>>().join(", ")
                )));
                (None, Some(data))
            }
        };
        completed(Stage::Analyze);

        // Generate
        started(Stage::Generate, "Generating code from strategy...");
        let description = match (&summary, &structured) {
            (_, Some(data)) => StrategyDescription::Structured(data),
            (Some(text), None) => StrategyDescription::Summary(text),
            (None, None) => StrategyDescription::Summary(&source_text),
        };
        let code = self
            .generator
            .generate(description)
            .await
            .map_err(|e| fail(Stage::Generate, e))?;
        completed(Stage::Generate);

        // Finalize
        started(Stage::Finalize, "Finalizing...");
        let mut output = RunOutput {
            mode,
            transcript,
            source_text,
            summary,
            structured,
            code,
            saved: None,
        };
        if let Some(storage) = &self.storage {
            let saved = save_output(storage, &output)
                .await
                .map_err(|e| fail(Stage::Finalize, e))?;
            on_progress(ProgressEvent::Log(format!(
                "Saved {} files under {}",
                saved.paths().len(),
                storage.root().display()
            )));
            output.saved = Some(saved);
        }
        completed(Stage::Finalize);

        info!(mode = %mode, "pipeline run complete");
        Ok(output)
    }

    /// Reuses a transcript already saved under the storage root, else downloads it.
    async fn load_or_fetch(&self, url: &str) -> Result<(Transcript, bool)> {
        if let Some(storage) = &self.storage {
            let video_id = extract_video_id(url)?;
            if storage.transcript_exists(&video_id) {
                let text = storage.load_transcript(&video_id).await?;
                if !text.trim().is_empty() {
                    debug!(%video_id, "using saved transcript");
                    let transcript = Transcript {
                        fragment_count: text.lines().count(),
                        video_id,
                        text,
                    };
                    return Ok((transcript, true));
                }
            }
        }

        Ok((self.transcripts.fetch_transcript(url).await?, false))
    }
}

async fn save_output(storage: &StorageService, output: &RunOutput) -> Result<SavedRun> {
    let transcript_path = match &output.transcript {
        Some(transcript) => Some(storage.save_transcript(transcript).await?),
        None => None,
    };

    let mut saved = storage
        .save_run(
            &output.slug(),
            output.strategy_text(),
            output.structured.as_ref(),
            &output.code,
        )
        .await?;
    saved.transcript = transcript_path;
    Ok(saved)
}

fn fail(stage: Stage, source: Error) -> Error {
    warn!(%stage, error = %source, "pipeline stage failed");
    Error::stage_failed(stage, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::testing::ScriptedModel;
    use crate::core::transcript::{CaptionFragment, TranscriptSource};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const RSI_MACD_JSON: &str = r#"{
        "indicators": {
            "rsi": {"name": "Relative Strength Index", "function": "oversold/overbought", "parameters": {"period": 14}},
            "macd": {"name": "MACD", "function": "momentum crossover", "parameters": {"fast": 12, "slow": 26, "signal": 9}}
        },
        "conditions": {
            "entry": ["RSI < 30 and MACD crosses above signal"],
            "exit": ["RSI > 70"]
        },
        "notes": []
    }"#;

    const GENERATED: &str = r#"import pandas as pd
import ta

def calculate_indicators(df: pd.DataFrame) -> pd.DataFrame:
    df["rsi"] = ta.momentum.RSIIndicator(df["Close"], window=14).rsi()
    macd = ta.trend.MACD(df["Close"])
    df["macd"], df["macd_signal"] = macd.macd(), macd.macd_signal()
    return df

def generate_trading_signal(df: pd.DataFrame) -> dict:
    last = df.iloc[-1]
    action = "HOLD"
    if last["rsi"] < 30 and last["macd"] > last["macd_signal"]:
        action = "BUY"
    elif last["rsi"] > 70:
        action = "SELL"
    return {"ACTION": action}
"#;

    struct StaticSource(Mutex<Option<Result<Vec<CaptionFragment>>>>);

    #[async_trait]
    impl TranscriptSource for StaticSource {
        async fn fetch_fragments(&self, _video_id: &str) -> Result<Vec<CaptionFragment>> {
            self.0
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(Error::custom("already fetched")))
        }
    }

    fn transcripts(result: Result<Vec<CaptionFragment>>) -> TranscriptService {
        TranscriptService::with_source(Arc::new(StaticSource(Mutex::new(Some(result)))))
    }

    fn pipeline(source: TranscriptService, model: Arc<ScriptedModel>) -> Pipeline {
        Pipeline::from_parts(source, model, TextSplitter::default())
    }

    fn recorder() -> (Arc<Mutex<Vec<ProgressEvent>>>, impl Fn(ProgressEvent) + Send + Sync) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        (events, move |event: ProgressEvent| sink.lock().unwrap().push(event))
    }

    fn completed_percents(events: &[ProgressEvent]) -> Vec<u16> {
        events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Completed { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn manual_description_extract_then_generate() {
        let model = Arc::new(ScriptedModel::new([RSI_MACD_JSON, GENERATED]));
        let (events, on_progress) = recorder();
        let input = StrategyInput::Description(
            "Buy when RSI < 30 and MACD crosses above signal; sell when RSI > 70.".to_string(),
        );

        let output = pipeline(transcripts(Ok(vec![])), model.clone())
            .run(&input, AnalysisMode::Extract, on_progress)
            .await
            .expect("run succeeds");

        let data = output.structured.as_ref().expect("structured data");
        assert!(data.indicators.contains_key("rsi"));
        assert!(data.indicators.contains_key("macd"));
        assert!(output.code.source.contains("def calculate_indicators"));
        assert!(output.code.source.contains("def generate_trading_signal"));
        assert!(["BUY", "SELL", "HOLD"]
            .iter()
            .all(|action| output.code.source.contains(action)));
        assert!(output.summary.is_none());
        assert!(output.transcript.is_none());

        assert_eq!(model.calls(), 2);
        let sent = model.prompts.lock().unwrap();
        assert!(sent[1].user.contains("\"macd\""));

        assert_eq!(
            completed_percents(&events.lock().unwrap()),
            vec![25, 50, 75, 100]
        );
    }

    #[tokio::test]
    async fn video_summarize_run_uses_the_transcript() {
        let fragments = vec![
            CaptionFragment {
                text: "wait for RSI under 30".to_string(),
                start: 0.0,
                duration: 2.0,
            },
            CaptionFragment {
                text: "then sell above 70".to_string(),
                start: 2.0,
                duration: 2.0,
            },
        ];
        let model = Arc::new(ScriptedModel::new(["RSI mean reversion.", GENERATED]));
        let (_, on_progress) = recorder();

        let output = pipeline(transcripts(Ok(fragments)), model.clone())
            .run(
                &StrategyInput::Video("https://youtu.be/abc123".to_string()),
                AnalysisMode::Summarize,
                on_progress,
            )
            .await
            .expect("run succeeds");

        assert_eq!(output.transcript.as_ref().unwrap().video_id, "abc123");
        assert_eq!(output.strategy_text(), "RSI mean reversion.");
        assert_eq!(output.slug(), "abc123");
        assert!(output.structured.is_none());

        let sent = model.prompts.lock().unwrap();
        assert!(sent[0].user.contains("wait for RSI under 30\nthen sell above 70"));
        assert!(sent[1].user.contains("RSI mean reversion."));
    }

    #[tokio::test]
    async fn transcript_failure_stops_the_run() {
        let model = Arc::new(ScriptedModel::new([RSI_MACD_JSON, GENERATED]));
        let (events, on_progress) = recorder();

        let err = pipeline(
            transcripts(Err(Error::custom("Subtitles are disabled"))),
            model.clone(),
        )
        .run(
            &StrategyInput::Video("https://youtu.be/abc123".to_string()),
            AnalysisMode::Extract,
            on_progress,
        )
        .await
        .unwrap_err();

        assert_eq!(err.failed_stage(), Some(Stage::Input));
        assert!(err.to_string().contains("Subtitles are disabled"));
        assert_eq!(model.calls(), 0);
        assert!(completed_percents(&events.lock().unwrap()).is_empty());
    }

    #[tokio::test]
    async fn malformed_extraction_stops_before_generation() {
        let model = Arc::new(ScriptedModel::new(["not json at all", GENERATED]));
        let (events, on_progress) = recorder();

        let err = pipeline(transcripts(Ok(vec![])), model.clone())
            .run(
                &StrategyInput::Description("RSI strategy".to_string()),
                AnalysisMode::Extract,
                on_progress,
            )
            .await
            .unwrap_err();

        assert_eq!(err.failed_stage(), Some(Stage::Analyze));
        match &err {
            Error::StageFailed { source, .. } => {
                assert!(matches!(**source, Error::StrategyExtraction { .. }))
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(model.calls(), 1);
        assert_eq!(completed_percents(&events.lock().unwrap()), vec![25]);
    }

    #[tokio::test]
    async fn empty_input_never_starts() {
        let model = Arc::new(ScriptedModel::new(Vec::<String>::new()));
        let (events, on_progress) = recorder();

        let err = pipeline(transcripts(Ok(vec![])), model)
            .run(
                &StrategyInput::Description("   ".to_string()),
                AnalysisMode::Extract,
                on_progress,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::EmptyInput));
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn finalize_saves_when_storage_is_attached() {
        let tmp = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new([RSI_MACD_JSON, GENERATED]));
        let (_, on_progress) = recorder();
        let fragments = vec![CaptionFragment {
            text: "RSI below 30, MACD cross".to_string(),
            start: 0.0,
            duration: 1.0,
        }];

        let output = pipeline(transcripts(Ok(fragments)), model)
            .with_storage(StorageService::new(tmp.path()))
            .run(
                &StrategyInput::Video("https://www.youtube.com/watch?v=vid_1".to_string()),
                AnalysisMode::Extract,
                on_progress,
            )
            .await
            .expect("run succeeds");

        let saved = output.saved.expect("saved files");
        assert_eq!(saved.paths().len(), 4);
        assert!(saved.code.ends_with("code/code_vid_1.py"));
        assert!(saved.transcript.unwrap().exists());
    }

    #[tokio::test]
    async fn saved_transcript_skips_the_download() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = StorageService::new(tmp.path());
        storage
            .save_transcript(&Transcript {
                video_id: "abc123".to_string(),
                text: "RSI under 30 means buy".to_string(),
                fragment_count: 1,
            })
            .await
            .unwrap();

        let model = Arc::new(ScriptedModel::new(["RSI reversal.", GENERATED]));
        let (events, on_progress) = recorder();

        let output = pipeline(
            transcripts(Err(Error::custom("network must not be used"))),
            model.clone(),
        )
        .with_storage(storage)
        .run(
            &StrategyInput::Video("https://youtu.be/abc123".to_string()),
            AnalysisMode::Summarize,
            on_progress,
        )
        .await
        .expect("run succeeds");

        assert_eq!(output.source_text, "RSI under 30 means buy");
        assert!(model.prompts.lock().unwrap()[0]
            .user
            .contains("RSI under 30 means buy"));
        assert!(events
            .lock()
            .unwrap()
            .contains(&ProgressEvent::Log(
                "Loaded saved transcript for abc123 (1 lines)".to_string()
            )));
    }

    #[test]
    fn stages_report_quarter_steps() {
        let percents: Vec<u16> = Stage::ALL.iter().map(|s| s.progress()).collect();
        assert_eq!(percents, vec![25, 50, 75, 100]);
    }
}
