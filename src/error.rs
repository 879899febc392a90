use crate::core::pipeline::Stage;
use derive_more::{Display, From};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, From)]
pub enum Error {
    #[display("{_0}")]
    Custom(String),

    #[display("No strategy input provided")]
    EmptyInput,

    #[display("Not a usable YouTube URL or video ID: {input}")]
    InvalidVideoUrl { input: String },

    #[display("Transcript unavailable for video {video_id}: {reason}")]
    TranscriptUnavailable { video_id: String, reason: String },

    #[display("Transcript for video {video_id} has no caption text")]
    EmptyTranscript { video_id: String },

    #[display("Failed to extract trading strategy details: {reason}")]
    StrategyExtraction { reason: String },

    #[display("Extracted strategy does not match the expected schema: {reason}")]
    InvalidStrategy { reason: String },

    #[display("Language model returned an empty response")]
    EmptyGeneration,

    #[display("Missing API key: {env_var} is not set")]
    MissingApiKey { env_var: String },

    #[display("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[display("{stage} stage failed: {source}")]
    StageFailed { stage: Stage, source: Box<Error> },

    #[from]
    #[display("IO error: {_0}")]
    Io(std::io::Error),

    #[from]
    #[display("JSON error: {_0}")]
    Json(serde_json::Error),

    #[from]
    #[display("OpenAI error: {_0}")]
    OpenAI(async_openai::error::OpenAIError),
}

impl Error {
    pub fn custom(val: impl std::fmt::Display) -> Self {
        Self::Custom(val.to_string())
    }

    pub fn stage_failed(stage: Stage, source: Error) -> Self {
        Self::StageFailed {
            stage,
            source: Box::new(source),
        }
    }

    /// The pipeline stage that halted the run, if this error came out of one.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::StageFailed { source, .. } => Some(source.as_ref()),
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::OpenAI(e) => Some(e),
            _ => None,
        }
    }
}
