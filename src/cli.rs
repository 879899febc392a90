use crate::config::{self, Config};
use crate::core::AnalysisMode;
use crate::error::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "strategy2code")]
#[command(about = "Turn a trading strategy description or YouTube video into indicator and signal code")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Force CLI mode (skip TUI)
    #[arg(long)]
    pub cli: bool,

    #[command(flatten)]
    pub settings: Settings,
}

/// Runtime settings, each with an environment fallback.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// OpenAI API key
    #[arg(long, env = config::API_KEY_ENV, hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Model used for every completion
    #[arg(long, env = "STRATEGY2CODE_MODEL", default_value = config::DEFAULT_MODEL, global = true)]
    pub model: String,

    /// Sampling temperature
    #[arg(long, env = "STRATEGY2CODE_TEMPERATURE", default_value_t = 0.0, global = true)]
    pub temperature: f32,

    /// Maximum characters per chunk when summarizing
    #[arg(long, env = "STRATEGY2CODE_CHUNK_SIZE", default_value_t = config::DEFAULT_CHUNK_SIZE, global = true)]
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks
    #[arg(long, env = "STRATEGY2CODE_CHUNK_OVERLAP", default_value_t = 0, global = true)]
    pub chunk_overlap: usize,

    /// Preferred transcript languages (comma-separated)
    #[arg(short, long, env = "STRATEGY2CODE_LANGUAGES", default_value = "en", global = true)]
    pub languages: String,

    /// Directory holding transcripts/, strategies/ and code/
    #[arg(long, env = "STRATEGY2CODE_DATA_DIR", default_value = ".", global = true)]
    pub data_dir: PathBuf,
}

impl Settings {
    pub fn into_config(self) -> Result<Config> {
        Config {
            api_key: self.api_key,
            model: self.model,
            temperature: self.temperature,
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            languages: config::parse_languages(&self.languages),
            data_dir: self.data_dir,
        }
        .validate()
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate indicator and signal code for a strategy
    Generate {
        /// YouTube video URL or video ID
        #[arg(required_unless_present_any = ["text", "file"], conflicts_with_all = ["text", "file"])]
        video: Option<String>,

        /// Strategy description typed inline
        #[arg(short, long, conflicts_with = "file")]
        text: Option<String>,

        /// Read the strategy description from a file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// How the strategy is analyzed before code generation
        #[arg(short, long, value_enum, default_value_t = AnalysisMode::Extract)]
        mode: AnalysisMode,

        /// Print results without writing them to the data directory
        #[arg(long)]
        no_save: bool,
    },

    /// Download and save a video transcript only
    Transcript {
        /// YouTube video URL or video ID
        video: String,
    },

    /// List saved transcripts, strategies and generated code
    List,

    /// Open TUI interface
    Tui,
}
