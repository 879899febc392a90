mod cli;
mod config;
mod core;
mod error;
mod tui;

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::core::{
    AnalysisMode, Pipeline, ProgressEvent, RunOutput, StorageService, StrategyInput,
    TranscriptService, extract_video_id,
};
use crate::error::Result;
use crate::tui::{App, EventHandler, init as tui_init, restore as tui_restore, ui};
use clap::Parser;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "strategy2code.log";
const WRAP_WIDTH: usize = 100;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = cli.settings.into_config()?;

    let tui_mode = matches!(cli.command, Some(Commands::Tui) | None) && !cli.cli;
    init_tracing(&config, tui_mode)?;

    match cli.command {
        Some(Commands::Generate {
            video,
            text,
            file,
            mode,
            no_save,
        }) => {
            let input = match (video, text, file) {
                (Some(url), _, _) => StrategyInput::Video(url),
                (None, Some(text), _) => StrategyInput::Description(text),
                (None, None, Some(path)) => {
                    StrategyInput::Description(tokio::fs::read_to_string(path).await?)
                }
                (None, None, None) => return Err(error::Error::EmptyInput),
            };
            run_cli_generate(&config, input, mode, !no_save).await?;
        }
        Some(Commands::Transcript { video }) => {
            run_cli_transcript(&config, video).await?;
        }
        Some(Commands::List) => {
            run_cli_list(&config)?;
        }
        Some(Commands::Tui) | None => {
            if cli.cli {
                println!("Use 'strategy2code --help' for available commands");
            } else {
                run_tui(config).await?;
            }
        }
    }

    Ok(())
}

fn init_tracing(config: &Config, tui_mode: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if tui_mode {
        // The alternate screen owns stdout/stderr while the TUI runs.
        std::fs::create_dir_all(&config.data_dir)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(config.data_dir.join(LOG_FILE))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    Ok(())
}

async fn run_cli_generate(
    config: &Config,
    input: StrategyInput,
    mode: AnalysisMode,
    save: bool,
) -> Result<()> {
    let mut pipeline = Pipeline::new(config)?;
    if save {
        pipeline = pipeline.with_storage(StorageService::new(&config.data_dir));
    }

    let output = pipeline
        .run(&input, mode, |event| match event {
            ProgressEvent::Started { status, .. } => println!("{status}"),
            ProgressEvent::Completed { stage, percent } => {
                println!("  [{percent:>3}%] {stage} done")
            }
            ProgressEvent::Log(message) => println!("  {message}"),
        })
        .await;

    match output {
        Ok(output) => {
            print_run_output(&output)?;
            Ok(())
        }
        Err(e) => {
            if let Some(stage) = e.failed_stage() {
                eprintln!("Run stopped during the {stage} stage; later stages were skipped.");
            }
            Err(e)
        }
    }
}

fn print_run_output(output: &RunOutput) -> Result<()> {
    let heading = if output.summary.is_some() {
        "Strategy Summary"
    } else {
        "Strategy Description"
    };
    println!();
    println!("=== {heading} ===");
    println!("{}", textwrap::fill(output.strategy_text(), WRAP_WIDTH));

    if let Some(data) = &output.structured {
        println!();
        println!("=== Structured Strategy Data ===");
        println!("{}", data.to_pretty_json()?);
    }

    println!();
    println!("=== Generated Code ({}) ===", output.code.language());
    println!("{}", output.code.source);

    if let Some(saved) = &output.saved {
        println!();
        for path in saved.paths() {
            println!("Saved: {}", path.display());
        }
    }

    Ok(())
}

async fn run_cli_transcript(config: &Config, video_input: String) -> Result<()> {
    let video_id = extract_video_id(&video_input)?;
    let storage = StorageService::new(&config.data_dir);

    if storage.transcript_exists(&video_id) {
        println!("Transcript already exists locally. Skipping download.");
        return Ok(());
    }

    println!("Fetching transcript for video: {video_id}");
    let transcript = TranscriptService::new(config)?
        .fetch_transcript(&video_input)
        .await?;

    let transcript_path = storage.save_transcript(&transcript).await?;
    println!(
        "Transcript saved to: {} ({} lines)",
        transcript_path.display(),
        transcript.fragment_count
    );

    Ok(())
}

fn run_cli_list(config: &Config) -> Result<()> {
    let files = StorageService::new(&config.data_dir).list_files()?;

    if files.is_empty() {
        println!("No files found.");
        return Ok(());
    }

    println!("Found {} files:", files.len());
    println!();

    for file in files {
        println!(
            "{:<12} {:<40} {}",
            file.file_type.label(),
            file.name,
            file.size_label()
        );
    }

    Ok(())
}

/// Everything that can fail before the terminal is taken over.
fn build_app(config: Config) -> Result<App> {
    let mut app = App::new(config)?;

    // Background runs report back over this channel
    let (tx, rx) = mpsc::unbounded_channel();
    app.processing_tx = Some(tx);
    app.processing_rx = Some(rx);

    Ok(app)
}

async fn run_tui(config: Config) -> Result<()> {
    let mut app = build_app(config)?;
    let event_handler = EventHandler::new();

    // Initialize terminal
    let mut terminal = tui_init()?;

    let result = loop {
        if let Err(e) = event_handler
            .next_event()
            .and_then(|event| app.handle_event(event))
        {
            break Err(e);
        }

        if let Err(e) = terminal.draw(|f| ui::draw(f, &mut app)) {
            break Err(e.into());
        }

        if app.should_quit {
            break Ok(());
        }
    };

    tui_restore()?;
    result
}
