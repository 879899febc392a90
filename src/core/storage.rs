use crate::core::codegen::GeneratedCode;
use crate::core::strategy::StrategyData;
use crate::core::transcript::{self, Transcript};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs as std_fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use tokio::fs;

const TRANSCRIPTS_DIR: &str = "transcripts";
const STRATEGIES_DIR: &str = "strategies";
const CODE_DIR: &str = "code";
const TRANSCRIPT_PREFIX: &str = "transcript_";
const TRANSCRIPT_SUFFIX: &str = ".txt";
const STRATEGY_PREFIX: &str = "strategy_";
const STRATEGY_TEXT_SUFFIX: &str = ".md";
const STRATEGY_DATA_SUFFIX: &str = ".json";
const CODE_PREFIX: &str = "code_";
const CODE_SUFFIX: &str = ".py";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    pub file_type: FileType,
    pub size: u64,
    pub modified: std::time::SystemTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FileType {
    Transcript,
    Strategy,
    Code,
}

impl FileType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Transcript => "Transcript",
            Self::Strategy => "Strategy",
            Self::Code => "Code",
        }
    }

    fn classify(name: &str) -> Option<Self> {
        if name.starts_with(TRANSCRIPT_PREFIX) && name.ends_with(TRANSCRIPT_SUFFIX) {
            Some(Self::Transcript)
        } else if name.starts_with(STRATEGY_PREFIX)
            && (name.ends_with(STRATEGY_TEXT_SUFFIX) || name.ends_with(STRATEGY_DATA_SUFFIX))
        {
            Some(Self::Strategy)
        } else if name.starts_with(CODE_PREFIX) && name.ends_with(CODE_SUFFIX) {
            Some(Self::Code)
        } else {
            None
        }
    }
}

/// Files written by one finished run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedRun {
    pub transcript: Option<PathBuf>,
    pub strategy_text: PathBuf,
    pub strategy_data: Option<PathBuf>,
    pub code: PathBuf,
}

impl SavedRun {
    pub fn paths(&self) -> Vec<&Path> {
        let mut paths: Vec<&Path> = Vec::new();
        paths.extend(self.transcript.as_deref());
        paths.push(&self.strategy_text);
        paths.extend(self.strategy_data.as_deref());
        paths.push(&self.code);
        paths
    }
}

/// Transcripts and generated runs under one data directory.
#[derive(Debug, Clone)]
pub struct StorageService {
    root: PathBuf,
}

impl StorageService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn ensure_directories(&self) -> Result<()> {
        for name in [TRANSCRIPTS_DIR, STRATEGIES_DIR, CODE_DIR] {
            ensure_directory(&self.dir(name))?;
        }
        Ok(())
    }

    fn transcript_path(&self, video_id: &str) -> Result<PathBuf> {
        let sanitized = transcript::sanitize_video_id(video_id)?;
        Ok(self
            .dir(TRANSCRIPTS_DIR)
            .join(format!("{TRANSCRIPT_PREFIX}{sanitized}{TRANSCRIPT_SUFFIX}")))
    }

    pub fn transcript_exists(&self, video_id: &str) -> bool {
        self.transcript_path(video_id)
            .map(|path| path.exists())
            .unwrap_or(false)
    }

    pub async fn save_transcript(&self, transcript: &Transcript) -> Result<PathBuf> {
        self.ensure_directories()?;
        let path = self.transcript_path(&transcript.video_id)?;

        fs::write(&path, &transcript.text).await?;
        debug!(path = %path.display(), "transcript saved");

        Ok(path)
    }

    pub async fn load_transcript(&self, video_id: &str) -> Result<String> {
        let path = self.transcript_path(video_id)?;
        let content = fs::read_to_string(path).await?;
        Ok(content)
    }

    /// Write the strategy text, structured data (if any) and code for `slug`.
    pub async fn save_run(
        &self,
        slug: &str,
        strategy_text: &str,
        strategy_data: Option<&StrategyData>,
        code: &GeneratedCode,
    ) -> Result<SavedRun> {
        self.ensure_directories()?;
        let slug = transcript::sanitize_video_id(slug)?;

        let strategy_text_path = self
            .dir(STRATEGIES_DIR)
            .join(format!("{STRATEGY_PREFIX}{slug}{STRATEGY_TEXT_SUFFIX}"));
        fs::write(&strategy_text_path, strategy_text).await?;

        let strategy_data_path = match strategy_data {
            Some(data) => {
                let path = self
                    .dir(STRATEGIES_DIR)
                    .join(format!("{STRATEGY_PREFIX}{slug}{STRATEGY_DATA_SUFFIX}"));
                fs::write(&path, data.to_pretty_json()?).await?;
                Some(path)
            }
            None => None,
        };

        let code_path = self
            .dir(CODE_DIR)
            .join(format!("{CODE_PREFIX}{slug}{CODE_SUFFIX}"));
        fs::write(&code_path, code.code_body()).await?;

        debug!(%slug, "run saved");
        Ok(SavedRun {
            transcript: None,
            strategy_text: strategy_text_path,
            strategy_data: strategy_data_path,
            code: code_path,
        })
    }

    pub fn list_files(&self) -> Result<Vec<FileEntry>> {
        self.ensure_directories()?;
        let mut files = Vec::new();

        for dir in [TRANSCRIPTS_DIR, STRATEGIES_DIR, CODE_DIR] {
            let Ok(entries) = std_fs::read_dir(self.dir(dir)) else {
                continue;
            };

            for entry in entries {
                let entry = entry?;
                let path = entry.path();

                if let Some(name) = path.file_name().and_then(|n| n.to_str())
                    && let Some(file_type) = FileType::classify(name)
                {
                    let metadata = entry.metadata()?;
                    files.push(FileEntry {
                        path: path.clone(),
                        name: name.to_string(),
                        file_type,
                        size: metadata.len(),
                        modified: metadata.modified()?,
                    });
                }
            }
        }

        // Newest first
        files.sort_by(|a, b| b.modified.cmp(&a.modified));

        Ok(files)
    }

    pub fn delete_file(&self, path: &Path) -> Result<()> {
        self.ensure_directories()?;
        self.ensure_managed_path(path)?;
        std_fs::remove_file(path)?;
        Ok(())
    }

    fn ensure_managed_path(&self, path: &Path) -> Result<()> {
        let canonical = path
            .canonicalize()
            .map_err(|_| Error::custom("Target file does not exist or cannot be resolved"))?;

        let allowed = [TRANSCRIPTS_DIR, STRATEGIES_DIR, CODE_DIR].iter().any(|dir| {
            self.dir(dir)
                .canonicalize()
                .map(|base| canonical.starts_with(base))
                .unwrap_or(false)
        });

        if !allowed {
            return Err(Error::custom(
                "Refusing to operate on files outside managed transcript/strategy/code directories",
            ));
        }

        Ok(())
    }
}

impl FileEntry {
    pub fn size_label(&self) -> String {
        let size_kb = self.size / 1024;
        if size_kb < 1024 {
            format!("{size_kb}KB")
        } else {
            format!("{:.1}MB", size_kb as f64 / 1024.0)
        }
    }

    /// Video ID or manual-run slug encoded in the file name.
    pub fn slug(&self) -> Option<&str> {
        let name = self.name.as_str();
        match self.file_type {
            FileType::Transcript => name
                .strip_prefix(TRANSCRIPT_PREFIX)?
                .strip_suffix(TRANSCRIPT_SUFFIX),
            FileType::Strategy => {
                let rest = name.strip_prefix(STRATEGY_PREFIX)?;
                rest.strip_suffix(STRATEGY_TEXT_SUFFIX)
                    .or_else(|| rest.strip_suffix(STRATEGY_DATA_SUFFIX))
            }
            FileType::Code => name.strip_prefix(CODE_PREFIX)?.strip_suffix(CODE_SUFFIX),
        }
    }
}

fn ensure_directory(path: &Path) -> Result<()> {
    std_fs::create_dir_all(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = std_fs::metadata(path)?;
        let mut permissions = metadata.permissions();
        if permissions.mode() & 0o777 != 0o700 {
            permissions.set_mode(0o700);
            std_fs::set_permissions(path, permissions)?;
        }
    }

    Ok(())
}
