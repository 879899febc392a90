use crate::error::{Error, Result};
use std::path::PathBuf;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Runtime settings handed to every service at construction.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub languages: Vec<String>,
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: 0,
            languages: vec!["en".to_string()],
            data_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    pub fn validate(self) -> Result<Self> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig {
                reason: "chunk size must be greater than zero".to_string(),
            });
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig {
                reason: format!(
                    "chunk overlap ({}) must be smaller than chunk size ({})",
                    self.chunk_overlap, self.chunk_size
                ),
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::InvalidConfig {
                reason: format!("temperature {} is outside 0.0..=2.0", self.temperature),
            });
        }
        if self.languages.is_empty() {
            return Err(Error::InvalidConfig {
                reason: "at least one transcript language is required".to_string(),
            });
        }
        Ok(self)
    }

    /// The credential, or `MissingApiKey` when no model call can be made.
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(Error::MissingApiKey {
                env_var: API_KEY_ENV.to_string(),
            }),
        }
    }
}

pub fn parse_languages(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default().validate().expect("valid defaults");
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 0);
        assert_eq!(config.model, "gpt-4o-mini");
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk() {
        let config = Config {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn blank_api_key_is_missing() {
        let config = Config {
            api_key: Some("   ".to_string()),
            ..Config::default()
        };
        assert!(matches!(
            config.require_api_key(),
            Err(Error::MissingApiKey { .. })
        ));
    }

    #[test]
    fn languages_split_on_commas() {
        assert_eq!(parse_languages(" en, es ,,de"), vec!["en", "es", "de"]);
    }
}
