use crate::core::chunker::TextSplitter;
use crate::core::llm::{LanguageModel, Prompt, unwrap_fenced_block};
use crate::core::prompts;
use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Indicators, parameters and entry/exit rules pulled out of a strategy text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyData {
    pub indicators: BTreeMap<String, Indicator>,
    pub conditions: Conditions,
    #[serde(default, deserialize_with = "one_or_many")]
    pub notes: Vec<String>,
    /// Anything else the model returned, such as top-level `parameters` or a timeframe.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub name: String,
    #[serde(default)]
    pub function: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    #[serde(default, deserialize_with = "one_or_many")]
    pub entry: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub exit: Vec<String>,
}

impl StrategyData {
    /// Parse a model response, unwrapping a single fenced code block if present.
    pub fn from_model_output(raw: &str) -> Result<Self> {
        let body = unwrap_fenced_block(raw);

        let value: serde_json::Value =
            serde_json::from_str(body.trim()).map_err(|e| Error::StrategyExtraction {
                reason: format!("response is not valid JSON ({e})"),
            })?;

        let mut data: StrategyData =
            serde_json::from_value(value).map_err(|e| Error::InvalidStrategy {
                reason: e.to_string(),
            })?;

        let mut indicators = BTreeMap::new();
        for (key, indicator) in std::mem::take(&mut data.indicators) {
            let id = key.trim().to_lowercase();
            if indicators.contains_key(&id) {
                return Err(Error::InvalidStrategy {
                    reason: format!("indicator '{key}' appears more than once"),
                });
            }
            indicators.insert(id, indicator);
        }
        data.indicators = indicators;

        data.validate()?;
        Ok(data)
    }

    pub fn validate(&self) -> Result<()> {
        if self.indicators.is_empty() {
            return Err(Error::InvalidStrategy {
                reason: "no indicators were identified".to_string(),
            });
        }

        if let Some(key) = self
            .indicators
            .iter()
            .find(|(key, indicator)| key.is_empty() || indicator.name.trim().is_empty())
            .map(|(key, _)| key)
        {
            return Err(Error::InvalidStrategy {
                reason: format!("indicator '{key}' is missing a name"),
            });
        }

        let has_rule = self
            .conditions
            .entry
            .iter()
            .chain(&self.conditions.exit)
            .any(|rule| !rule.trim().is_empty());
        if !has_rule {
            return Err(Error::InvalidStrategy {
                reason: "no entry or exit conditions were identified".to_string(),
            });
        }

        Ok(())
    }

    pub fn indicator_ids(&self) -> impl Iterator<Item = &str> {
        self.indicators.keys().map(String::as_str)
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn one_or_many<'de, D>(deserializer: D) -> core::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Null(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) if s.trim().is_empty() => Vec::new(),
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
        OneOrMany::Null(()) => Vec::new(),
    })
}

/// Condenses or structures a strategy text with the language model.
#[derive(Clone)]
pub struct StrategyAnalyzer {
    model: Arc<dyn LanguageModel>,
    splitter: TextSplitter,
}

impl StrategyAnalyzer {
    pub fn new(model: Arc<dyn LanguageModel>, splitter: TextSplitter) -> Self {
        Self { model, splitter }
    }

    /// One model call per chunk; the partial summaries are joined with blank lines.
    pub async fn summarize(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(Error::EmptyInput);
        }

        let chunks = self.splitter.split(text);
        info!(
            chunks = chunks.len(),
            chunk_size = self.splitter.chunk_size(),
            "summarizing strategy"
        );

        let mut parts = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let prompt = Prompt::user(prompts::render(
                prompts::SUMMARIZE,
                &[("context", chunk.as_str())],
            ));
            let part = self.model.complete(&prompt).await?;
            debug!(chunk = i, summary_chars = part.len(), "chunk summarized");
            if !part.trim().is_empty() {
                parts.push(part.trim().to_string());
            }
        }

        if parts.is_empty() {
            return Err(Error::EmptyGeneration);
        }
        Ok(parts.join("\n\n"))
    }

    /// A single model call over the whole text, validated against [`StrategyData`].
    pub async fn extract(&self, text: &str) -> Result<StrategyData> {
        if text.trim().is_empty() {
            return Err(Error::EmptyInput);
        }

        let prompt = Prompt::with_system(
            prompts::EXTRACT_SYSTEM,
            prompts::render(prompts::EXTRACT_USER, &[("strategy_desc", text)]),
        );
        let raw = self.model.complete(&prompt).await?;
        let data = StrategyData::from_model_output(&raw)?;

        info!(
            indicators = data.indicators.len(),
            entry_rules = data.conditions.entry.len(),
            exit_rules = data.conditions.exit.len(),
            "strategy extracted"
        );
        Ok(data)
    }
}
