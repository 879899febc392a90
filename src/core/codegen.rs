use crate::core::llm::{LanguageModel, Prompt, unwrap_fenced_block};
use crate::core::prompts;
use crate::core::strategy::StrategyData;
use crate::error::Result;
use std::sync::Arc;
use tracing::info;

pub const TARGET_LANGUAGE: &str = "python";

/// What the generator is told about the strategy.
#[derive(Debug, Clone, Copy)]
pub enum StrategyDescription<'a> {
    Summary(&'a str),
    Structured(&'a StrategyData),
}

impl StrategyDescription<'_> {
    fn render(&self) -> Result<String> {
        match self {
            Self::Summary(text) => Ok(text.to_string()),
            Self::Structured(data) => data.to_pretty_json(),
        }
    }
}

/// Model output, kept exactly as returned. Never parsed or executed here.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedCode {
    pub source: String,
}

impl GeneratedCode {
    pub fn language(&self) -> &'static str {
        TARGET_LANGUAGE
    }

    /// Source with a surrounding Markdown fence removed, for writing to a `.py` file.
    pub fn code_body(&self) -> String {
        unwrap_fenced_block(&self.source)
    }
}

#[derive(Clone)]
pub struct CodeGenerator {
    model: Arc<dyn LanguageModel>,
}

impl CodeGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn generate(&self, description: StrategyDescription<'_>) -> Result<GeneratedCode> {
        let strategy_desc = description.render()?;
        let user = prompts::render(
            prompts::CODEGEN_USER,
            &[("strategy_desc", strategy_desc.as_str())],
        );
        let prompt = Prompt::with_system(prompts::CODEGEN_SYSTEM, user);

        let source = self.model.complete(&prompt).await?;
        info!(
            model = self.model.model_name(),
            code_chars = source.len(),
            "code generated"
        );

        Ok(GeneratedCode { source })
    }
}
