use crate::config::Config;
use crate::error::Result;
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::responses::{
        CreateResponseArgs, EasyInputMessageArgs, InputItem, InputParam, OutputItem,
        OutputMessageContent, Role,
    },
};
use async_trait::async_trait;
use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use tracing::{debug, warn};

const MAX_OUTPUT_TOKENS: u32 = 16_000;

/// A system instruction plus the user turn with its content already interpolated.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: Option<String>,
    pub user: String,
}

impl Prompt {
    pub fn user(user: impl Into<String>) -> Self {
        Self {
            system: None,
            user: user.into(),
        }
    }

    pub fn with_system(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            user: user.into(),
        }
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<String>;

    fn model_name(&self) -> &str;
}

#[derive(Clone)]
pub struct OpenAiModel {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiModel {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.require_api_key()?;
        let client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));

        Ok(Self {
            client,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let mut items = Vec::with_capacity(2);
        if let Some(system) = &prompt.system {
            items.push(InputItem::EasyMessage(
                EasyInputMessageArgs::default()
                    .role(Role::System)
                    .content(system.as_str())
                    .build()?,
            ));
        }
        items.push(InputItem::EasyMessage(
            EasyInputMessageArgs::default()
                .role(Role::User)
                .content(prompt.user.as_str())
                .build()?,
        ));

        let request = CreateResponseArgs::default()
            .max_output_tokens(MAX_OUTPUT_TOKENS)
            .model(self.model.as_str())
            .temperature(self.temperature)
            .input(InputParam::Items(items))
            .build()?;

        debug!(model = %self.model, prompt_chars = prompt.user.len(), "sending model request");
        let response = self.client.responses().create(request).await?;

        let mut content = String::new();
        for output in response.output {
            if let OutputItem::Message(out) = output {
                for c in out.content {
                    match c {
                        OutputMessageContent::OutputText(text) => content.push_str(&text.text),
                        _ => {
                            warn!("Unexpected content type: {c:?}");
                            continue;
                        }
                    }
                }
            }
        }

        debug!(model = %self.model, response_chars = content.len(), "model responded");
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Body of the first fenced code block when `raw` starts with a fence, else `raw`.
pub fn unwrap_fenced_block(raw: &str) -> String {
    if !raw.trim_start().starts_with("```") {
        return raw.to_string();
    }

    let mut inside = false;
    let mut body = String::new();
    for event in Parser::new(raw) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(_))) => inside = true,
            Event::End(TagEnd::CodeBlock) if inside => return body,
            Event::Text(text) if inside => body.push_str(&text),
            _ => {}
        }
    }

    if inside { body } else { raw.to_string() }
}
