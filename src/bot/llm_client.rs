//! Provider-backed bots that answer code prompts.
//!
//! Each provider gets its own [`AskBot`] implementation holding a client
//! built once from an [`LlmConfig`]. The roster picks the implementation
//! through [`LlmConfig::into_bot`].

use std::sync::Arc;
use std::time::Duration;

use async_openai::{
    Client as OpenAIClient,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use super::prompt::SYSTEM_PROMPT;

const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 256;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Something that can complete a bot prompt.
///
/// Implemented by [`OpenAiBot`] and [`AnthropicBot`] for real providers
/// and by scripted bots in tests.
#[async_trait]
pub trait AskBot: Send + Sync {
    /// Returns the raw completion text for `prompt`.
    async fn ask(&self, prompt: &str) -> Result<String, LlmError>;
}

/// LLM provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI chat completions.
    OpenAI,
    /// Anthropic messages.
    Anthropic,
}

/// Credentials and request limits for one bot.
#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct LlmConfig {
    #[setters(skip)]
    provider: LlmProvider,
    #[setters(skip)]
    api_key: String,
    #[setters(skip)]
    model: String,
    /// Completion token cap.
    max_tokens: u32,
    /// Per-request timeout applied by the provider client.
    timeout: Duration,
}

impl LlmConfig {
    /// Creates a configuration with the default token cap and timeout.
    #[instrument(skip(api_key, model), fields(provider = ?provider))]
    pub fn new(provider: LlmProvider, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// The configured provider.
    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// Builds the bot for the configured provider.
    #[instrument(skip(self), fields(provider = ?self.provider, model = %self.model))]
    pub fn into_bot(self) -> Result<Arc<dyn AskBot>, LlmError> {
        let bot: Arc<dyn AskBot> = match self.provider {
            LlmProvider::OpenAI => Arc::new(OpenAiBot::new(self)),
            LlmProvider::Anthropic => Arc::new(AnthropicBot::new(self)?),
        };
        Ok(bot)
    }
}

/// Bot answering through OpenAI chat completions.
#[derive(Debug, Clone)]
pub struct OpenAiBot {
    client: OpenAIClient<OpenAIConfig>,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl OpenAiBot {
    /// Creates the bot and its API client.
    pub fn new(config: LlmConfig) -> Self {
        info!(model = %config.model, "Creating OpenAI bot");
        Self {
            client: OpenAIClient::with_config(OpenAIConfig::new().with_api_key(config.api_key)),
            model: config.model,
            max_tokens: config.max_tokens,
            timeout: config.timeout,
        }
    }

    fn messages(prompt: &str) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_PROMPT)
            .build()
            .map_err(|e| LlmError::request(format!("system message: {}", e)))?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| LlmError::request(format!("user message: {}", e)))?;
        Ok(vec![system.into(), user.into()])
    }
}

#[async_trait]
impl AskBot for OpenAiBot {
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn ask(&self, prompt: &str) -> Result<String, LlmError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(Self::messages(prompt)?)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| LlmError::request(format!("chat request: {}", e)))?;

        debug!("Asking OpenAI");
        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| LlmError::timeout(self.timeout))?
            .map_err(|e| LlmError::request(e.to_string()))?;

        let answer = response
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(LlmError::empty)?;
        info!(answer_len = answer.len(), "OpenAI answered");
        Ok(answer)
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Bot answering through the Anthropic messages API.
#[derive(Debug, Clone)]
pub struct AnthropicBot {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicBot {
    /// Creates the bot with an HTTP client bounded by the configured timeout.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        info!(model = %config.model, timeout = ?config.timeout, "Creating Anthropic bot");
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::request(format!("http client: {}", e)))?;
        Ok(Self {
            http,
            api_key: config.api_key,
            model: config.model,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl AskBot for AnthropicBot {
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn ask(&self, prompt: &str) -> Result<String, LlmError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: SYSTEM_PROMPT,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!("Asking Anthropic");
        let response = self
            .http
            .post(ANTHROPIC_MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "Anthropic rejected request");
            return Err(LlmError::status(status.as_u16(), text));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::decode(e.to_string()))?;
        let answer = parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(LlmError::empty)?;
        info!(answer_len = answer.len(), "Anthropic answered");
        Ok(answer)
    }
}

/// What went wrong talking to a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LlmErrorKind {
    /// The request could not be built or sent.
    #[display("request")]
    Request,
    /// The provider answered with a non-success status.
    #[display("status {}", _0)]
    Status(u16),
    /// The response body was not understood.
    #[display("decode")]
    Decode,
    /// The response held no text.
    #[display("empty")]
    Empty,
    /// The provider did not answer in time.
    #[display("timeout")]
    Timeout,
}

/// Provider error with the location it was raised at.
#[derive(Debug, Clone, Display, Error)]
#[display("LLM error ({}): {} at {}:{}", kind, message, file, line)]
pub struct LlmError {
    /// Failure category.
    pub kind: LlmErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl LlmError {
    #[track_caller]
    fn with_kind(kind: LlmErrorKind, message: String) -> Self {
        let loc = std::panic::Location::caller();
        error!(%kind, error_message = %message, "LLM error created");
        Self {
            kind,
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// The request could not be built or sent.
    #[track_caller]
    pub fn request(message: impl Into<String>) -> Self {
        Self::with_kind(LlmErrorKind::Request, message.into())
    }

    /// The provider answered `code` with `body`.
    #[track_caller]
    pub fn status(code: u16, body: impl Into<String>) -> Self {
        Self::with_kind(LlmErrorKind::Status(code), body.into())
    }

    /// The response body could not be decoded.
    #[track_caller]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::with_kind(LlmErrorKind::Decode, message.into())
    }

    /// The response carried no answer text.
    #[track_caller]
    pub fn empty() -> Self {
        Self::with_kind(LlmErrorKind::Empty, "no text in response".to_string())
    }

    /// No answer within `after`.
    #[track_caller]
    pub fn timeout(after: Duration) -> Self {
        Self::with_kind(LlmErrorKind::Timeout, format!("no answer after {:?}", after))
    }
}
