//! Game engine configuration.

use std::path::Path;
use std::time::Duration;

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::bot::{LlmConfig, LlmProvider};

/// Engine configuration, passed explicitly to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct BeeConfig {
    /// Buffer length at which a bot-vs-bot game is ended.
    #[serde(default = "default_max_bot_v_bot")]
    max_bot_v_bot: usize,

    /// Entries per input log chunk before a new chunk starts.
    #[serde(default = "default_input_chunk_size")]
    input_chunk_size: usize,

    /// Timeout for one bot provider request.
    #[serde(default = "default_bot_timeout_secs")]
    bot_timeout_secs: u64,

    /// Provider attempts before a bot falls back to a space.
    #[serde(default = "default_bot_max_attempts")]
    bot_max_attempts: u32,

    /// Delay between provider attempts, multiplied by the attempt number.
    #[serde(default = "default_bot_retry_backoff_ms")]
    bot_retry_backoff_ms: u64,

    /// Bots available to play.
    #[serde(default = "default_bots")]
    bots: Vec<BotConfig>,
}

/// One configured bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct BotConfig {
    /// Stable bot type; one bot player exists per type.
    bot_type: String,

    /// Display name of the bot player. Defaults to the bot type.
    #[serde(default)]
    name: Option<String>,

    /// LLM provider (openai or anthropic).
    provider: LlmProvider,

    /// LLM model name.
    model: String,

    /// Maximum tokens for LLM responses.
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
}

#[instrument]
fn default_max_bot_v_bot() -> usize {
    100
}

#[instrument]
fn default_input_chunk_size() -> usize {
    500
}

#[instrument]
fn default_bot_timeout_secs() -> u64 {
    60
}

#[instrument]
fn default_bot_max_attempts() -> u32 {
    5
}

#[instrument]
fn default_bot_retry_backoff_ms() -> u64 {
    500
}

#[instrument]
fn default_max_tokens() -> u32 {
    1000
}

#[instrument]
fn default_bots() -> Vec<BotConfig> {
    vec![
        BotConfig::new("chatgpt", LlmProvider::OpenAI, "gpt-3.5-turbo"),
        BotConfig::new("claude", LlmProvider::Anthropic, "claude-3-opus-20240229"),
    ]
}

impl Default for BeeConfig {
    fn default() -> Self {
        Self {
            max_bot_v_bot: default_max_bot_v_bot(),
            input_chunk_size: default_input_chunk_size(),
            bot_timeout_secs: default_bot_timeout_secs(),
            bot_max_attempts: default_bot_max_attempts(),
            bot_retry_backoff_ms: default_bot_retry_backoff_ms(),
            bots: default_bots(),
        }
    }
}

impl BeeConfig {
    /// Loads configuration from TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(bots = config.bots.len(), "Config loaded successfully");
        Ok(config)
    }

    /// Applies `BEE_MAX_BOT_V_BOT` (or legacy `MAX_BOT_V_BOT`) from the environment.
    #[instrument(skip(self))]
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        let raw = std::env::var("BEE_MAX_BOT_V_BOT").or_else(|_| std::env::var("MAX_BOT_V_BOT"));
        if let Ok(raw) = raw {
            self.max_bot_v_bot = raw.trim().parse().map_err(|e| {
                ConfigError::new(format!("Invalid MAX_BOT_V_BOT value '{}': {}", raw, e))
            })?;
            info!(max_bot_v_bot = self.max_bot_v_bot, "Applied environment override");
        }
        Ok(self)
    }

    /// Provider request timeout.
    pub fn bot_timeout(&self) -> Duration {
        Duration::from_secs(self.bot_timeout_secs)
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn bot_retry_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.bot_retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }

    /// Finds the configuration of a bot type.
    pub fn bot(&self, bot_type: &str) -> Option<&BotConfig> {
        self.bots.iter().find(|b| b.bot_type == bot_type)
    }
}

impl BotConfig {
    /// Creates a bot configuration with default name and token limit.
    #[instrument(skip(bot_type, model))]
    pub fn new(bot_type: impl Into<String>, provider: LlmProvider, model: impl Into<String>) -> Self {
        Self {
            bot_type: bot_type.into(),
            name: None,
            provider,
            model: model.into(),
            max_tokens: default_max_tokens(),
        }
    }

    /// Display name of the bot player.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.bot_type)
    }

    /// Creates LLM configuration for this bot.
    /// Requires OPENAI_API_KEY or ANTHROPIC_API_KEY environment variable.
    #[instrument(skip(self), fields(bot_type = %self.bot_type, provider = ?self.provider))]
    pub fn create_llm_config(&self) -> Result<LlmConfig, ConfigError> {
        let var = match self.provider {
            LlmProvider::OpenAI => "OPENAI_API_KEY",
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
        };
        let api_key = std::env::var(var).map_err(|_| {
            warn!(var, "API key not set");
            ConfigError::new(format!("{} environment variable not set", var))
        })?;

        Ok(LlmConfig::new(self.provider, api_key, self.model.clone())
            .with_max_tokens(self.max_tokens))
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BeeConfig::default();
        assert_eq!(*config.max_bot_v_bot(), 100);
        assert_eq!(*config.input_chunk_size(), 500);
        assert_eq!(config.bot_timeout(), Duration::from_secs(60));
        assert!(config.bot("chatgpt").is_some());
        assert!(config.bot("claude").is_some());
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
max_bot_v_bot = 40

[[bots]]
bot_type = "haiku"
provider = "anthropic"
model = "claude-3-5-haiku-20241022"
"#
        )
        .expect("write");

        let config = BeeConfig::from_file(file.path()).expect("load");
        assert_eq!(*config.max_bot_v_bot(), 40);
        assert_eq!(*config.input_chunk_size(), 500);
        let haiku = config.bot("haiku").expect("haiku");
        assert_eq!(*haiku.max_tokens(), 1000);
        assert_eq!(haiku.display_name(), "haiku");
        assert!(config.bot("chatgpt").is_none());
    }

    #[test]
    fn test_setters_chain() {
        let config = BeeConfig::default()
            .with_max_bot_v_bot(3)
            .with_input_chunk_size(2);
        assert_eq!(*config.max_bot_v_bot(), 3);
        assert_eq!(*config.input_chunk_size(), 2);
    }

    #[test]
    fn test_backoff_grows_linearly() {
        let config = BeeConfig::default().with_bot_retry_backoff_ms(10);
        assert_eq!(config.bot_retry_backoff(3), Duration::from_millis(30));
    }
}
