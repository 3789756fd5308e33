//! Registry of bots that can be asked for answers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::llm_client::AskBot;
use crate::config::BeeConfig;

/// Maps bot types to the clients that answer for them.
#[derive(Clone, Default)]
pub struct BotRoster {
    bots: HashMap<String, Arc<dyn AskBot>>,
}

impl fmt::Debug for BotRoster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotRoster")
            .field("bot_types", &self.bot_types())
            .finish()
    }
}

impl BotRoster {
    /// An empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a provider bot for every configured bot with an API key.
    ///
    /// Requests are bounded by the configured bot timeout. Bots without
    /// credentials are left out with a warning.
    #[instrument(skip(config), fields(configured = config.bots().len()))]
    pub fn from_config(config: &BeeConfig) -> Self {
        let mut roster = Self::new();
        for bot in config.bots() {
            let built = bot
                .create_llm_config()
                .map_err(|e| e.to_string())
                .and_then(|llm| {
                    llm.with_timeout(config.bot_timeout())
                        .into_bot()
                        .map_err(|e| e.to_string())
                });
            match built {
                Ok(client) => roster.insert(bot.bot_type().clone(), client),
                Err(e) => warn!(bot_type = %bot.bot_type(), error = %e, "Bot unavailable"),
            }
        }
        info!(available = roster.bots.len(), "Bot roster ready");
        roster
    }

    /// Registers a client for a bot type, replacing any previous one.
    pub fn insert(&mut self, bot_type: impl Into<String>, bot: Arc<dyn AskBot>) {
        self.bots.insert(bot_type.into(), bot);
    }

    /// The client for a bot type.
    pub fn get(&self, bot_type: &str) -> Option<Arc<dyn AskBot>> {
        self.bots.get(bot_type).cloned()
    }

    /// Registered bot types, sorted.
    pub fn bot_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.bots.keys().cloned().collect();
        types.sort();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::LlmError;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl AskBot for Echo {
        async fn ask(&self, prompt: &str) -> Result<String, LlmError> {
            Ok(prompt.to_string())
        }
    }

    #[tokio::test]
    async fn test_inserted_bot_answers() {
        let mut roster = BotRoster::new();
        roster.insert("echo", Arc::new(Echo));

        let bot = roster.get("echo").expect("registered");
        assert_eq!(bot.ask("hi").await.expect("answer"), "hi");
        assert!(roster.get("missing").is_none());
        assert_eq!(roster.bot_types(), vec!["echo".to_string()]);
    }
}
