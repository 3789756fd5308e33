//! Bot players: cached provider answers turned into one input per turn.
//!
//! A bot never waits on a provider inside a transaction. When no cached
//! answer extends the current code, [`take_bot_turn`] returns
//! [`BotTurn::AwaitingAnswer`] and the caller asks the provider out of band,
//! records the answer with [`record_answer`] and re-enters with
//! `must_answer` set.

mod adapter;
mod answers;
mod llm_client;
mod prompt;
mod roster;

pub use adapter::{AskBotArgs, BotTurn, take_bot_turn};
pub use answers::{find_answer, next_bot_input, record_answer};
pub use llm_client::{
    AnthropicBot, AskBot, LlmConfig, LlmError, LlmErrorKind, LlmProvider, OpenAiBot,
};
pub use prompt::{SYSTEM_PROMPT, construct_prompt, parse_answer, strip_whitespace};
pub use roster::BotRoster;
