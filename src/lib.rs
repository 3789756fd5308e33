//! Codebee library - a turn-based collaborative code-writing game
//!
//! Two participants, human or LLM bot, take turns typing one operation at a
//! time into a shared program buffer. The finished program is run against
//! hidden test cases and scored.
//!
//! # Architecture
//!
//! - **Bee**: pure operation and state model, command parsing, typestate
//!   game phases, contracts and invariants
//! - **Engine**: turn validation, input application and next-actor decisions
//! - **Bot**: cached LLM answers turned into one input per turn
//! - **Store**: transactional persistence (in-memory or SQLite via diesel)
//! - **Service**: one transaction per call, follow-up tasks after commit
//! - **Scheduler**: worker for bot turns, provider requests and scoring
//! - **Server**: HTTP API (axum)
//!
//! # Example
//!
//! ```no_run
//! use codebee::{BeeConfig, GameService, MemoryStore, NewProblem, Scheduler};
//!
//! # fn example() -> Result<(), codebee::BeeError> {
//! let (scheduler, _tasks) = Scheduler::channel();
//! let service = GameService::new(MemoryStore::new(), BeeConfig::default(), scheduler);
//!
//! let ann = service.create_player("ann", None)?;
//! let bob = service.create_player("bob", None)?;
//! let problem = service.create_problem(NewProblem::new(
//!     None,
//!     "Return a doubled.".to_string(),
//!     Vec::new(),
//!     true,
//! ))?;
//!
//! let game_id = service.start_game(*ann.id())?;
//! service.join_game(game_id, *bob.id())?;
//! service.select_problem(game_id, *ann.id(), *problem.id())?;
//! service.take_turn(game_id, *ann.id(), "r")?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod bee;
mod bot;
mod config;
mod engine;
mod error;
mod executor;
mod input_log;
mod lifecycle;
mod queries;
mod scheduler;
mod server;
mod service;
mod store;
mod types;

// Crate-level exports - Game model
pub use bee::{
    AlternatingTurnInvariant, BeeInvariants, Contract, DoneGame, FinishTerminalInvariant, Game,
    GameState, GameStatus, HistoryConsistentInvariant, Input, InputDoneGame, InputtingGame,
    Invariant, InvariantSet, InvariantViolation, NotStartedGame, Operation, ParseError,
    PlayersTurn, Side, TestCase, TestOutcome, Transcript, TurnContract, parse_input,
};

// Crate-level exports - Bots
pub use bot::{
    AnthropicBot, AskBot, AskBotArgs, BotRoster, BotTurn, LlmConfig, LlmError, LlmErrorKind,
    LlmProvider, OpenAiBot, SYSTEM_PROMPT, construct_prompt, find_answer, next_bot_input, parse_answer, record_answer,
    strip_whitespace, take_bot_turn,
};

// Crate-level exports - Configuration and errors
pub use config::{BeeConfig, BotConfig, ConfigError};
pub use error::BeeError;

// Crate-level exports - Engine and lifecycle
pub use engine::{NextActor, TurnOutcome, handle_turn};
pub use input_log::{all_inputs, append_input, last_input, replay};
pub use lifecycle::{
    ResultRecorded, Transitioned, add_player_to_game, create_game, get_or_create_bot_player,
    record_result, select_problem,
};

// Crate-level exports - Queries
pub use queries::{
    AuditReport, GameInfo, PlaybackInfo, PlayerView, ScoringInfo, audit_game, game_info,
    info_for_playback, info_for_scoring, ongoing_games, recent_games, spectate,
    watch_game_while_playing,
};

// Crate-level exports - Service, scheduling and execution
pub use executor::{NodeExecutor, SolutionExecutor, solution_source};
pub use scheduler::{Scheduler, Task, TaskRunner, Worker};
pub use server::{ApiError, GameSummary, router};
pub use service::GameService;

// Crate-level exports - Storage
pub use store::{
    BotAnswer, GameStore, GameTxn, InputChunk, MemoryStore, NewBotAnswer, NewPlayer, NewProblem,
    Player, Problem, SqliteStore, StoreError, TestResults,
};
pub use types::{AnswerId, GameId, GameStateId, PlayerId, ProblemId, TestResultsId};
