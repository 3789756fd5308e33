//! Persistence layer: a transactional document store for games.
//!
//! Every mutation runs inside [`GameStore::transaction`]. A transaction sees
//! its own writes and commits only when the closure returns `Ok`.

mod error;
mod memory;
mod models;
mod schema; // Diesel schema - internal use only
mod sqlite;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use models::{BotAnswer, InputChunk, NewBotAnswer, NewPlayer, NewProblem, Player, Problem, TestResults};
pub use sqlite::SqliteStore;

use crate::bee::{Game, GameState, GameStatus, TestOutcome};
use crate::types::{AnswerId, GameId, GameStateId, PlayerId, ProblemId, TestResultsId};

/// Reads and writes available inside one transaction.
pub trait GameTxn {
    /// Inserts a player, returning its id.
    fn insert_player(&mut self, player: NewPlayer) -> Result<PlayerId, StoreError>;

    /// Loads a player.
    fn player(&mut self, id: PlayerId) -> Result<Option<Player>, StoreError>;

    /// Loads the bot player for a bot type.
    fn player_by_bot_type(&mut self, bot_type: &str) -> Result<Option<Player>, StoreError>;

    /// Inserts a problem, returning its id.
    fn insert_problem(&mut self, problem: NewProblem) -> Result<ProblemId, StoreError>;

    /// Loads a problem.
    fn problem(&mut self, id: ProblemId) -> Result<Option<Problem>, StoreError>;

    /// Inserts a game, returning its id.
    fn insert_game(&mut self, game: &Game) -> Result<GameId, StoreError>;

    /// Loads a game.
    fn game(&mut self, id: GameId) -> Result<Option<Game>, StoreError>;

    /// Replaces a game's phase record wholesale.
    fn replace_game(&mut self, id: GameId, game: &Game) -> Result<(), StoreError>;

    /// Most recently created games, newest first.
    fn recent_games(&mut self, limit: usize) -> Result<Vec<(GameId, Game)>, StoreError>;

    /// Most recently created games in `status`, newest first.
    fn recent_games_with_status(
        &mut self,
        status: GameStatus,
        limit: usize,
    ) -> Result<Vec<(GameId, Game)>, StoreError>;

    /// Inserts a game state document, returning its id.
    fn insert_game_state(
        &mut self,
        game_id: GameId,
        state: &GameState,
    ) -> Result<GameStateId, StoreError>;

    /// Loads a game state document.
    fn game_state(&mut self, id: GameStateId) -> Result<Option<GameState>, StoreError>;

    /// Replaces a game state document wholesale.
    fn replace_game_state(&mut self, id: GameStateId, state: &GameState)
    -> Result<(), StoreError>;

    /// All log chunks of a game in ascending rank order.
    fn input_chunks(&mut self, game_id: GameId) -> Result<Vec<InputChunk>, StoreError>;

    /// The highest-ranked log chunk of a game.
    fn last_input_chunk(&mut self, game_id: GameId) -> Result<Option<InputChunk>, StoreError>;

    /// Inserts a new log chunk.
    fn insert_input_chunk(&mut self, chunk: &InputChunk) -> Result<(), StoreError>;

    /// Replaces the inputs of an existing log chunk.
    fn replace_input_chunk(&mut self, chunk: &InputChunk) -> Result<(), StoreError>;

    /// Inserts test results, returning their id.
    fn insert_test_results(
        &mut self,
        game_id: GameId,
        results: &[TestOutcome],
    ) -> Result<TestResultsId, StoreError>;

    /// Loads test results.
    fn test_results(&mut self, id: TestResultsId) -> Result<Option<TestResults>, StoreError>;

    /// Cached answers for a bot type and prompt, oldest first.
    fn bot_answers(&mut self, bot_type: &str, prompt: &str) -> Result<Vec<BotAnswer>, StoreError>;

    /// Deletes a cached answer.
    fn delete_bot_answer(&mut self, id: AnswerId) -> Result<(), StoreError>;

    /// Inserts a cached answer, returning its id.
    fn insert_bot_answer(&mut self, answer: NewBotAnswer) -> Result<AnswerId, StoreError>;
}

/// A store that runs closures atomically.
pub trait GameStore: Clone + Send + Sync + 'static {
    /// Runs `f` inside a serializable transaction.
    ///
    /// Writes are committed when `f` returns `Ok` and discarded otherwise.
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn GameTxn) -> Result<T, E>,
        E: From<StoreError>;
}
