//! In-memory store for tests and ephemeral servers.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, instrument};

use super::{
    BotAnswer, GameStore, GameTxn, InputChunk, NewBotAnswer, NewPlayer, NewProblem, Player,
    Problem, StoreError, TestResults,
};
use crate::bee::{Game, GameState, GameStatus, TestOutcome};
use crate::types::{AnswerId, GameId, GameStateId, PlayerId, ProblemId, TestResultsId};

#[derive(Debug, Clone, Default)]
struct MemoryTables {
    next_id: i64,
    players: BTreeMap<PlayerId, Player>,
    problems: BTreeMap<ProblemId, Problem>,
    games: BTreeMap<GameId, Game>,
    game_states: BTreeMap<GameStateId, GameState>,
    input_chunks: BTreeMap<(GameId, i64), InputChunk>,
    test_results: BTreeMap<TestResultsId, TestResults>,
    bot_answers: BTreeMap<AnswerId, BotAnswer>,
}

impl MemoryTables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Store holding every table in process memory.
///
/// A transaction holds the lock for its whole duration and works on a staged
/// copy that replaces the tables only on success.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryTables>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        debug!("Creating in-memory store");
        Self::default()
    }
}

impl GameStore for MemoryStore {
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn GameTxn) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| StoreError::new("Memory store lock poisoned"))?;

        let mut staged = guard.clone();
        let result = f(&mut MemoryTxn {
            tables: &mut staged,
        })?;
        *guard = staged;
        Ok(result)
    }
}

struct MemoryTxn<'a> {
    tables: &'a mut MemoryTables,
}

impl GameTxn for MemoryTxn<'_> {
    fn insert_player(&mut self, player: NewPlayer) -> Result<PlayerId, StoreError> {
        if let Some(bot_type) = player.bot_type() {
            let taken = self
                .tables
                .players
                .values()
                .any(|p| p.bot_type().as_deref() == Some(bot_type.as_str()));
            if taken {
                return Err(StoreError::new(format!(
                    "Bot type '{}' already has a player",
                    bot_type
                )));
            }
        }
        let id = self.tables.allocate_id();
        self.tables.players.insert(
            id,
            Player::new(id, player.name().clone(), player.bot_type().clone()),
        );
        Ok(id)
    }

    fn player(&mut self, id: PlayerId) -> Result<Option<Player>, StoreError> {
        Ok(self.tables.players.get(&id).cloned())
    }

    fn player_by_bot_type(&mut self, bot_type: &str) -> Result<Option<Player>, StoreError> {
        Ok(self
            .tables
            .players
            .values()
            .find(|p| p.bot_type().as_deref() == Some(bot_type))
            .cloned())
    }

    fn insert_problem(&mut self, problem: NewProblem) -> Result<ProblemId, StoreError> {
        let id = self.tables.allocate_id();
        self.tables.problems.insert(id, problem.into_problem(id));
        Ok(id)
    }

    fn problem(&mut self, id: ProblemId) -> Result<Option<Problem>, StoreError> {
        Ok(self.tables.problems.get(&id).cloned())
    }

    fn insert_game(&mut self, game: &Game) -> Result<GameId, StoreError> {
        let id = self.tables.allocate_id();
        self.tables.games.insert(id, game.clone());
        Ok(id)
    }

    fn game(&mut self, id: GameId) -> Result<Option<Game>, StoreError> {
        Ok(self.tables.games.get(&id).cloned())
    }

    fn replace_game(&mut self, id: GameId, game: &Game) -> Result<(), StoreError> {
        let slot = self
            .tables
            .games
            .get_mut(&id)
            .ok_or_else(|| StoreError::new(format!("No game {} to replace", id)))?;
        *slot = game.clone();
        Ok(())
    }

    fn recent_games(&mut self, limit: usize) -> Result<Vec<(GameId, Game)>, StoreError> {
        Ok(self
            .tables
            .games
            .iter()
            .rev()
            .take(limit)
            .map(|(id, game)| (*id, game.clone()))
            .collect())
    }

    fn recent_games_with_status(
        &mut self,
        status: GameStatus,
        limit: usize,
    ) -> Result<Vec<(GameId, Game)>, StoreError> {
        Ok(self
            .tables
            .games
            .iter()
            .rev()
            .filter(|(_, game)| game.status() == status)
            .take(limit)
            .map(|(id, game)| (*id, game.clone()))
            .collect())
    }

    fn insert_game_state(
        &mut self,
        _game_id: GameId,
        state: &GameState,
    ) -> Result<GameStateId, StoreError> {
        let id = self.tables.allocate_id();
        self.tables.game_states.insert(id, state.clone());
        Ok(id)
    }

    fn game_state(&mut self, id: GameStateId) -> Result<Option<GameState>, StoreError> {
        Ok(self.tables.game_states.get(&id).cloned())
    }

    fn replace_game_state(
        &mut self,
        id: GameStateId,
        state: &GameState,
    ) -> Result<(), StoreError> {
        let slot = self
            .tables
            .game_states
            .get_mut(&id)
            .ok_or_else(|| StoreError::new(format!("No game state {} to replace", id)))?;
        *slot = state.clone();
        Ok(())
    }

    fn input_chunks(&mut self, game_id: GameId) -> Result<Vec<InputChunk>, StoreError> {
        Ok(self
            .tables
            .input_chunks
            .range((game_id, i64::MIN)..=(game_id, i64::MAX))
            .map(|(_, chunk)| chunk.clone())
            .collect())
    }

    fn last_input_chunk(&mut self, game_id: GameId) -> Result<Option<InputChunk>, StoreError> {
        Ok(self
            .tables
            .input_chunks
            .range((game_id, i64::MIN)..=(game_id, i64::MAX))
            .next_back()
            .map(|(_, chunk)| chunk.clone()))
    }

    fn insert_input_chunk(&mut self, chunk: &InputChunk) -> Result<(), StoreError> {
        let key = (*chunk.game_id(), *chunk.rank());
        if self.tables.input_chunks.contains_key(&key) {
            return Err(StoreError::new(format!(
                "Chunk {} of game {} already exists",
                key.1, key.0
            )));
        }
        self.tables.input_chunks.insert(key, chunk.clone());
        Ok(())
    }

    fn replace_input_chunk(&mut self, chunk: &InputChunk) -> Result<(), StoreError> {
        let key = (*chunk.game_id(), *chunk.rank());
        let slot = self.tables.input_chunks.get_mut(&key).ok_or_else(|| {
            StoreError::new(format!("No chunk {} of game {} to replace", key.1, key.0))
        })?;
        *slot = chunk.clone();
        Ok(())
    }

    fn insert_test_results(
        &mut self,
        game_id: GameId,
        results: &[TestOutcome],
    ) -> Result<TestResultsId, StoreError> {
        let id = self.tables.allocate_id();
        self.tables
            .test_results
            .insert(id, TestResults::new(id, game_id, results.to_vec()));
        Ok(id)
    }

    fn test_results(&mut self, id: TestResultsId) -> Result<Option<TestResults>, StoreError> {
        Ok(self.tables.test_results.get(&id).cloned())
    }

    fn bot_answers(&mut self, bot_type: &str, prompt: &str) -> Result<Vec<BotAnswer>, StoreError> {
        Ok(self
            .tables
            .bot_answers
            .values()
            .filter(|a| a.bot_type() == bot_type && a.prompt() == prompt)
            .cloned()
            .collect())
    }

    fn delete_bot_answer(&mut self, id: AnswerId) -> Result<(), StoreError> {
        self.tables.bot_answers.remove(&id);
        Ok(())
    }

    fn insert_bot_answer(&mut self, answer: NewBotAnswer) -> Result<AnswerId, StoreError> {
        let id = self.tables.allocate_id();
        self.tables.bot_answers.insert(id, answer.into_answer(id));
        Ok(id)
    }
}
