//! SQLite-backed store built on diesel.
//!
//! Games, game states and log chunks are stored as JSON documents in text
//! columns; lookups go through indexed id and `(game_id, chunk_rank)` keys.

use std::sync::{Arc, Mutex};

use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument};

use super::{
    BotAnswer, GameStore, GameTxn, InputChunk, NewBotAnswer, NewPlayer, NewProblem, Player,
    Problem, StoreError, TestResults, schema,
};
use crate::bee::{Game, GameState, GameStatus, TestOutcome};
use crate::types::{AnswerId, GameId, GameStateId, PlayerId, ProblemId, TestResultsId};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

// ─────────────────────────────────────────────────────────────
//  Rows
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = schema::players)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct PlayerRow {
    id: i64,
    name: String,
    bot_type: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = schema::players)]
struct NewPlayerRow<'a> {
    name: &'a str,
    bot_type: Option<&'a str>,
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = schema::problems)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct ProblemRow {
    id: i64,
    summary: Option<String>,
    prompt: String,
    test_cases: String,
    is_published: bool,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = schema::problems)]
struct NewProblemRow<'a> {
    summary: Option<&'a str>,
    prompt: &'a str,
    test_cases: String,
    is_published: bool,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = schema::games)]
struct NewGameRow {
    status: String,
    phase: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = schema::game_states)]
struct NewGameStateRow {
    game_id: i64,
    state: String,
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = schema::input_chunks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct InputChunkRow {
    game_id: i64,
    chunk_rank: i64,
    inputs: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = schema::input_chunks)]
struct NewInputChunkRow {
    game_id: i64,
    chunk_rank: i64,
    inputs: String,
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = schema::test_results)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct TestResultsRow {
    id: i64,
    game_id: i64,
    results: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = schema::test_results)]
struct NewTestResultsRow {
    game_id: i64,
    results: String,
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = schema::ai_answers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct BotAnswerRow {
    id: i64,
    bot_type: String,
    prompt: String,
    solution_snippet: String,
    answer: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = schema::ai_answers)]
struct NewBotAnswerRow<'a> {
    bot_type: &'a str,
    prompt: &'a str,
    solution_snippet: &'a str,
    answer: Option<&'a str>,
}

impl TryFrom<ProblemRow> for Problem {
    type Error = StoreError;

    fn try_from(row: ProblemRow) -> Result<Self, Self::Error> {
        Ok(Problem::new(
            row.id,
            row.summary,
            row.prompt,
            serde_json::from_str(&row.test_cases)?,
            row.is_published,
        ))
    }
}

impl TryFrom<InputChunkRow> for InputChunk {
    type Error = StoreError;

    fn try_from(row: InputChunkRow) -> Result<Self, Self::Error> {
        Ok(InputChunk::new(
            row.game_id,
            row.chunk_rank,
            serde_json::from_str(&row.inputs)?,
        ))
    }
}

// ─────────────────────────────────────────────────────────────
//  Store
// ─────────────────────────────────────────────────────────────

/// Store backed by a single SQLite connection.
///
/// Transactions are serialized by the connection mutex and run as
/// `BEGIN IMMEDIATE` transactions.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<SqliteConnection>>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Opens the database at `db_path` and applies pending migrations.
    ///
    /// Use `":memory:"` for an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the connection or a migration fails.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        debug!("Establishing connection");
        let mut conn = SqliteConnection::establish(db_path)
            .map_err(|e| StoreError::new(format!("Failed to connect to '{}': {}", db_path, e)))?;

        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::new(format!("Migrations failed: {}", e)))?;

        info!(migrations = applied.len(), "SQLite store ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

enum TxnFailure<E> {
    Caller(E),
    Diesel(diesel::result::Error),
}

impl<E> From<diesel::result::Error> for TxnFailure<E> {
    fn from(err: diesel::result::Error) -> Self {
        TxnFailure::Diesel(err)
    }
}

impl GameStore for SqliteStore {
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn GameTxn) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::new("SQLite connection lock poisoned"))?;

        let result = conn.immediate_transaction::<T, TxnFailure<E>, _>(|conn| {
            let mut txn = SqliteTxn { conn };
            f(&mut txn).map_err(TxnFailure::Caller)
        });

        match result {
            Ok(value) => Ok(value),
            Err(TxnFailure::Caller(err)) => Err(err),
            Err(TxnFailure::Diesel(err)) => Err(StoreError::from(err).into()),
        }
    }
}

struct SqliteTxn<'a> {
    conn: &'a mut SqliteConnection,
}

impl GameTxn for SqliteTxn<'_> {
    fn insert_player(&mut self, player: NewPlayer) -> Result<PlayerId, StoreError> {
        let row = NewPlayerRow {
            name: player.name(),
            bot_type: player.bot_type().as_deref(),
        };
        let id = diesel::insert_into(schema::players::table)
            .values(&row)
            .returning(schema::players::id)
            .get_result::<i64>(&mut *self.conn)?;
        debug!(player_id = id, "Player inserted");
        Ok(id)
    }

    fn player(&mut self, id: PlayerId) -> Result<Option<Player>, StoreError> {
        let row = schema::players::table
            .find(id)
            .select(PlayerRow::as_select())
            .first::<PlayerRow>(&mut *self.conn)
            .optional()?;
        Ok(row.map(|r| Player::new(r.id, r.name, r.bot_type)))
    }

    fn player_by_bot_type(&mut self, bot_type: &str) -> Result<Option<Player>, StoreError> {
        let row = schema::players::table
            .filter(schema::players::bot_type.eq(bot_type))
            .select(PlayerRow::as_select())
            .first::<PlayerRow>(&mut *self.conn)
            .optional()?;
        Ok(row.map(|r| Player::new(r.id, r.name, r.bot_type)))
    }

    fn insert_problem(&mut self, problem: NewProblem) -> Result<ProblemId, StoreError> {
        let row = NewProblemRow {
            summary: problem.summary().as_deref(),
            prompt: problem.prompt(),
            test_cases: serde_json::to_string(problem.test_cases())?,
            is_published: *problem.is_published(),
        };
        let id = diesel::insert_into(schema::problems::table)
            .values(&row)
            .returning(schema::problems::id)
            .get_result::<i64>(&mut *self.conn)?;
        Ok(id)
    }

    fn problem(&mut self, id: ProblemId) -> Result<Option<Problem>, StoreError> {
        schema::problems::table
            .find(id)
            .select(ProblemRow::as_select())
            .first::<ProblemRow>(&mut *self.conn)
            .optional()?
            .map(Problem::try_from)
            .transpose()
    }

    fn insert_game(&mut self, game: &Game) -> Result<GameId, StoreError> {
        let row = NewGameRow {
            status: game.status().to_string(),
            phase: serde_json::to_string(game)?,
        };
        let id = diesel::insert_into(schema::games::table)
            .values(&row)
            .returning(schema::games::id)
            .get_result::<i64>(&mut *self.conn)?;
        Ok(id)
    }

    fn game(&mut self, id: GameId) -> Result<Option<Game>, StoreError> {
        let phase = schema::games::table
            .find(id)
            .select(schema::games::phase)
            .first::<String>(&mut *self.conn)
            .optional()?;
        Ok(phase.map(|p| serde_json::from_str(&p)).transpose()?)
    }

    fn replace_game(&mut self, id: GameId, game: &Game) -> Result<(), StoreError> {
        let updated = diesel::update(schema::games::table.find(id))
            .set((
                schema::games::status.eq(game.status().to_string()),
                schema::games::phase.eq(serde_json::to_string(game)?),
            ))
            .execute(&mut *self.conn)?;
        if updated == 0 {
            return Err(StoreError::new(format!("No game {} to replace", id)));
        }
        Ok(())
    }

    fn recent_games(&mut self, limit: usize) -> Result<Vec<(GameId, Game)>, StoreError> {
        let rows = schema::games::table
            .order(schema::games::id.desc())
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .select((schema::games::id, schema::games::phase))
            .load::<(i64, String)>(&mut *self.conn)?;
        rows.into_iter()
            .map(|(id, phase)| -> Result<(GameId, Game), StoreError> {
                Ok((id, serde_json::from_str(&phase)?))
            })
            .collect()
    }

    fn recent_games_with_status(
        &mut self,
        status: GameStatus,
        limit: usize,
    ) -> Result<Vec<(GameId, Game)>, StoreError> {
        let rows = schema::games::table
            .filter(schema::games::status.eq(status.to_string()))
            .order(schema::games::id.desc())
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .select((schema::games::id, schema::games::phase))
            .load::<(i64, String)>(&mut *self.conn)?;
        rows.into_iter()
            .map(|(id, phase)| -> Result<(GameId, Game), StoreError> {
                Ok((id, serde_json::from_str(&phase)?))
            })
            .collect()
    }

    fn insert_game_state(
        &mut self,
        game_id: GameId,
        state: &GameState,
    ) -> Result<GameStateId, StoreError> {
        let row = NewGameStateRow {
            game_id,
            state: serde_json::to_string(state)?,
        };
        let id = diesel::insert_into(schema::game_states::table)
            .values(&row)
            .returning(schema::game_states::id)
            .get_result::<i64>(&mut *self.conn)?;
        Ok(id)
    }

    fn game_state(&mut self, id: GameStateId) -> Result<Option<GameState>, StoreError> {
        let state = schema::game_states::table
            .find(id)
            .select(schema::game_states::state)
            .first::<String>(&mut *self.conn)
            .optional()?;
        Ok(state.map(|s| serde_json::from_str(&s)).transpose()?)
    }

    fn replace_game_state(
        &mut self,
        id: GameStateId,
        state: &GameState,
    ) -> Result<(), StoreError> {
        let updated = diesel::update(schema::game_states::table.find(id))
            .set(schema::game_states::state.eq(serde_json::to_string(state)?))
            .execute(&mut *self.conn)?;
        if updated == 0 {
            return Err(StoreError::new(format!("No game state {} to replace", id)));
        }
        Ok(())
    }

    fn input_chunks(&mut self, game_id: GameId) -> Result<Vec<InputChunk>, StoreError> {
        schema::input_chunks::table
            .filter(schema::input_chunks::game_id.eq(game_id))
            .order(schema::input_chunks::chunk_rank.asc())
            .select(InputChunkRow::as_select())
            .load::<InputChunkRow>(&mut *self.conn)?
            .into_iter()
            .map(InputChunk::try_from)
            .collect()
    }

    fn last_input_chunk(&mut self, game_id: GameId) -> Result<Option<InputChunk>, StoreError> {
        schema::input_chunks::table
            .filter(schema::input_chunks::game_id.eq(game_id))
            .order(schema::input_chunks::chunk_rank.desc())
            .select(InputChunkRow::as_select())
            .first::<InputChunkRow>(&mut *self.conn)
            .optional()?
            .map(InputChunk::try_from)
            .transpose()
    }

    fn insert_input_chunk(&mut self, chunk: &InputChunk) -> Result<(), StoreError> {
        let row = NewInputChunkRow {
            game_id: *chunk.game_id(),
            chunk_rank: *chunk.rank(),
            inputs: serde_json::to_string(chunk.inputs())?,
        };
        diesel::insert_into(schema::input_chunks::table)
            .values(&row)
            .execute(&mut *self.conn)?;
        Ok(())
    }

    fn replace_input_chunk(&mut self, chunk: &InputChunk) -> Result<(), StoreError> {
        let updated = diesel::update(
            schema::input_chunks::table
                .filter(schema::input_chunks::game_id.eq(*chunk.game_id()))
                .filter(schema::input_chunks::chunk_rank.eq(*chunk.rank())),
        )
        .set(schema::input_chunks::inputs.eq(serde_json::to_string(chunk.inputs())?))
        .execute(&mut *self.conn)?;
        if updated == 0 {
            return Err(StoreError::new(format!(
                "No chunk {} of game {} to replace",
                chunk.rank(),
                chunk.game_id()
            )));
        }
        Ok(())
    }

    fn insert_test_results(
        &mut self,
        game_id: GameId,
        results: &[TestOutcome],
    ) -> Result<TestResultsId, StoreError> {
        let row = NewTestResultsRow {
            game_id,
            results: serde_json::to_string(results)?,
        };
        let id = diesel::insert_into(schema::test_results::table)
            .values(&row)
            .returning(schema::test_results::id)
            .get_result::<i64>(&mut *self.conn)?;
        Ok(id)
    }

    fn test_results(&mut self, id: TestResultsId) -> Result<Option<TestResults>, StoreError> {
        let row = schema::test_results::table
            .find(id)
            .select(TestResultsRow::as_select())
            .first::<TestResultsRow>(&mut *self.conn)
            .optional()?;
        match row {
            Some(r) => Ok(Some(TestResults::new(
                r.id,
                r.game_id,
                serde_json::from_str(&r.results)?,
            ))),
            None => Ok(None),
        }
    }

    fn bot_answers(&mut self, bot_type: &str, prompt: &str) -> Result<Vec<BotAnswer>, StoreError> {
        let rows = schema::ai_answers::table
            .filter(schema::ai_answers::bot_type.eq(bot_type))
            .filter(schema::ai_answers::prompt.eq(prompt))
            .order(schema::ai_answers::id.asc())
            .select(BotAnswerRow::as_select())
            .load::<BotAnswerRow>(&mut *self.conn)?;
        Ok(rows
            .into_iter()
            .map(|r| BotAnswer::new(r.id, r.bot_type, r.prompt, r.solution_snippet, r.answer))
            .collect())
    }

    fn delete_bot_answer(&mut self, id: AnswerId) -> Result<(), StoreError> {
        diesel::delete(schema::ai_answers::table.find(id)).execute(&mut *self.conn)?;
        Ok(())
    }

    fn insert_bot_answer(&mut self, answer: NewBotAnswer) -> Result<AnswerId, StoreError> {
        let row = NewBotAnswerRow {
            bot_type: answer.bot_type(),
            prompt: answer.prompt(),
            solution_snippet: answer.solution_snippet(),
            answer: answer.answer().as_deref(),
        };
        let id = diesel::insert_into(schema::ai_answers::table)
            .values(&row)
            .returning(schema::ai_answers::id)
            .get_result::<i64>(&mut *self.conn)?;
        Ok(id)
    }
}
