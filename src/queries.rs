//! Read-only views over games.

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::bee::{
    BeeInvariants, Game, GameState, GameStatus, Input, InvariantSet, InvariantViolation,
    Operation, Side, Transcript,
};
use crate::engine::require_status;
use crate::error::BeeError;
use crate::input_log;
use crate::store::{GameTxn, InputChunk, Player, Problem, TestResults};
use crate::types::{GameId, PlayerId};

/// A game with its players and prompt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    /// Game id.
    pub id: GameId,
    /// The phase record.
    pub game: Game,
    /// Player1.
    pub player1: Player,
    /// Player2, once seated.
    pub player2: Option<Player>,
    /// Prompt of the selected problem.
    pub problem_prompt: Option<String>,
}

/// What a seated player sees while playing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    /// Whether the watching player is due to move.
    pub is_current_players_turn: bool,
    /// The partner's most recent operation.
    pub last_partner_input: Option<Operation>,
}

/// Everything needed to score a finished game.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringInfo {
    /// The frozen program text.
    pub code: String,
    /// The problem being solved.
    pub problem: Problem,
}

/// Everything needed to replay a scored game.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackInfo {
    /// The input log, by chunk.
    pub inputs: Vec<InputChunk>,
    /// The recorded test results.
    pub test_results: TestResults,
    /// The problem that was solved.
    pub problem: Problem,
}

/// Result of checking a game's log against its snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    /// Game id.
    pub game_id: GameId,
    /// Number of logged inputs.
    pub inputs: usize,
    /// Violated invariants; empty when the game is consistent.
    pub violations: Vec<InvariantViolation>,
}

fn load_game(txn: &mut dyn GameTxn, game_id: GameId) -> Result<Game, BeeError> {
    txn.game(game_id)?.ok_or(BeeError::UnknownGame(game_id))
}

fn load_player(txn: &mut dyn GameTxn, player_id: PlayerId) -> Result<Player, BeeError> {
    txn.player(player_id)?
        .ok_or_else(|| BeeError::MissingRecord(format!("player {}", player_id)))
}

fn load_problem(txn: &mut dyn GameTxn, game: &Game) -> Result<Problem, BeeError> {
    let problem_id = game
        .problem_id()
        .ok_or_else(|| BeeError::MissingRecord("problem of a started game".to_string()))?;
    txn.problem(problem_id)?
        .ok_or_else(|| BeeError::MissingRecord(format!("problem {}", problem_id)))
}

fn load_state_of(txn: &mut dyn GameTxn, game: &Game) -> Result<Option<GameState>, BeeError> {
    match game.game_state() {
        None => Ok(None),
        Some(id) => txn
            .game_state(id)?
            .map(Some)
            .ok_or_else(|| BeeError::MissingRecord(format!("game state {}", id))),
    }
}

/// A game with its players and prompt.
#[instrument(skip(txn))]
pub fn game_info(txn: &mut dyn GameTxn, game_id: GameId) -> Result<GameInfo, BeeError> {
    let game = load_game(txn, game_id)?;
    let player1 = load_player(txn, game.player1())?;
    let player2 = match game.player2() {
        Some(id) => Some(load_player(txn, id)?),
        None => None,
    };
    let problem_prompt = match game.problem_id() {
        Some(id) => txn.problem(id)?.map(|p| p.prompt().clone()),
        None => None,
    };
    Ok(GameInfo {
        id: game_id,
        game,
        player1,
        player2,
        problem_prompt,
    })
}

/// The view of a seated player. `None` before the game starts.
///
/// # Errors
///
/// Returns [`BeeError::NotPlaying`] for players not seated at the game.
#[instrument(skip(txn))]
pub fn watch_game_while_playing(
    txn: &mut dyn GameTxn,
    game_id: GameId,
    player_id: PlayerId,
) -> Result<Option<PlayerView>, BeeError> {
    let game = load_game(txn, game_id)?;
    if game.status() == GameStatus::NotStarted {
        return Ok(None);
    }
    if !game.has_player(player_id) {
        warn!(game_id, player_id, "Watch by non-player");
        return Err(BeeError::NotPlaying(player_id));
    }
    let Some(state) = load_state_of(txn, &game)? else {
        return Ok(None);
    };

    let side = if game.player1() == player_id {
        Side::Player1
    } else {
        Side::Player2
    };
    Ok(Some(PlayerView {
        is_current_players_turn: state.next_side() == side,
        last_partner_input: state.last_input(side.opponent()),
    }))
}

/// The live state for a spectator. `None` before the game starts.
///
/// # Errors
///
/// Returns [`BeeError::PlayerIsPlaying`] for seated players.
#[instrument(skip(txn))]
pub fn spectate(
    txn: &mut dyn GameTxn,
    game_id: GameId,
    player_id: PlayerId,
) -> Result<Option<GameState>, BeeError> {
    let game = load_game(txn, game_id)?;
    if game.has_player(player_id) {
        return Err(BeeError::PlayerIsPlaying(player_id));
    }
    load_state_of(txn, &game)
}

/// Code and problem of a game awaiting its score.
#[instrument(skip(txn))]
pub fn info_for_scoring(txn: &mut dyn GameTxn, game_id: GameId) -> Result<ScoringInfo, BeeError> {
    let game = require_status(load_game(txn, game_id)?, GameStatus::InputDone)?;
    let state = load_state_of(txn, &game)?
        .ok_or_else(|| BeeError::MissingRecord("game state of a finished game".to_string()))?;
    let problem = load_problem(txn, &game)?;
    Ok(ScoringInfo {
        code: state.code().clone(),
        problem,
    })
}

/// Log, results and problem of a scored game.
#[instrument(skip(txn))]
pub fn info_for_playback(
    txn: &mut dyn GameTxn,
    game_id: GameId,
) -> Result<PlaybackInfo, BeeError> {
    let game = require_status(load_game(txn, game_id)?, GameStatus::Done)?;
    let results_id = game
        .test_results()
        .ok_or_else(|| BeeError::MissingRecord("test results of a done game".to_string()))?;
    let test_results = txn
        .test_results(results_id)?
        .ok_or_else(|| BeeError::MissingRecord(format!("test results {}", results_id)))?;
    let inputs = txn.input_chunks(game_id)?;
    let problem = load_problem(txn, &game)?;
    debug!(game_id, chunks = inputs.len(), "Playback loaded");
    Ok(PlaybackInfo {
        inputs,
        test_results,
        problem,
    })
}

/// Most recent games, newest first.
#[instrument(skip(txn))]
pub fn recent_games(
    txn: &mut dyn GameTxn,
    limit: usize,
) -> Result<Vec<(GameId, Game)>, BeeError> {
    Ok(txn.recent_games(limit)?)
}

/// Up to `limit` games still accepting inputs, newest first.
#[instrument(skip(txn))]
pub fn ongoing_games(
    txn: &mut dyn GameTxn,
    limit: usize,
) -> Result<Vec<(GameId, Game)>, BeeError> {
    Ok(txn.recent_games_with_status(GameStatus::Inputting, limit)?)
}

/// Checks a started game's log against its stored snapshot.
#[instrument(skip(txn))]
pub fn audit_game(txn: &mut dyn GameTxn, game_id: GameId) -> Result<AuditReport, BeeError> {
    let game = load_game(txn, game_id)?;
    let inputs: Vec<Input> = input_log::all_inputs(txn, game_id)?;
    let count = inputs.len();

    let violations = match load_state_of(txn, &game)? {
        None if inputs.is_empty() => Vec::new(),
        None => vec![InvariantViolation::new("Inputs logged before the game started")],
        Some(state) => match BeeInvariants::check_all(&Transcript::new(inputs, state)) {
            Ok(()) => Vec::new(),
            Err(violations) => violations,
        },
    };

    if !violations.is_empty() {
        warn!(game_id, count = violations.len(), "Audit found violations");
    }
    Ok(AuditReport {
        game_id,
        inputs: count,
        violations,
    })
}

