//! Game phase transitions outside the turn path.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::bee::{Game, GameState, GameStatus, InputtingGame, NotStartedGame, TestOutcome};
use crate::error::BeeError;
use crate::store::{GameTxn, NewPlayer, Player};
use crate::types::{GameId, PlayerId, ProblemId, TestResultsId};

/// Result of recording test results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "testResultsId")]
pub enum ResultRecorded {
    /// Results were stored and the game is now done.
    Recorded(TestResultsId),
    /// The game was already scored; nothing changed.
    AlreadyDone,
}

/// The game a call left behind, with the started phase when it began.
#[derive(Debug, Clone)]
pub struct Transitioned {
    /// The stored game after the call.
    pub game: Game,
    /// Set when the call moved the game into inputting.
    pub started: Option<InputtingGame>,
}

/// Creates a not-started game owned by `player1`.
#[instrument(skip(txn))]
pub fn create_game(txn: &mut dyn GameTxn, player1: PlayerId) -> Result<GameId, BeeError> {
    require_player(txn, player1)?;
    let id = txn.insert_game(&Game::from(NotStartedGame::new(player1)))?;
    info!(game_id = id, player1, "Game created");
    Ok(id)
}

/// Seats `player_id` as player2, starting the game if it becomes ready.
///
/// # Errors
///
/// - [`BeeError::WrongPhase`] once the game has started
/// - [`BeeError::GameFull`] if player2 is already seated
#[instrument(skip(txn))]
pub fn add_player_to_game(
    txn: &mut dyn GameTxn,
    game_id: GameId,
    player_id: PlayerId,
) -> Result<Transitioned, BeeError> {
    require_player(txn, player_id)?;
    let game = load_not_started(txn, game_id)?.join(player_id)?;
    debug!(game_id, player_id, "Player joined");
    settle(txn, game_id, game)
}

/// Selects the problem. Only seated players may choose it.
///
/// # Errors
///
/// - [`BeeError::AccessDenied`] for players not seated at the game
/// - [`BeeError::WrongPhase`] once the game has started
#[instrument(skip(txn))]
pub fn select_problem(
    txn: &mut dyn GameTxn,
    game_id: GameId,
    player_id: PlayerId,
    problem_id: ProblemId,
) -> Result<Transitioned, BeeError> {
    let game = load_not_started(txn, game_id)?;
    if game.player1() != player_id && game.player2() != Some(player_id) {
        warn!(game_id, player_id, "Problem selection denied");
        return Err(BeeError::AccessDenied(player_id));
    }
    if txn.problem(problem_id)?.is_none() {
        return Err(BeeError::UnknownProblem(problem_id));
    }
    settle(txn, game_id, game.select_problem(problem_id))
}

/// Returns the bot player for `bot_type`, creating it on first use.
#[instrument(skip(txn))]
pub fn get_or_create_bot_player(
    txn: &mut dyn GameTxn,
    bot_type: &str,
    name: &str,
) -> Result<Player, BeeError> {
    if let Some(player) = txn.player_by_bot_type(bot_type)? {
        return Ok(player);
    }
    let id = txn.insert_player(NewPlayer::new(name.to_string(), Some(bot_type.to_string())))?;
    info!(player_id = id, bot_type, "Bot player created");
    Ok(Player::new(id, name.to_string(), Some(bot_type.to_string())))
}

/// Stores test results and completes the game.
///
/// Idempotent on an already scored game.
///
/// # Errors
///
/// Returns [`BeeError::WrongPhase`] unless the game is input-done or done.
#[instrument(skip(txn, results), fields(cases = results.len()))]
pub fn record_result(
    txn: &mut dyn GameTxn,
    game_id: GameId,
    results: &[TestOutcome],
) -> Result<ResultRecorded, BeeError> {
    let game = txn.game(game_id)?.ok_or(BeeError::UnknownGame(game_id))?;
    match game {
        Game::Done(_) => {
            debug!(game_id, "Game already scored");
            Ok(ResultRecorded::AlreadyDone)
        }
        Game::InputDone(done) => {
            let id = txn.insert_test_results(game_id, results)?;
            txn.replace_game(game_id, &Game::from(done.score(id)))?;
            let passed = results.iter().filter(|r| r.is_passed()).count();
            info!(game_id, test_results_id = id, passed, "Game scored");
            Ok(ResultRecorded::Recorded(id))
        }
        other => Err(BeeError::WrongPhase {
            expected: GameStatus::InputDone,
            actual: other.status(),
        }),
    }
}

fn require_player(txn: &mut dyn GameTxn, player_id: PlayerId) -> Result<Player, BeeError> {
    txn.player(player_id)?
        .ok_or(BeeError::UnknownPlayer(player_id))
}

fn load_not_started(txn: &mut dyn GameTxn, game_id: GameId) -> Result<NotStartedGame, BeeError> {
    txn.game(game_id)?
        .ok_or(BeeError::UnknownGame(game_id))?
        .into_not_started()
}

/// Stores a not-started game, first starting it when it is ready.
fn settle(
    txn: &mut dyn GameTxn,
    game_id: GameId,
    game: NotStartedGame,
) -> Result<Transitioned, BeeError> {
    if !game.is_ready() {
        let game = Game::from(game);
        txn.replace_game(game_id, &game)?;
        return Ok(Transitioned {
            game,
            started: None,
        });
    }

    let now = Utc::now();
    let state_id = txn.insert_game_state(game_id, &GameState::new_at(now))?;
    let inputting = game.start(state_id, now)?;
    let stored = Game::from(inputting.clone());
    txn.replace_game(game_id, &stored)?;
    info!(game_id, game_state_id = state_id, "Game started");

    Ok(Transitioned {
        game: stored,
        started: Some(inputting),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{GameStore, MemoryStore, NewProblem};

    fn seed(store: &MemoryStore) -> (PlayerId, PlayerId, ProblemId) {
        store
            .transaction(|txn| {
                let a = txn.insert_player(NewPlayer::new("ann".to_string(), None))?;
                let b = txn.insert_player(NewPlayer::new("bob".to_string(), None))?;
                let p = txn.insert_problem(NewProblem::new(
                    None,
                    "Return a.".to_string(),
                    Vec::new(),
                    true,
                ))?;
                Ok::<_, BeeError>((a, b, p))
            })
            .expect("seed")
    }

    #[test]
    fn test_game_starts_once_ready() {
        let store = MemoryStore::new();
        let (a, b, p) = seed(&store);

        let started = store
            .transaction(|txn| {
                let game_id = create_game(txn, a)?;
                let after_join = add_player_to_game(txn, game_id, b)?;
                assert!(after_join.started.is_none());
                select_problem(txn, game_id, a, p)
            })
            .expect("lifecycle");

        assert_eq!(started.game.status(), GameStatus::Inputting);
        assert!(started.started.is_some());
    }

    #[test]
    fn test_outsider_cannot_select_problem() {
        let store = MemoryStore::new();
        let (a, b, p) = seed(&store);

        let result = store.transaction(|txn| {
            let game_id = create_game(txn, a)?;
            select_problem(txn, game_id, b, p)
        });
        assert!(matches!(result, Err(BeeError::AccessDenied(id)) if id == b));
    }

    #[test]
    fn test_record_result_requires_input_done() {
        let store = MemoryStore::new();
        let (a, _, _) = seed(&store);

        let result = store.transaction(|txn| {
            let game_id = create_game(txn, a)?;
            record_result(txn, game_id, &[])
        });
        assert!(matches!(
            result,
            Err(BeeError::WrongPhase {
                expected: GameStatus::InputDone,
                actual: GameStatus::NotStarted,
            })
        ));
    }

    #[test]
    fn test_bot_player_is_created_once() {
        let store = MemoryStore::new();
        let (first, second) = store
            .transaction(|txn| {
                let first = get_or_create_bot_player(txn, "chatgpt", "ChatGPT")?;
                let second = get_or_create_bot_player(txn, "chatgpt", "ChatGPT")?;
                Ok::<_, BeeError>((first, second))
            })
            .expect("bots");
        assert_eq!(first.id(), second.id());
        assert!(first.is_bot());
    }
}
