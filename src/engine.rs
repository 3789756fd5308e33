//! Turn engine: validates turn ownership, applies inputs and decides who
//! acts next.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::bee::{
    Contract, Game, GameState, GameStatus, Input, InputtingGame, Operation, PlayersTurn, Side,
    TurnContract, parse_input,
};
use crate::config::BeeConfig;
use crate::error::BeeError;
use crate::input_log;
use crate::store::GameTxn;
use crate::types::{GameId, PlayerId};

/// Who acts after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "playerId")]
pub enum NextActor {
    /// A human must type the next input.
    Human(PlayerId),
    /// A bot must be scheduled.
    Bot(PlayerId),
    /// Inputting finished; the game awaits scoring.
    InputDone,
}

/// Result of one accepted turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    /// The operation that was applied.
    pub operation: Operation,
    /// Forced skips consumed automatically after the turn.
    pub skips_consumed: u32,
    /// Who acts next.
    pub next: NextActor,
    /// The state after the turn.
    pub state: GameState,
}

/// Loads a game and requires it to be inputting.
pub(crate) fn load_inputting(
    txn: &mut dyn GameTxn,
    game_id: GameId,
) -> Result<InputtingGame, BeeError> {
    txn.game(game_id)?
        .ok_or(BeeError::UnknownGame(game_id))?
        .into_inputting()
}

/// Loads the state document of an inputting game.
pub(crate) fn load_state(
    txn: &mut dyn GameTxn,
    game: &InputtingGame,
) -> Result<GameState, BeeError> {
    txn.game_state(game.game_state())?.ok_or_else(|| {
        BeeError::MissingRecord(format!("game state {}", game.game_state()))
    })
}

/// Handles one typed turn.
///
/// Runs inside the caller's transaction. Any follow-up work implied by
/// [`TurnOutcome::next`] must be scheduled only after that transaction
/// commits.
///
/// # Errors
///
/// - [`BeeError::UnknownGame`] / [`BeeError::WrongPhase`] unless the game is inputting
/// - [`BeeError::NotYourTurn`] unless `player_id` sits on the side due to move
/// - [`BeeError::Parse`] for malformed commands
#[instrument(skip(txn, config, raw), fields(raw_len = raw.len()))]
pub fn handle_turn(
    txn: &mut dyn GameTxn,
    config: &BeeConfig,
    game_id: GameId,
    player_id: PlayerId,
    raw: &str,
) -> Result<TurnOutcome, BeeError> {
    let game = load_inputting(txn, game_id)?;
    let state = load_state(txn, &game)?;

    let side = state.next_side();
    PlayersTurn::check(player_id, game.player(side))?;

    let operation = parse_input(raw, state.code())?;
    let input = Input::new(side, operation);
    let mut state = apply_logged(txn, config, game_id, &state, input)?;

    if operation == Operation::Finish {
        txn.replace_game_state(game.game_state(), &state)?;
        txn.replace_game(game_id, &Game::from(game.finish()))?;
        info!(game_id, player_id, "Inputting finished");
        return Ok(TurnOutcome {
            operation,
            skips_consumed: 0,
            next: NextActor::InputDone,
            state,
        });
    }

    let mut skips_consumed = 0;
    while state.skips(state.next_side()) > 0 {
        let owing = state.next_side();
        debug!(side = %owing, remaining = state.skips(owing), "Consuming forced skip");
        state = apply_logged(txn, config, game_id, &state, Input::new(owing, Operation::Skipped))?;
        skips_consumed += 1;
    }
    txn.replace_game_state(game.game_state(), &state)?;

    let next_player = game.player(state.next_side());
    let next = match txn.player(next_player)? {
        Some(p) if p.is_bot() => NextActor::Bot(next_player),
        Some(_) => NextActor::Human(next_player),
        None => return Err(BeeError::UnknownPlayer(next_player)),
    };

    debug!(game_id, player_id, %operation, skips_consumed, ?next, "Turn applied");
    Ok(TurnOutcome {
        operation,
        skips_consumed,
        next,
        state,
    })
}

/// Logs one input and applies it under the turn contract.
fn apply_logged(
    txn: &mut dyn GameTxn,
    config: &BeeConfig,
    game_id: GameId,
    state: &GameState,
    input: Input,
) -> Result<GameState, BeeError> {
    TurnContract::pre(state, &input)?;
    input_log::append_input(txn, game_id, input, *config.input_chunk_size())?;
    let next = state.apply(&input);

    #[cfg(debug_assertions)]
    TurnContract::post(state, &next)?;

    Ok(next)
}

/// Requires a game to be in `expected`, returning it unchanged.
pub(crate) fn require_status(game: Game, expected: GameStatus) -> Result<Game, BeeError> {
    if game.status() == expected {
        Ok(game)
    } else {
        Err(BeeError::WrongPhase {
            expected,
            actual: game.status(),
        })
    }
}

/// The side a player sits on, for bots and watchers.
pub(crate) fn seated_side(game: &InputtingGame, player_id: PlayerId) -> Result<Side, BeeError> {
    game.side_of(player_id)
        .ok_or(BeeError::NotPlaying(player_id))
}
