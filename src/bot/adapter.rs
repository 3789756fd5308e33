//! Decides a bot's next input from cached answers.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::answers::{find_answer, next_bot_input};
use crate::bee::{PlayersTurn, Side};
use crate::config::BeeConfig;
use crate::engine::{TurnOutcome, handle_turn, load_inputting, load_state, seated_side};
use crate::error::BeeError;
use crate::input_log;
use crate::store::{GameTxn, Player};
use crate::types::{GameId, PlayerId};

/// A provider request a bot needs before it can move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskBotArgs {
    /// Game the bot is playing.
    pub game_id: GameId,
    /// The bot player.
    pub player_id: PlayerId,
    /// Bot type to ask.
    pub bot_type: String,
    /// Problem prompt.
    pub prompt: String,
    /// Code at the time of the request.
    pub code_snippet: String,
}

/// What a bot turn did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotTurn {
    /// The bot played an input.
    Played(TurnOutcome),
    /// No usable answer is cached; the provider must be asked first.
    AwaitingAnswer(AskBotArgs),
}

/// Plays one bot turn inside the caller's transaction.
///
/// With `must_answer` set the bot never defers: lacking an answer it types
/// a space.
///
/// # Errors
///
/// - [`BeeError::NotPlaying`] if the bot is not seated at the game
/// - [`BeeError::NotABot`] if the seated player has no bot type
/// - [`BeeError::NotYourTurn`] if the opponent is due to move
#[instrument(skip(txn, config))]
pub fn take_bot_turn(
    txn: &mut dyn GameTxn,
    config: &BeeConfig,
    game_id: GameId,
    player_id: PlayerId,
    must_answer: bool,
) -> Result<BotTurn, BeeError> {
    let game = load_inputting(txn, game_id)?;
    seated_side(&game, player_id)?;

    let player1 = require_seat(txn, game.player(Side::Player1))?;
    let player2 = require_seat(txn, game.player(Side::Player2))?;
    let bot = if *player1.id() == player_id {
        &player1
    } else {
        &player2
    };
    let bot_type = bot
        .bot_type()
        .clone()
        .ok_or(BeeError::NotABot(player_id))?;

    let state = load_state(txn, &game)?;
    PlayersTurn::check(player_id, game.player(state.next_side()))?;

    let both_bots = player1.is_bot() && player2.is_bot();
    let code = state.code().clone();

    let play = |txn: &mut dyn GameTxn, raw: &str| {
        debug!(game_id, player_id, raw, "Bot plays");
        handle_turn(txn, config, game_id, player_id, raw).map(BotTurn::Played)
    };

    if both_bots && state.code_len() >= *config.max_bot_v_bot() {
        info!(game_id, code_len = state.code_len(), "Bot-vs-bot limit reached");
        return play(txn, "done");
    }

    let problem_id = game.problem_id();
    let prompt = txn
        .problem(problem_id)?
        .ok_or_else(|| BeeError::MissingRecord(format!("problem {}", problem_id)))?
        .prompt()
        .clone();

    let ask = AskBotArgs {
        game_id,
        player_id,
        bot_type: bot_type.clone(),
        prompt: prompt.clone(),
        code_snippet: code.clone(),
    };

    if !must_answer {
        let last = input_log::last_input(txn, game_id)?;
        if last.is_some_and(|input| input.operation.is_delete()) {
            debug!(game_id, "Code was deleted; asking for a fresh answer");
            return Ok(BotTurn::AwaitingAnswer(ask));
        }
    }

    let answers = txn.bot_answers(&bot_type, &prompt)?;
    match find_answer(&answers, &code, both_bots).and_then(|a| a.answer().clone()) {
        None if must_answer => play(txn, " "),
        None => {
            debug!(game_id, cached = answers.len(), "No cached answer fits");
            Ok(BotTurn::AwaitingAnswer(ask))
        }
        Some(answer) if answer.is_empty() => play(txn, " "),
        Some(answer) => play(txn, &next_bot_input(&answer, &code, both_bots)),
    }
}

fn require_seat(txn: &mut dyn GameTxn, player_id: PlayerId) -> Result<Player, BeeError> {
    txn.player(player_id)?
        .ok_or(BeeError::UnknownPlayer(player_id))
}
