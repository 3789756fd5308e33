//! Protocol error types.

use crate::bee::{GameStatus, ParseError};
use crate::store::StoreError;
use crate::types::{GameId, PlayerId, ProblemId};

/// Error returned by game operations.
///
/// Every variant except [`BeeError::Store`] is a protocol violation that is
/// reported to the caller and never retried.
#[derive(Debug, Clone, derive_more::Display)]
pub enum BeeError {
    /// No game with this id.
    #[display("Unknown game {}", _0)]
    UnknownGame(GameId),

    /// No player with this id.
    #[display("Unknown player {}", _0)]
    UnknownPlayer(PlayerId),

    /// No problem with this id.
    #[display("Unknown problem {}", _0)]
    UnknownProblem(ProblemId),

    /// The game is not in the phase the operation requires.
    #[display("Game is {} but must be {}", actual, expected)]
    WrongPhase {
        /// Phase the operation requires.
        expected: GameStatus,
        /// Phase the game is in.
        actual: GameStatus,
    },

    /// The player acted out of turn.
    #[display("It's not player {}'s turn", _0)]
    NotYourTurn(PlayerId),

    /// The game already has two players.
    #[display("Game already has two players")]
    GameFull,

    /// The game cannot start until both players and a problem are set.
    #[display("Game needs two players and a problem before it can start")]
    GameNotReady,

    /// The player may not change this game.
    #[display("Player {} may not modify this game", _0)]
    AccessDenied(PlayerId),

    /// The player is not seated at this game.
    #[display("Player {} is not playing this game", _0)]
    NotPlaying(PlayerId),

    /// Spectating is reserved for players who are not seated.
    #[display("Player {} is playing this game", _0)]
    PlayerIsPlaying(PlayerId),

    /// Another player already plays as this bot type.
    #[display("Bot type {} is already taken", _0)]
    BotTypeTaken(String),

    /// A bot-only operation was invoked for a human.
    #[display("Player {} is not a bot", _0)]
    NotABot(PlayerId),

    /// The typed command could not be parsed.
    #[display("Parse error: {}", _0)]
    Parse(ParseError),

    /// A stored record references something that does not exist.
    #[display("Missing record: {}", _0)]
    MissingRecord(String),

    /// An internal consistency check failed.
    #[display("Invariant violation: {}", _0)]
    InvariantViolation(String),

    /// Storage failure.
    #[display("{}", _0)]
    Store(StoreError),
}

impl std::error::Error for BeeError {}

impl From<ParseError> for BeeError {
    fn from(err: ParseError) -> Self {
        BeeError::Parse(err)
    }
}

impl From<StoreError> for BeeError {
    fn from(err: StoreError) -> Self {
        BeeError::Store(err)
    }
}
