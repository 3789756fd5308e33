//! First-class input operations.
//!
//! Operations are domain events, not side effects. Each one is attributed
//! to the side that played it and can be replayed from the input log.

use serde::{Deserialize, Serialize};
use tracing::instrument;

/// One of the two seats at a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum Side {
    /// The player who created the game. Moves first.
    Player1,
    /// The player who joined the game.
    Player2,
}

impl Side {
    /// Returns the opposing side.
    pub fn opponent(self) -> Self {
        match self {
            Side::Player1 => Side::Player2,
            Side::Player2 => Side::Player1,
        }
    }

    /// Returns true for [`Side::Player1`].
    pub fn is_player1(self) -> bool {
        matches!(self, Side::Player1)
    }

    /// Builds a side from the stored `isPlayer1` flag.
    pub fn from_is_player1(is_player1: bool) -> Self {
        if is_player1 {
            Side::Player1
        } else {
            Side::Player2
        }
    }
}

fn default_delete_count() -> u32 {
    1
}

/// An atomic mutation of the shared buffer or the skip counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Operation {
    /// Append one character to the end of the buffer.
    Add {
        /// The character to append. May be a newline or tab.
        input: char,
    },
    /// Remove trailing characters from the buffer.
    Delete {
        /// Number of characters to remove.
        #[serde(rename = "numDeleted", default = "default_delete_count")]
        num_deleted: u32,
    },
    /// Force the opponent to forfeit upcoming turns.
    Skip {
        /// Number of turns the opponent forfeits.
        #[serde(rename = "numSkips")]
        num_skips: u32,
    },
    /// A forced skip being consumed by the side that owed it.
    Skipped,
    /// End the inputting phase.
    Finish,
}

impl Operation {
    /// Renders the operation as the text command that parses back into it.
    ///
    /// Returns `None` for [`Operation::Skipped`], which is never typed.
    #[instrument]
    pub fn to_command(&self) -> Option<String> {
        match self {
            Operation::Add { input: '\n' } => Some("\\n".to_string()),
            Operation::Add { input: '\t' } => Some("\\t".to_string()),
            Operation::Add { input } => Some(input.to_string()),
            Operation::Delete { num_deleted } => Some(format!("clear {}", num_deleted)),
            Operation::Skip { num_skips } => Some(format!("skip {}", num_skips)),
            Operation::Finish => Some("done".to_string()),
            Operation::Skipped => None,
        }
    }

    /// Returns true for [`Operation::Delete`].
    pub fn is_delete(&self) -> bool {
        matches!(self, Operation::Delete { .. })
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Add { input } => write!(f, "add {:?}", input),
            Operation::Delete { num_deleted } => write!(f, "delete {}", num_deleted),
            Operation::Skip { num_skips } => write!(f, "skip {}", num_skips),
            Operation::Skipped => write!(f, "skipped"),
            Operation::Finish => write!(f, "finish"),
        }
    }
}

/// A logged input: an operation plus the side that played it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Input {
    /// Whether player1 played this input.
    pub is_player1: bool,
    /// The operation played.
    pub operation: Operation,
}

impl Input {
    /// Creates an input attributed to `side`.
    #[instrument]
    pub fn new(side: Side, operation: Operation) -> Self {
        Self {
            is_player1: side.is_player1(),
            operation,
        }
    }

    /// Returns the side that played this input.
    pub fn side(&self) -> Side {
        Side::from_is_player1(self.is_player1)
    }
}
