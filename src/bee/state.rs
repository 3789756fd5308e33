//! The shared game state and its pure reducer.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use super::operation::{Input, Operation, Side};

/// Snapshot of a game in progress.
///
/// Exactly one document exists per started game. It is replaced wholesale
/// every time an operation is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// The shared program text.
    code: String,
    /// Whether player1 played the most recent input.
    is_last_player_player1: bool,
    /// Most recent operation played by player1.
    last_player1_input: Option<Operation>,
    /// Most recent operation played by player2.
    last_player2_input: Option<Operation>,
    /// Forced skips player1 still owes.
    player1_skips: u32,
    /// Forced skips player2 still owes.
    player2_skips: u32,
    /// Set once a side plays [`Operation::Finish`].
    is_done: bool,
    /// Time of the most recent applied input.
    last_updated: DateTime<Utc>,
}

impl GameState {
    /// Creates the initial state. Player1 moves first.
    #[instrument]
    pub fn new() -> Self {
        Self::new_at(Utc::now())
    }

    /// Creates the initial state stamped with `now`.
    pub fn new_at(now: DateTime<Utc>) -> Self {
        Self {
            code: String::new(),
            is_last_player_player1: false,
            last_player1_input: None,
            last_player2_input: None,
            player1_skips: 0,
            player2_skips: 0,
            is_done: false,
            last_updated: now,
        }
    }

    /// The side expected to play next.
    pub fn next_side(&self) -> Side {
        if self.is_last_player_player1 {
            Side::Player2
        } else {
            Side::Player1
        }
    }

    /// The side that played most recently.
    pub fn last_side(&self) -> Side {
        Side::from_is_player1(self.is_last_player_player1)
    }

    /// Forced skips owed by `side`.
    pub fn skips(&self, side: Side) -> u32 {
        match side {
            Side::Player1 => self.player1_skips,
            Side::Player2 => self.player2_skips,
        }
    }

    /// Most recent operation played by `side`.
    pub fn last_input(&self, side: Side) -> Option<Operation> {
        match side {
            Side::Player1 => self.last_player1_input,
            Side::Player2 => self.last_player2_input,
        }
    }

    /// Number of characters in the buffer.
    pub fn code_len(&self) -> usize {
        self.code.chars().count()
    }

    /// Applies an input, returning the successor state.
    pub fn apply(&self, input: &Input) -> GameState {
        self.apply_at(input, Utc::now())
    }

    /// Applies an input with an explicit timestamp.
    ///
    /// Total: every operation yields a valid successor.
    #[instrument(skip(self), fields(side = %input.side(), operation = %input.operation))]
    pub fn apply_at(&self, input: &Input, now: DateTime<Utc>) -> GameState {
        let side = input.side();
        let mut next = self.clone();

        match input.operation {
            Operation::Add { input: c } => next.code.push(c),
            Operation::Delete { num_deleted } => {
                let keep = self.code_len().saturating_sub(num_deleted as usize);
                next.code = self.code.chars().take(keep).collect();
            }
            Operation::Skip { num_skips } => {
                let counter = next.skips_mut(side.opponent());
                *counter = counter.saturating_add(num_skips);
            }
            Operation::Skipped => {
                let counter = next.skips_mut(side);
                *counter = counter.saturating_sub(1);
            }
            Operation::Finish => next.is_done = true,
        }

        next.is_last_player_player1 = side.is_player1();
        match side {
            Side::Player1 => next.last_player1_input = Some(input.operation),
            Side::Player2 => next.last_player2_input = Some(input.operation),
        }
        next.last_updated = now;

        trace!(code_len = next.code_len(), "Input applied");
        next
    }

    fn skips_mut(&mut self, side: Side) -> &mut u32 {
        match side {
            Side::Player1 => &mut self.player1_skips,
            Side::Player2 => &mut self.player2_skips,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
