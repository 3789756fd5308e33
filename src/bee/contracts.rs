//! Contract-based validation for applying inputs.
//!
//! Contracts define correctness through preconditions and postconditions.
//! They formalize the Hoare-style reasoning: {P} action {Q}

use tracing::{instrument, warn};

use super::operation::{Input, Operation};
use super::state::GameState;
use crate::error::BeeError;
use crate::types::PlayerId;

// ─────────────────────────────────────────────────────────────
//  Contract Trait
// ─────────────────────────────────────────────────────────────

/// A contract defines preconditions and postconditions for state transitions.
pub trait Contract<S, A> {
    /// Checks preconditions before applying the action.
    fn pre(state: &S, action: &A) -> Result<(), BeeError>;

    /// Checks postconditions after applying the action.
    fn post(before: &S, after: &S) -> Result<(), BeeError>;
}

// ─────────────────────────────────────────────────────────────
//  Preconditions
// ─────────────────────────────────────────────────────────────

/// Precondition: the acting player is seated on the side due to move.
pub struct PlayersTurn;

impl PlayersTurn {
    /// Compares the acting player against the one the state expects.
    #[instrument]
    pub fn check(player_id: PlayerId, expected: PlayerId) -> Result<(), BeeError> {
        if player_id != expected {
            warn!(player_id, expected, "Input out of turn");
            Err(BeeError::NotYourTurn(player_id))
        } else {
            Ok(())
        }
    }
}

// ─────────────────────────────────────────────────────────────
//  Turn Contract (Pre + Post)
// ─────────────────────────────────────────────────────────────

/// Contract for applying one input to the game state.
///
/// Preconditions:
/// - The input's side is the side due to move
/// - Inputting has not finished
///
/// Postconditions:
/// - The turn passed to the other side
/// - The buffer only changed at its end
/// - A finished state keeps its buffer
pub struct TurnContract;

impl Contract<GameState, Input> for TurnContract {
    fn pre(state: &GameState, action: &Input) -> Result<(), BeeError> {
        if *state.is_done() {
            return Err(BeeError::InvariantViolation(
                "Input applied after finish".to_string(),
            ));
        }
        if action.side() != state.next_side() {
            return Err(BeeError::InvariantViolation(format!(
                "{} acted but {} was due",
                action.side(),
                state.next_side()
            )));
        }
        Ok(())
    }

    fn post(before: &GameState, after: &GameState) -> Result<(), BeeError> {
        if after.last_side() == before.last_side() && after.last_input(after.last_side()).is_some()
        {
            return Err(BeeError::InvariantViolation(
                "Postcondition failed: turn did not pass".to_string(),
            ));
        }
        if !before.code().starts_with(after.code().as_str())
            && !after.code().starts_with(before.code().as_str())
        {
            return Err(BeeError::InvariantViolation(
                "Postcondition failed: buffer changed away from its end".to_string(),
            ));
        }
        if *after.is_done() {
            let finished = matches!(
                after.last_input(after.last_side()),
                Some(Operation::Finish)
            );
            if !finished || before.code() != after.code() {
                return Err(BeeError::InvariantViolation(
                    "Postcondition failed: finish changed the buffer".to_string(),
                ));
            }
        }
        Ok(())
    }
}
