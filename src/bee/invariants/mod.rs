//! First-class invariants over a game's input log and state snapshot.
//!
//! Invariants are logical properties that must hold for every stored game.
//! They are testable independently and back the audit query.

use super::operation::Input;
use super::state::GameState;

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants that can be checked together.
///
/// Implementations are provided for tuples.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set, collecting every violation.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

impl<S, I1, I2, I3> InvariantSet<S> for (I1, I2, I3)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
    I3: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();

        if !I1::holds(state) {
            violations.push(InvariantViolation::new(I1::description()));
        }

        if !I2::holds(state) {
            violations.push(InvariantViolation::new(I2::description()));
        }

        if !I3::holds(state) {
            violations.push(InvariantViolation::new(I3::description()));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

impl<S, I1, I2> InvariantSet<S> for (I1, I2)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();

        if !I1::holds(state) {
            violations.push(InvariantViolation::new(I1::description()));
        }

        if !I2::holds(state) {
            violations.push(InvariantViolation::new(I2::description()));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// A game's full input log next to its stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    /// Every logged input, oldest first.
    pub inputs: Vec<Input>,
    /// The stored state snapshot.
    pub state: GameState,
}

impl Transcript {
    /// Pairs a log with a snapshot.
    pub fn new(inputs: Vec<Input>, state: GameState) -> Self {
        Self { inputs, state }
    }
}

mod alternating_turn;
mod finish_terminal;
mod history_consistent;

pub use alternating_turn::AlternatingTurnInvariant;
pub use finish_terminal::FinishTerminalInvariant;
pub use history_consistent::HistoryConsistentInvariant;

/// All transcript invariants as a composable set.
pub type BeeInvariants = (
    AlternatingTurnInvariant,
    HistoryConsistentInvariant,
    FinishTerminalInvariant,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bee::{Operation, Side};

    fn transcript(inputs: Vec<Input>) -> Transcript {
        let state = inputs
            .iter()
            .fold(GameState::new(), |state, input| state.apply(input));
        Transcript::new(inputs, state)
    }

    #[test]
    fn test_invariant_set_holds_for_empty_log() {
        assert!(BeeInvariants::check_all(&transcript(Vec::new())).is_ok());
    }

    #[test]
    fn test_invariant_set_holds_after_inputs() {
        let t = transcript(vec![
            Input::new(Side::Player1, Operation::Add { input: 'r' }),
            Input::new(Side::Player2, Operation::Skip { num_skips: 1 }),
            Input::new(Side::Player1, Operation::Skipped),
            Input::new(Side::Player2, Operation::Add { input: 'e' }),
        ]);
        assert!(BeeInvariants::check_all(&t).is_ok());
    }

    #[test]
    fn test_invariant_set_detects_tampered_snapshot() {
        let mut t = transcript(vec![Input::new(Side::Player1, Operation::Add { input: 'r' })]);
        t.state = t
            .state
            .apply(&Input::new(Side::Player2, Operation::Add { input: 'x' }));

        let violations = BeeInvariants::check_all(&t).expect_err("should detect");
        assert!(!violations.is_empty());
    }

    #[test]
    fn test_two_invariants_as_set() {
        type TwoInvariants = (AlternatingTurnInvariant, FinishTerminalInvariant);
        assert!(TwoInvariants::check_all(&transcript(Vec::new())).is_ok());
    }
}
