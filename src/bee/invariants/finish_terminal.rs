//! Finish terminal invariant: nothing follows a finish.

use super::{Invariant, Transcript};
use crate::bee::Operation;

/// Invariant: a finish, if present, is the single last input, and the
/// snapshot is done exactly when it is present.
pub struct FinishTerminalInvariant;

impl Invariant<Transcript> for FinishTerminalInvariant {
    fn holds(transcript: &Transcript) -> bool {
        let finishes = transcript
            .inputs
            .iter()
            .filter(|input| input.operation == Operation::Finish)
            .count();
        let ends_with_finish = transcript
            .inputs
            .last()
            .is_some_and(|input| input.operation == Operation::Finish);

        match finishes {
            0 => !*transcript.state.is_done(),
            1 => ends_with_finish && *transcript.state.is_done(),
            _ => false,
        }
    }

    fn description() -> &'static str {
        "Finish is terminal and marks the state done"
    }
}
