//! History consistency invariant: replaying the log reproduces the snapshot.

use super::{Invariant, Transcript};
use crate::bee::{GameState, Side};

/// Invariant: the snapshot is exactly what the log replays to.
///
/// Timestamps are ignored; everything else must match.
pub struct HistoryConsistentInvariant;

impl Invariant<Transcript> for HistoryConsistentInvariant {
    fn holds(transcript: &Transcript) -> bool {
        let replayed = transcript
            .inputs
            .iter()
            .fold(GameState::new(), |state, input| state.apply(input));
        let stored = &transcript.state;

        replayed.code() == stored.code()
            && replayed.is_done() == stored.is_done()
            && replayed.skips(Side::Player1) == stored.skips(Side::Player1)
            && replayed.skips(Side::Player2) == stored.skips(Side::Player2)
            && replayed.last_input(Side::Player1) == stored.last_input(Side::Player1)
            && replayed.last_input(Side::Player2) == stored.last_input(Side::Player2)
    }

    fn description() -> &'static str {
        "Replaying the input log reproduces the stored state"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bee::{Input, Operation};

    #[test]
    fn test_replayed_log_holds() {
        let inputs = vec![
            Input::new(Side::Player1, Operation::Add { input: 'a' }),
            Input::new(Side::Player2, Operation::Delete { num_deleted: 1 }),
        ];
        let state = inputs
            .iter()
            .fold(GameState::new(), |state, input| state.apply(input));
        assert!(HistoryConsistentInvariant::holds(&Transcript::new(inputs, state)));
    }

    #[test]
    fn test_missing_log_entry_violates() {
        let a = Input::new(Side::Player1, Operation::Add { input: 'a' });
        let b = Input::new(Side::Player2, Operation::Add { input: 'b' });
        let state = GameState::new().apply(&a).apply(&b);
        assert!(!HistoryConsistentInvariant::holds(&Transcript::new(vec![a], state)));
    }
}
