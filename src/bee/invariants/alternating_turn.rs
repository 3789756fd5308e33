//! Alternating turn invariant: player1, player2, player1, ...

use super::{Invariant, Transcript};
use crate::bee::Side;

/// Invariant: sides alternate, starting with player1.
///
/// Forced skips are logged as inputs of the side that owed them, so they
/// take part in the alternation like any other input.
pub struct AlternatingTurnInvariant;

impl Invariant<Transcript> for AlternatingTurnInvariant {
    fn holds(transcript: &Transcript) -> bool {
        let inputs = &transcript.inputs;

        let Some(first) = inputs.first() else {
            return transcript.state.next_side() == Side::Player1;
        };

        if first.side() != Side::Player1 {
            return false;
        }

        if inputs.windows(2).any(|w| w[0].side() == w[1].side()) {
            return false;
        }

        inputs
            .last()
            .is_some_and(|last| last.side() == transcript.state.last_side())
    }

    fn description() -> &'static str {
        "Sides alternate (player1, player2, player1, ...)"
    }
}
