//! Bee game model: operations, the state reducer, typed commands and
//! the phase state machine. Pure, no I/O.

mod command;
mod contracts;
mod invariants;
mod operation;
mod phases;
mod scoring;
mod state;

pub use command::{ParseError, parse_input};
pub use contracts::{Contract, PlayersTurn, TurnContract};
pub use invariants::{
    AlternatingTurnInvariant, BeeInvariants, FinishTerminalInvariant, HistoryConsistentInvariant,
    Invariant, InvariantSet, InvariantViolation, Transcript,
};
pub use operation::{Input, Operation, Side};
pub use phases::{DoneGame, Game, GameStatus, InputDoneGame, InputtingGame, NotStartedGame};
pub use scoring::{TestCase, TestOutcome};
pub use state::GameState;
