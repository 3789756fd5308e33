//! Identifier aliases shared across the crate.

/// Identifier of a stored game.
pub type GameId = i64;

/// Identifier of a player (human or bot).
pub type PlayerId = i64;

/// Identifier of a coding problem.
pub type ProblemId = i64;

/// Identifier of a stored [`crate::GameState`] document.
pub type GameStateId = i64;

/// Identifier of a stored test-results record.
pub type TestResultsId = i64;

/// Identifier of a cached bot answer.
pub type AnswerId = i64;
