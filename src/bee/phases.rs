//! Phase-specific typestate structs for a bee game.
//!
//! Each phase is its own type with phase-specific fields. Transitions are
//! consuming methods that exist only on the predecessor phase, so a game
//! can never move backwards. [`Game`] wraps all phases for storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::operation::Side;
use crate::error::BeeError;
use crate::types::{GameStateId, PlayerId, ProblemId, TestResultsId};

/// Lifecycle stage of a game.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum GameStatus {
    /// Waiting for a second player or a problem.
    NotStarted,
    /// Players are taking turns.
    Inputting,
    /// Input finished, waiting for test results.
    InputDone,
    /// Scored.
    Done,
}

// ─────────────────────────────────────────────────────────────
//  NotStarted Phase
// ─────────────────────────────────────────────────────────────

/// Game waiting for its second player or its problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotStartedGame {
    player1: PlayerId,
    player2: Option<PlayerId>,
    problem_id: Option<ProblemId>,
}

impl NotStartedGame {
    /// Creates a game owned by `player1`.
    #[instrument]
    pub fn new(player1: PlayerId) -> Self {
        Self {
            player1,
            player2: None,
            problem_id: None,
        }
    }

    /// The creating player.
    pub fn player1(&self) -> PlayerId {
        self.player1
    }

    /// The joining player, if any.
    pub fn player2(&self) -> Option<PlayerId> {
        self.player2
    }

    /// The selected problem, if any.
    pub fn problem_id(&self) -> Option<ProblemId> {
        self.problem_id
    }

    /// Seats the second player.
    ///
    /// # Errors
    ///
    /// Returns [`BeeError::GameFull`] if player2 is already seated.
    #[instrument(skip(self))]
    pub fn join(mut self, player2: PlayerId) -> Result<Self, BeeError> {
        if self.player2.is_some() {
            return Err(BeeError::GameFull);
        }
        self.player2 = Some(player2);
        Ok(self)
    }

    /// Selects the problem to solve, replacing any earlier choice.
    #[instrument(skip(self))]
    pub fn select_problem(mut self, problem_id: ProblemId) -> Self {
        self.problem_id = Some(problem_id);
        self
    }

    /// Both players are seated and a problem is selected.
    pub fn is_ready(&self) -> bool {
        self.player2.is_some() && self.problem_id.is_some()
    }

    /// Starts the game (consumes setup, returns inputting).
    ///
    /// # Errors
    ///
    /// Returns [`BeeError::GameNotReady`] unless [`Self::is_ready`].
    #[instrument(skip(self))]
    pub fn start(
        self,
        game_state: GameStateId,
        start_time: DateTime<Utc>,
    ) -> Result<InputtingGame, BeeError> {
        match (self.player2, self.problem_id) {
            (Some(player2), Some(problem_id)) => {
                debug!(player1 = self.player1, player2, problem_id, "Starting game");
                Ok(InputtingGame {
                    player1: self.player1,
                    player2,
                    game_state,
                    problem_id,
                    start_time,
                })
            }
            _ => Err(BeeError::GameNotReady),
        }
    }
}

// ─────────────────────────────────────────────────────────────
//  Inputting Phase
// ─────────────────────────────────────────────────────────────

/// Game accepting inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputtingGame {
    player1: PlayerId,
    player2: PlayerId,
    game_state: GameStateId,
    problem_id: ProblemId,
    start_time: DateTime<Utc>,
}

impl InputtingGame {
    /// The player seated on `side`.
    pub fn player(&self, side: Side) -> PlayerId {
        match side {
            Side::Player1 => self.player1,
            Side::Player2 => self.player2,
        }
    }

    /// The side `player_id` is seated on. Player1 wins when both seats match.
    pub fn side_of(&self, player_id: PlayerId) -> Option<Side> {
        if player_id == self.player1 {
            Some(Side::Player1)
        } else if player_id == self.player2 {
            Some(Side::Player2)
        } else {
            None
        }
    }

    /// Id of the game state document.
    pub fn game_state(&self) -> GameStateId {
        self.game_state
    }

    /// The problem being solved.
    pub fn problem_id(&self) -> ProblemId {
        self.problem_id
    }

    /// When inputting began.
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Ends inputting. The buffer is frozen from here on.
    #[instrument(skip(self))]
    pub fn finish(self) -> InputDoneGame {
        InputDoneGame {
            player1: self.player1,
            player2: self.player2,
            game_state: self.game_state,
            problem_id: self.problem_id,
        }
    }
}

// ─────────────────────────────────────────────────────────────
//  InputDone Phase
// ─────────────────────────────────────────────────────────────

/// Game waiting for its test results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDoneGame {
    player1: PlayerId,
    player2: PlayerId,
    game_state: GameStateId,
    problem_id: ProblemId,
}

impl InputDoneGame {
    /// Id of the frozen game state document.
    pub fn game_state(&self) -> GameStateId {
        self.game_state
    }

    /// The problem being solved.
    pub fn problem_id(&self) -> ProblemId {
        self.problem_id
    }

    /// Attaches test results, completing the game.
    #[instrument(skip(self))]
    pub fn score(self, test_results: TestResultsId) -> DoneGame {
        DoneGame {
            player1: self.player1,
            player2: self.player2,
            game_state: self.game_state,
            test_results,
            problem_id: self.problem_id,
        }
    }
}

// ─────────────────────────────────────────────────────────────
//  Done Phase
// ─────────────────────────────────────────────────────────────

/// Scored game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoneGame {
    player1: PlayerId,
    player2: PlayerId,
    game_state: GameStateId,
    test_results: TestResultsId,
    problem_id: ProblemId,
}

impl DoneGame {
    /// Id of the test results record.
    pub fn test_results(&self) -> TestResultsId {
        self.test_results
    }
}

// ─────────────────────────────────────────────────────────────
//  Serializable wrapper
// ─────────────────────────────────────────────────────────────

/// A game in any phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Game {
    /// Waiting to start.
    NotStarted(NotStartedGame),
    /// Accepting inputs.
    Inputting(InputtingGame),
    /// Waiting for test results.
    InputDone(InputDoneGame),
    /// Scored.
    Done(DoneGame),
}

impl Game {
    /// The phase tag.
    pub fn status(&self) -> GameStatus {
        match self {
            Game::NotStarted(_) => GameStatus::NotStarted,
            Game::Inputting(_) => GameStatus::Inputting,
            Game::InputDone(_) => GameStatus::InputDone,
            Game::Done(_) => GameStatus::Done,
        }
    }

    /// The creating player.
    pub fn player1(&self) -> PlayerId {
        match self {
            Game::NotStarted(g) => g.player1,
            Game::Inputting(g) => g.player1,
            Game::InputDone(g) => g.player1,
            Game::Done(g) => g.player1,
        }
    }

    /// The joining player, once seated.
    pub fn player2(&self) -> Option<PlayerId> {
        match self {
            Game::NotStarted(g) => g.player2,
            Game::Inputting(g) => Some(g.player2),
            Game::InputDone(g) => Some(g.player2),
            Game::Done(g) => Some(g.player2),
        }
    }

    /// The problem, once selected.
    pub fn problem_id(&self) -> Option<ProblemId> {
        match self {
            Game::NotStarted(g) => g.problem_id,
            Game::Inputting(g) => Some(g.problem_id),
            Game::InputDone(g) => Some(g.problem_id),
            Game::Done(g) => Some(g.problem_id),
        }
    }

    /// The game state document, once started.
    pub fn game_state(&self) -> Option<GameStateId> {
        match self {
            Game::NotStarted(_) => None,
            Game::Inputting(g) => Some(g.game_state),
            Game::InputDone(g) => Some(g.game_state),
            Game::Done(g) => Some(g.game_state),
        }
    }

    /// The test results record, once scored.
    pub fn test_results(&self) -> Option<TestResultsId> {
        match self {
            Game::Done(g) => Some(g.test_results),
            _ => None,
        }
    }

    /// Whether `player_id` is seated at this game.
    pub fn has_player(&self, player_id: PlayerId) -> bool {
        self.player1() == player_id || self.player2() == Some(player_id)
    }

    /// Unwraps the inputting phase.
    ///
    /// # Errors
    ///
    /// Returns [`BeeError::WrongPhase`] for every other phase.
    pub fn into_inputting(self) -> Result<InputtingGame, BeeError> {
        match self {
            Game::Inputting(g) => Ok(g),
            other => Err(BeeError::WrongPhase {
                expected: GameStatus::Inputting,
                actual: other.status(),
            }),
        }
    }

    /// Unwraps the not-started phase.
    ///
    /// # Errors
    ///
    /// Returns [`BeeError::WrongPhase`] for every other phase.
    pub fn into_not_started(self) -> Result<NotStartedGame, BeeError> {
        match self {
            Game::NotStarted(g) => Ok(g),
            other => Err(BeeError::WrongPhase {
                expected: GameStatus::NotStarted,
                actual: other.status(),
            }),
        }
    }
}

impl From<NotStartedGame> for Game {
    fn from(game: NotStartedGame) -> Self {
        Game::NotStarted(game)
    }
}

impl From<InputtingGame> for Game {
    fn from(game: InputtingGame) -> Self {
        Game::Inputting(game)
    }
}

impl From<InputDoneGame> for Game {
    fn from(game: InputDoneGame) -> Self {
        Game::InputDone(game)
    }
}

impl From<DoneGame> for Game {
    fn from(game: DoneGame) -> Self {
        Game::Done(game)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready() -> NotStartedGame {
        NotStartedGame::new(1)
            .join(2)
            .expect("join")
            .select_problem(7)
    }

    #[test]
    fn test_start_requires_second_player_and_problem() {
        let lonely = NotStartedGame::new(1).select_problem(7);
        assert!(matches!(
            lonely.start(1, Utc::now()),
            Err(BeeError::GameNotReady)
        ));

        let no_problem = NotStartedGame::new(1).join(2).expect("join");
        assert!(matches!(
            no_problem.start(1, Utc::now()),
            Err(BeeError::GameNotReady)
        ));
    }

    #[test]
    fn test_join_twice_is_full() {
        let game = NotStartedGame::new(1).join(2).expect("join");
        assert!(matches!(game.join(3), Err(BeeError::GameFull)));
    }

    #[test]
    fn test_full_lifecycle() {
        let inputting = ready().start(11, Utc::now()).expect("start");
        assert_eq!(inputting.player(Side::Player1), 1);
        assert_eq!(inputting.side_of(2), Some(Side::Player2));
        assert_eq!(inputting.side_of(9), None);

        let done = inputting.finish().score(5);
        let game = Game::from(done);
        assert_eq!(game.status(), GameStatus::Done);
        assert_eq!(game.test_results(), Some(5));
        assert_eq!(game.game_state(), Some(11));
    }

    #[test]
    fn test_into_inputting_rejects_other_phases() {
        let game = Game::from(ready());
        assert!(matches!(
            game.into_inputting(),
            Err(BeeError::WrongPhase {
                expected: GameStatus::Inputting,
                actual: GameStatus::NotStarted,
            })
        ));
    }

    #[test]
    fn test_game_serializes_with_status_tag() {
        let game = Game::from(ready());
        let json = serde_json::to_value(&game).expect("serialize");
        assert_eq!(json["status"], "NotStarted");
        assert_eq!(json["player2"], 2);
        let back: Game = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, game);
    }

    #[test]
    fn test_status_string_forms() {
        assert_eq!(GameStatus::InputDone.to_string(), "InputDone");
        assert_eq!("Done".parse::<GameStatus>().ok(), Some(GameStatus::Done));
    }
}
