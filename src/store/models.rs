//! Stored records other than games and game states.

use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::bee::{Input, TestCase, TestOutcome};
use crate::types::{AnswerId, GameId, PlayerId, ProblemId, TestResultsId};

/// A human or bot participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    id: PlayerId,
    name: String,
    bot_type: Option<String>,
}

impl Player {
    /// A player is a bot iff it carries a bot type.
    pub fn is_bot(&self) -> bool {
        self.bot_type.is_some()
    }
}

/// Insertable player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
#[serde(rename_all = "camelCase")]
pub struct NewPlayer {
    name: String,
    #[serde(default)]
    bot_type: Option<String>,
}

/// A coding problem with hidden test cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, new)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    id: ProblemId,
    summary: Option<String>,
    prompt: String,
    test_cases: Vec<TestCase>,
    is_published: bool,
}

/// Insertable problem, as read from a request body or a problem file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, new)]
#[serde(rename_all = "camelCase")]
pub struct NewProblem {
    #[serde(default)]
    summary: Option<String>,
    prompt: String,
    #[serde(default)]
    test_cases: Vec<TestCase>,
    #[serde(default)]
    is_published: bool,
}

impl NewProblem {
    /// Attaches an id, producing the stored form.
    pub fn into_problem(self, id: ProblemId) -> Problem {
        Problem::new(
            id,
            self.summary,
            self.prompt,
            self.test_cases,
            self.is_published,
        )
    }
}

/// Recorded test outcomes for a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, new)]
#[serde(rename_all = "camelCase")]
pub struct TestResults {
    id: TestResultsId,
    game_id: GameId,
    results: Vec<TestOutcome>,
}

/// A cached full-text answer from a bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
#[serde(rename_all = "camelCase")]
pub struct BotAnswer {
    id: AnswerId,
    bot_type: String,
    prompt: String,
    solution_snippet: String,
    answer: Option<String>,
}

/// Insertable bot answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
#[serde(rename_all = "camelCase")]
pub struct NewBotAnswer {
    bot_type: String,
    prompt: String,
    solution_snippet: String,
    answer: Option<String>,
}

impl NewBotAnswer {
    /// Attaches an id, producing the stored form.
    pub fn into_answer(self, id: AnswerId) -> BotAnswer {
        BotAnswer::new(id, self.bot_type, self.prompt, self.solution_snippet, self.answer)
    }
}

/// One persisted slice of a game's input log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
#[serde(rename_all = "camelCase")]
pub struct InputChunk {
    game_id: GameId,
    rank: i64,
    inputs: Vec<Input>,
}

impl InputChunk {
    /// Appends an input to this chunk.
    pub fn push(&mut self, input: Input) {
        self.inputs.push(input);
    }

    /// Consumes the chunk, returning its inputs.
    pub fn into_inputs(self) -> Vec<Input> {
        self.inputs
    }
}
