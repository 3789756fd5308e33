//! Test cases and per-case outcomes.

use serde::{Deserialize, Serialize};

/// A hidden test case attached to a problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Argument passed to the solution function.
    pub args: serde_json::Value,
    /// Expected return value.
    pub expected: serde_json::Value,
}

/// Outcome of running the assembled program against one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum TestOutcome {
    /// The program returned the expected value.
    Passed,
    /// The program returned something else.
    ResultIncorrect {
        /// The value actually returned.
        actual: serde_json::Value,
    },
    /// The program threw while running this case.
    ExecutionFailed {
        /// Error text reported by the executor.
        error: String,
    },
    /// The program could not be evaluated at all.
    EvaluationFailed {
        /// Error text reported by the executor.
        error: String,
    },
}

impl TestOutcome {
    /// Fills every case with the same evaluation failure.
    pub fn evaluation_failed_all(count: usize, error: &str) -> Vec<TestOutcome> {
        (0..count)
            .map(|_| TestOutcome::EvaluationFailed {
                error: error.to_string(),
            })
            .collect()
    }

    /// Returns true for [`TestOutcome::Passed`].
    pub fn is_passed(&self) -> bool {
        matches!(self, TestOutcome::Passed)
    }
}
