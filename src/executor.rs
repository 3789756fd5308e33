//! Running an assembled program against a problem's test cases.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::bee::{TestCase, TestOutcome};

/// Executes a solution body against test cases.
///
/// Implementations never fail: anything that prevents evaluation is
/// reported as [`TestOutcome::EvaluationFailed`] for every case.
#[async_trait]
pub trait SolutionExecutor: Send + Sync {
    /// One outcome per test case, in order.
    async fn execute(&self, code: &str, test_cases: &[TestCase]) -> Vec<TestOutcome>;
}

/// Wraps a body typed during a game into the `solution` function.
pub fn solution_source(code: &str) -> String {
    format!("function solution(a) {{\n{code}\n}}")
}

/// Runs solutions in a `node` subprocess with a wall-clock limit.
#[derive(Debug, Clone)]
pub struct NodeExecutor {
    program: PathBuf,
    timeout: Duration,
}

impl NodeExecutor {
    /// Creates an executor for the given `node` binary.
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn script(code: &str, test_cases: &[TestCase]) -> Result<String, serde_json::Error> {
        let cases = serde_json::to_string(test_cases)?;
        Ok(format!(
            r#"{source}
const testCases = {cases};
const results = testCases.map(t => {{
  try {{
    const actual = solution(t.args);
    if (actual === t.expected) {{
      return {{ status: "Passed" }};
    }}
    return {{ status: "ResultIncorrect", actual: actual === undefined ? "undefined" : actual }};
  }} catch (e) {{
    return {{ status: "ExecutionFailed", error: (e && e.message) || "" }};
  }}
}});
console.log(JSON.stringify(results));
"#,
            source = solution_source(code),
        ))
    }

    async fn run(&self, script: String) -> Result<Vec<TestOutcome>, String> {
        let child = Command::new(&self.program)
            .arg("-e")
            .arg(script)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("Failed to start {}: {}", self.program.display(), e))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| format!("Timed out after {:?}", self.timeout))?
            .map_err(|e| format!("Executor failed: {}", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.lines().find(|l| l.contains("Error")).unwrap_or("");
            return Err(message.trim().to_string());
        }

        serde_json::from_slice(&output.stdout).map_err(|e| format!("Unreadable results: {}", e))
    }
}

#[async_trait]
impl SolutionExecutor for NodeExecutor {
    #[instrument(skip(self, code, test_cases), fields(code_len = code.len(), cases = test_cases.len()))]
    async fn execute(&self, code: &str, test_cases: &[TestCase]) -> Vec<TestOutcome> {
        let script = match Self::script(code, test_cases) {
            Ok(script) => script,
            Err(e) => return TestOutcome::evaluation_failed_all(test_cases.len(), &e.to_string()),
        };

        match self.run(script).await {
            Ok(outcomes) if outcomes.len() == test_cases.len() => {
                debug!(passed = outcomes.iter().filter(|o| o.is_passed()).count(), "Solution executed");
                outcomes
            }
            Ok(outcomes) => {
                warn!(got = outcomes.len(), "Executor returned wrong number of outcomes");
                TestOutcome::evaluation_failed_all(test_cases.len(), "Wrong number of outcomes")
            }
            Err(error) => {
                warn!(%error, "Solution could not be evaluated");
                TestOutcome::evaluation_failed_all(test_cases.len(), &error)
            }
        }
    }
}
