//! Prompt construction and answer extraction.

use tracing::{debug, instrument};

/// System instruction sent with every bot request.
pub const SYSTEM_PROMPT: &str = "You are implementing JavaScript functions";

const FENCE_OPEN: &str = "```javascript";
const FENCE_CLOSE: &str = "```";
const FUNCTION_HEADER: &str = "function solution(";

/// Builds the user prompt for a problem and the code typed so far.
#[instrument(skip_all, fields(prompt_len = problem_prompt.len(), code_len = code_snippet.len()))]
pub fn construct_prompt(problem_prompt: &str, code_snippet: &str) -> String {
    format!(
        "Please finish implementing this JavaScript function based on the following prompt. \n\
         Please include code for the full function and do not include explanations.\n\
         \n\
         Prompt:\n\
         {problem_prompt}\n\
         \n\
         function solution(a) {{\n  \
         {code_snippet}\n\
         }}\n"
    )
}

/// Extracts the function body from a raw bot answer.
///
/// Returns an empty string when the answer is unusable.
#[instrument(skip_all, fields(raw_len = raw_answer.len()))]
pub fn parse_answer(raw_answer: &str, code_snippet: &str) -> String {
    let answer = fenced_block(raw_answer).unwrap_or(raw_answer);

    if let Some(body) = function_body(answer) {
        debug!(body_len = body.len(), "Extracted function body");
        return body.to_string();
    }

    if strip_whitespace(answer).starts_with(&strip_whitespace(code_snippet)) {
        return answer.to_string();
    }

    debug!("Answer does not extend the code");
    String::new()
}

fn fenced_block(raw: &str) -> Option<&str> {
    let begin = raw.find(FENCE_OPEN)? + FENCE_OPEN.len();
    let end = raw.rfind(FENCE_CLOSE)?;
    (end >= begin).then(|| raw[begin..end].trim())
}

/// Body between `function solution(<ident>) {` and the last `}`.
fn function_body(answer: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(offset) = answer[search_from..].find(FUNCTION_HEADER) {
        let params_start = search_from + offset + FUNCTION_HEADER.len();
        let rest = &answer[params_start..];
        let ident_len = rest
            .chars()
            .take_while(|c| c.is_ascii_lowercase())
            .count();
        if ident_len > 0 && rest[ident_len..].starts_with(") {") {
            let body_start = params_start + ident_len + ") {".len();
            let body_end = answer.rfind('}')?;
            return (body_end >= body_start).then(|| answer[body_start..body_end].trim());
        }
        search_from = params_start;
    }
    None
}

/// Removes every whitespace character.
pub fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_problem_and_code() {
        let prompt = construct_prompt("Double a.", "return");
        assert!(prompt.contains("Prompt:\nDouble a.\n"));
        assert!(prompt.contains("function solution(a) {\n  return\n}\n"));
        assert!(prompt.starts_with("Please finish implementing"));
    }

    #[test]
    fn test_parses_fenced_function() {
        let raw = "Sure!\n```javascript\nfunction solution(a) {\n  return a * 2;\n}\n```\nDone.";
        assert_eq!(parse_answer(raw, "ret"), "return a * 2;");
    }

    #[test]
    fn test_parses_bare_function() {
        let raw = "function solution(x) { return x; }";
        assert_eq!(parse_answer(raw, ""), "return x;");
    }

    #[test]
    fn test_accepts_continuation_of_code() {
        assert_eq!(parse_answer("return a+1;", "ret urn"), "return a+1;");
    }

    #[test]
    fn test_rejects_unrelated_answer() {
        assert_eq!(parse_answer("I cannot help with that.", "return"), "");
    }

    #[test]
    fn test_fence_close_before_open_is_ignored() {
        assert_eq!(fenced_block("``` then ```javascript"), None);
    }
}
