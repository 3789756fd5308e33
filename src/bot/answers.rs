//! Cached bot answers and the next character a bot types from them.

use tracing::{debug, instrument};

use super::prompt::strip_whitespace;
use crate::bee::Operation;
use crate::store::{BotAnswer, GameTxn, NewBotAnswer, StoreError};
use crate::types::AnswerId;

/// Stores an answer for `(bot_type, prompt)` keyed by the whitespace-free
/// code it was requested for, replacing any earlier answer for that code.
///
/// A `None` answer records a failed request.
#[instrument(skip(txn, prompt, answer), fields(has_answer = answer.is_some()))]
pub fn record_answer(
    txn: &mut dyn GameTxn,
    bot_type: &str,
    prompt: &str,
    code_snippet: &str,
    answer: Option<String>,
) -> Result<AnswerId, StoreError> {
    let solution_snippet = strip_whitespace(code_snippet);
    for stale in txn.bot_answers(bot_type, prompt)? {
        if stale.solution_snippet() == &solution_snippet {
            debug!(answer_id = stale.id(), "Replacing cached answer");
            txn.delete_bot_answer(*stale.id())?;
        }
    }
    txn.insert_bot_answer(NewBotAnswer::new(
        bot_type.to_string(),
        prompt.to_string(),
        solution_snippet,
        answer,
    ))
}

/// First cached answer that extends `code`.
///
/// Between two bots the match is exact; against a human whitespace is
/// ignored. Failed requests never match.
pub fn find_answer<'a>(answers: &'a [BotAnswer], code: &str, both_bots: bool) -> Option<&'a BotAnswer> {
    let stripped_code = strip_whitespace(code);
    answers.iter().find(|candidate| match candidate.answer() {
        None => false,
        Some(text) if both_bots => text.starts_with(code),
        Some(text) => strip_whitespace(text).starts_with(&stripped_code),
    })
}

/// The command a bot plays next, given its full answer and the code so far.
///
/// Returns `"done"` once the answer is exhausted.
pub fn next_bot_input(answer: &str, code: &str, both_bots: bool) -> String {
    let chars: Vec<char> = answer.chars().collect();
    let code_prefix: String = if both_bots {
        code.to_string()
    } else {
        strip_whitespace(code)
    };

    // Index of the answer character that completes the code prefix.
    let matched_through = if code_prefix.is_empty() {
        None
    } else {
        let mut answer_prefix = String::new();
        let mut found = chars.len();
        for (i, c) in chars.iter().enumerate() {
            if both_bots || !c.is_whitespace() {
                answer_prefix.push(*c);
            }
            if answer_prefix == code_prefix {
                found = i;
                break;
            }
        }
        Some(found)
    };
    let start = matched_through.map_or(0, |i| i + 1);
    let rest = chars.get(start..).unwrap_or(&[]);

    let after_whitespace = code.chars().last().is_some_and(char::is_whitespace);
    let next = if !both_bots && after_whitespace {
        rest.iter().find(|c| !c.is_whitespace())
    } else {
        rest.first()
    };

    let operation = match next {
        None => Operation::Finish,
        Some(&input) => Operation::Add { input },
    };
    operation.to_command().unwrap_or_else(|| "done".to_string())
}
