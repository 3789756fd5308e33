//! Text command parsing.
//!
//! Players type commands rather than structured operations. A command is
//! either a single character or one of a handful of keywords.

use tracing::{debug, instrument};

use super::operation::Operation;

/// Error produced when a typed command cannot be understood.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ParseError {
    /// Nothing was typed.
    #[display("Empty input")]
    Empty,

    /// A multi-character string that is not a known command.
    #[display("More than one character: {:?}", _0)]
    MoreThanOneCharacter(String),

    /// A `skip N` or `clear N` command with an unreadable count.
    #[display("Invalid count in command: {:?}", _0)]
    InvalidCount(String),
}

impl std::error::Error for ParseError {}

/// Parses a typed command against the current buffer.
///
/// The buffer is needed by `clearline`, which resolves to a concrete
/// character count at parse time.
#[instrument(skip(current_code), fields(code_len = current_code.len()))]
pub fn parse_input(raw: &str, current_code: &str) -> Result<Operation, ParseError> {
    if raw.is_empty() {
        return Err(ParseError::Empty);
    }

    let op = match raw {
        "done" => Operation::Finish,
        "clearline" => Operation::Delete {
            num_deleted: clearline_count(current_code),
        },
        "\\n" => Operation::Add { input: '\n' },
        "\\t" => Operation::Add { input: '\t' },
        _ => {
            if let Some(count) = command_count(raw, "skip") {
                Operation::Skip { num_skips: count? }
            } else if let Some(count) = command_count(raw, "clear") {
                Operation::Delete { num_deleted: count? }
            } else {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Operation::Add { input: c },
                    _ => return Err(ParseError::MoreThanOneCharacter(raw.to_string())),
                }
            }
        }
    };

    debug!(operation = %op, "Parsed input");
    Ok(op)
}

/// Reads `keyword` or `keyword N`. Returns `None` when `raw` is neither.
fn command_count(raw: &str, keyword: &str) -> Option<Result<u32, ParseError>> {
    let rest = raw.strip_prefix(keyword)?;
    if rest.is_empty() {
        return Some(Ok(1));
    }
    let count = rest.strip_prefix(' ')?;
    Some(
        count
            .trim()
            .parse::<u32>()
            .map_err(|_| ParseError::InvalidCount(raw.to_string())),
    )
}

/// Characters on the last line, including the newline that starts it.
fn clearline_count(code: &str) -> u32 {
    let count = match code.rfind('\n') {
        Some(idx) => code[idx..].chars().count(),
        None => code.chars().count(),
    };
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_character_adds() {
        assert_eq!(parse_input("x", ""), Ok(Operation::Add { input: 'x' }));
        assert_eq!(parse_input(" ", ""), Ok(Operation::Add { input: ' ' }));
    }

    #[test]
    fn test_escapes_add_whitespace() {
        assert_eq!(parse_input("\\n", ""), Ok(Operation::Add { input: '\n' }));
        assert_eq!(parse_input("\\t", ""), Ok(Operation::Add { input: '\t' }));
        assert_eq!(parse_input("\n", ""), Ok(Operation::Add { input: '\n' }));
    }

    #[test]
    fn test_done_finishes() {
        assert_eq!(parse_input("done", "abc"), Ok(Operation::Finish));
    }

    #[test]
    fn test_skip_default_and_count() {
        assert_eq!(parse_input("skip", ""), Ok(Operation::Skip { num_skips: 1 }));
        assert_eq!(parse_input("skip 4", ""), Ok(Operation::Skip { num_skips: 4 }));
    }

    #[test]
    fn test_clear_default_and_count() {
        assert_eq!(parse_input("clear", "ab"), Ok(Operation::Delete { num_deleted: 1 }));
        assert_eq!(parse_input("clear 2", "ab"), Ok(Operation::Delete { num_deleted: 2 }));
    }

    #[test]
    fn test_clearline_covers_last_line_and_its_newline() {
        assert_eq!(
            parse_input("clearline", "let a;\nret"),
            Ok(Operation::Delete { num_deleted: 4 })
        );
    }

    #[test]
    fn test_clearline_without_newline_clears_everything() {
        assert_eq!(
            parse_input("clearline", "return"),
            Ok(Operation::Delete { num_deleted: 6 })
        );
    }

    #[test]
    fn test_bad_count_is_rejected() {
        assert_eq!(
            parse_input("skip x", ""),
            Err(ParseError::InvalidCount("skip x".to_string()))
        );
    }

    #[test]
    fn test_multi_character_rejected() {
        assert_eq!(
            parse_input("ab", ""),
            Err(ParseError::MoreThanOneCharacter("ab".to_string()))
        );
        assert_eq!(
            parse_input("skipper", ""),
            Err(ParseError::MoreThanOneCharacter("skipper".to_string()))
        );
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(parse_input("", ""), Err(ParseError::Empty));
    }

    #[test]
    fn test_commands_round_trip_through_to_command() {
        for op in [
            Operation::Add { input: '\n' },
            Operation::Add { input: 'q' },
            Operation::Delete { num_deleted: 3 },
            Operation::Skip { num_skips: 2 },
            Operation::Finish,
        ] {
            let cmd = op.to_command().expect("typed operation");
            assert_eq!(parse_input(&cmd, ""), Ok(op));
        }
    }
}
