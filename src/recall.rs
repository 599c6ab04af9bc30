// recall.rs

use thiserror::Error;

use crate::history::{HistoryStore, Retention, RECALL_SENTINEL};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecallError {
    #[error("No commands in history")]
    HistoryEmpty,
    #[error("{0}: invalid history expression")]
    MalformedExpression(String),
    #[error("No such command in history: {0}")]
    NoSuchCommand(i64),
    #[error("Command {0} is too old, only the last {1} commands are kept")]
    TooOld(usize, usize),
    #[error("Cannot recall a history invocation")]
    RecursiveRecall,
    #[error("Line too long ({len} bytes, limit is {max})")]
    LineTooLong { len: usize, max: usize },
}

/// A parsed bang expression, minus its trailing suffix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecallExpression {
    /// `!!`
    LastCommand,
    /// `!-n`; `!-0` means the last command.
    RelativeOffset(usize),
    /// `!n`
    AbsoluteIndex(usize),
}

impl RecallExpression {
    /// Parses the head token (e.g. `!!`, `!-2`, `!14`).
    pub fn parse(head: &str) -> Result<Self, RecallError> {
        let malformed = || RecallError::MalformedExpression(head.to_string());
        let body = head.strip_prefix(RECALL_SENTINEL).ok_or_else(malformed)?;
        if body.is_empty() {
            return Err(malformed());
        }
        if body.len() == RECALL_SENTINEL.len_utf8() && body.starts_with(RECALL_SENTINEL) {
            return Ok(RecallExpression::LastCommand);
        }
        match body.strip_prefix('-') {
            Some(digits) => parse_digits(digits)
                .map(RecallExpression::RelativeOffset)
                .ok_or_else(malformed),
            None => parse_digits(body)
                .map(RecallExpression::AbsoluteIndex)
                .ok_or_else(malformed),
        }
    }

    /// Logical index this expression points at, given how many commands
    /// have been entered. May fall outside the valid range.
    pub fn target(self, total_entered: usize) -> i64 {
        let total = total_entered as i64;
        match self {
            RecallExpression::LastCommand | RecallExpression::RelativeOffset(0) => total,
            RecallExpression::RelativeOffset(n) => total + 1 - n as i64,
            RecallExpression::AbsoluteIndex(n) => n as i64,
        }
    }
}

fn parse_digits(s: &str) -> Option<usize> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Values past i64::MAX can never name a stored command.
    s.parse::<usize>().ok().filter(|n| *n <= i64::MAX as usize)
}

/// Outcome of a successful [`resolve`] call.
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The line is not a recall expression and should run as typed.
    NotRecall,
    /// The concrete command line the expression expands to.
    Resolved(String),
}

pub fn is_recall(line: &str) -> bool {
    line.trim_start().starts_with(RECALL_SENTINEL)
}

/// Expands a recall expression against `history`.
///
/// Never mutates the store. The expanded line is rejected if it exceeds
/// `max_len` bytes or is itself a recall expression.
pub fn resolve(line: &str, history: &HistoryStore, max_len: usize) -> Result<Resolution, RecallError> {
    let line = line.trim_start();
    if !line.starts_with(RECALL_SENTINEL) {
        return Ok(Resolution::NotRecall);
    }
    if history.is_empty() {
        return Err(RecallError::HistoryEmpty);
    }

    let (head, suffix) = match line.find(char::is_whitespace) {
        Some(at) => (&line[..at], line[at..].trim()),
        None => (line, ""),
    };
    let expr = RecallExpression::parse(head)?;
    let target = expr.target(history.total_entered());
    let index = usize::try_from(target).map_err(|_| RecallError::NoSuchCommand(target))?;
    let base = match history.retention(index) {
        Retention::Retained => history.get(index).ok_or(RecallError::NoSuchCommand(target))?,
        Retention::NeverExisted => return Err(RecallError::NoSuchCommand(target)),
        Retention::Evicted => return Err(RecallError::TooOld(index, history.capacity())),
    };

    let resolved = if suffix.is_empty() {
        base.to_string()
    } else {
        format!("{} {}", base, suffix)
    };
    if is_recall(&resolved) {
        return Err(RecallError::RecursiveRecall);
    }
    if resolved.len() > max_len {
        return Err(RecallError::LineTooLong { len: resolved.len(), max: max_len });
    }
    Ok(Resolution::Resolved(resolved))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 512;

    fn store_with(lines: &[&str]) -> HistoryStore {
        let mut store = HistoryStore::new(20);
        for line in lines {
            store.append(line);
        }
        store
    }

    fn resolved(line: &str, store: &HistoryStore) -> String {
        match resolve(line, store, MAX) {
            Ok(Resolution::Resolved(s)) => s,
            other => panic!("expected a resolved line for {:?}, got {:?}", line, other),
        }
    }

    #[test]
    fn bang_bang_is_last_command() {
        let store = store_with(&["ls", "pwd"]);
        assert_eq!(resolved("!!", &store), "pwd");
    }

    #[test]
    fn bang_minus_zero_matches_bang_bang() {
        let mut store = store_with(&["ls"]);
        for next in ["pwd", "echo a", "cd /tmp"] {
            assert_eq!(resolved("!-0", &store), resolved("!!", &store));
            store.append(next);
        }
        assert_eq!(resolved("!-0", &store), "cd /tmp");
    }

    #[test]
    fn relative_offset_counts_from_current_command() {
        let store = store_with(&["one", "two", "three"]);
        assert_eq!(resolved("!-1", &store), "three");
        assert_eq!(resolved("!-3", &store), "one");
        assert_eq!(resolve("!-4", &store, MAX), Err(RecallError::NoSuchCommand(0)));
        assert_eq!(resolve("!-9", &store, MAX), Err(RecallError::NoSuchCommand(-5)));
    }

    #[test]
    fn absolute_index_window_errors() {
        let mut store = HistoryStore::new(20);
        for i in 1..=25 {
            store.append(&format!("cmd{}", i));
        }
        assert_eq!(resolve("!3", &store, MAX), Err(RecallError::TooOld(3, 20)));
        assert_eq!(resolve("!0", &store, MAX), Err(RecallError::NoSuchCommand(0)));
        assert_eq!(resolve("!26", &store, MAX), Err(RecallError::NoSuchCommand(26)));
        assert_eq!(resolved("!6", &store), "cmd6");
    }

    #[test]
    fn suffix_is_appended_with_single_space() {
        let store = store_with(&["a", "b", "c", "d", "echo hi"]);
        assert_eq!(resolved("!5 world", &store), "echo hi world");
        assert_eq!(resolved("  !!   -n  x  ", &store), "echo hi -n  x");
    }

    #[test]
    fn malformed_heads_are_rejected() {
        let store = store_with(&["ls"]);
        for line in ["!", "!-", "!-x", "!-1x", "!1a", "!abc", "!!!", "!!x", "!+1"] {
            assert!(
                matches!(resolve(line, &store, MAX), Err(RecallError::MalformedExpression(_))),
                "{:?} should be malformed",
                line
            );
        }
    }

    #[test]
    fn empty_history_fails_before_parsing() {
        let store = HistoryStore::new(20);
        for line in ["!!", "!1", "!-1", "!", "!garbage"] {
            assert_eq!(resolve(line, &store, MAX), Err(RecallError::HistoryEmpty));
        }
        assert_eq!(store.total_entered(), 0);
    }

    #[test]
    fn recalled_recall_expression_is_refused() {
        let mut store = HistoryStore::new(20);
        // Leading whitespace lets the entry past append's sentinel check.
        assert!(store.append("  !!"));
        assert_eq!(resolve("!1", &store, MAX), Err(RecallError::RecursiveRecall));
        assert_eq!(resolve("!!", &store, MAX), Err(RecallError::RecursiveRecall));
    }

    #[test]
    fn recursion_is_reported_ahead_of_length() {
        let mut store = HistoryStore::new(20);
        store.append("  !!");
        assert_eq!(
            resolve("!1 abcdefghijklmnop", &store, 8),
            Err(RecallError::RecursiveRecall)
        );
    }

    #[test]
    fn non_recall_lines_pass_through() {
        let store = HistoryStore::new(20);
        assert_eq!(resolve("echo !!", &store, MAX), Ok(Resolution::NotRecall));
        assert_eq!(resolve("", &store, MAX), Ok(Resolution::NotRecall));
        assert!(is_recall("   !5"));
        assert!(!is_recall("ls !5"));
    }

    #[test]
    fn overlong_expansion_is_rejected() {
        let store = store_with(&["echo 0123456789"]);
        assert_eq!(
            resolve("!1 abcdef", &store, 16),
            Err(RecallError::LineTooLong { len: 22, max: 16 })
        );
    }

    #[test]
    fn huge_index_is_malformed_not_a_panic() {
        let store = store_with(&["ls"]);
        assert!(matches!(
            resolve("!99999999999999999999999", &store, MAX),
            Err(RecallError::MalformedExpression(_))
        ));
        assert_eq!(
            resolve("!9223372036854775807", &store, MAX),
            Err(RecallError::NoSuchCommand(i64::MAX))
        );
    }
}
