//! Error types for statement tokenization.

use thiserror::Error;

/// Result type alias for tokenizer operations.
pub type TokenizeResult<T> = Result<T, TokenizeError>;

/// Errors that can occur while splitting script text into statements.
///
/// The tokenizer tolerates almost anything; the one structural failure it
/// cannot recover from is a string literal left open at end of input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    /// A string literal was still open when the input ended.
    #[error("Unterminated string literal in statement starting at line {line}")]
    UnterminatedLiteral {
        /// First line of the statement containing the open literal.
        line: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_line() {
        let err = TokenizeError::UnterminatedLiteral { line: 17 };
        assert!(err.to_string().contains("line 17"));
    }
}
