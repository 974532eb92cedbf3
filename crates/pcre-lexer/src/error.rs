//! Lexer error types.

use thiserror::Error;

/// Result alias for lexer operations.
pub type Result<T> = std::result::Result<T, LexerError>;

/// Errors produced while tokenizing a pattern.
///
/// Every variant carries the byte offset where tokenization stopped so the
/// facade can render a caret snippet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexerError {
    /// A lone backslash at end of input.
    #[error("Unable to tokenize")]
    TrailingBackslash {
        /// Offset of the backslash
        offset: usize,
    },

    /// `[` was never closed.
    #[error("Unclosed character class \"]\" at end of input.")]
    UnclosedCharClass {
        /// Offset where the class opened
        offset: usize,
    },

    /// `(?#` was never closed.
    #[error("Unclosed comment")]
    UnclosedComment {
        /// Offset where the comment opened
        offset: usize,
    },

    /// Input bytes are not valid UTF-8 in `/u` mode.
    #[error("Input string is not valid UTF-8.")]
    InvalidUtf8 {
        /// Offset of the first invalid byte
        offset: usize,
    },

    /// A construct the tokenizer could not make sense of.
    #[error("Unable to tokenize")]
    Unrecognized {
        /// Offset of the offending byte
        offset: usize,
    },
}

impl LexerError {
    /// Byte offset the error points at.
    pub fn offset(&self) -> usize {
        match *self {
            LexerError::TrailingBackslash { offset }
            | LexerError::UnclosedCharClass { offset }
            | LexerError::UnclosedComment { offset }
            | LexerError::InvalidUtf8 { offset }
            | LexerError::Unrecognized { offset } => offset,
        }
    }
}
