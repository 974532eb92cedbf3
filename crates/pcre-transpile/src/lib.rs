//! Transpilers from PCRE to other regex dialects.
//!
//! Each target owns a compile visitor plus a flag mapper and a literal
//! formatter. Constructs a target cannot express raise [`TranspileError`]
//! at the first occurrence; constructs that convert with changed nuance
//! accumulate warnings and notes in the [`TranspileContext`].
//!
//! ```
//! use pcre_parser::Parser;
//! use pcre_transpile::{transpile, Target};
//!
//! let ast = Parser::new().parse(r"/\x{1F600}/").unwrap();
//! let result = transpile(&ast, Target::JavaScript).unwrap();
//! assert_eq!(result.literal, r"/\u{1F600}/u");
//! ```

mod emitter;

use std::fmt;

use pcre_ast::Node;
use serde::Serialize;
use thiserror::Error;

pub use emitter::transpile_tree;

/// Supported output dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// ECMAScript `RegExp`
    JavaScript,
    /// Python `re`
    Python,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::JavaScript => write!(f, "javascript"),
            Target::Python => write!(f, "python"),
        }
    }
}

/// Raised when the target cannot express a construct.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TranspileError {
    /// What could not be converted
    pub message: String,
    /// Byte offset of the construct in the source pattern
    pub offset: usize,
}

impl TranspileError {
    pub(crate) fn new(message: impl Into<String>, offset: usize) -> Self {
        TranspileError { message: message.into(), offset }
    }
}

/// Mutable state shared across one transpilation.
#[derive(Debug, Default)]
pub struct TranspileContext {
    /// Conversions that changed matching nuance
    pub warnings: Vec<String>,
    /// Informational notes (dropped flags, spelling changes)
    pub notes: Vec<String>,
    /// Flags the emitted pattern requires on the target
    pub required_flags: Vec<char>,
}

impl TranspileContext {
    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !self.warnings.contains(&message) {
            self.warnings.push(message);
        }
    }

    pub(crate) fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !self.notes.contains(&message) {
            self.notes.push(message);
        }
    }

    pub(crate) fn require_flag(&mut self, flag: char) {
        if !self.required_flags.contains(&flag) {
            self.required_flags.push(flag);
        }
    }
}

/// A finished conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranspileResult {
    /// Target name (`javascript`, `python`)
    pub target: String,
    /// The bare converted pattern
    pub pattern: String,
    /// Target-dialect flags
    pub flags: String,
    /// Ready-to-paste literal or constructor call
    pub literal: String,
    /// Conversions that changed matching nuance
    pub warnings: Vec<String>,
    /// Informational notes
    pub notes: Vec<String>,
}

/// Convert a parsed tree for a target dialect.
pub fn transpile(ast: &Node, target: Target) -> Result<TranspileResult, TranspileError> {
    transpile_tree(ast, target)
}
