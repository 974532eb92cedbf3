//! Lint rule catalog for PCRE patterns.
//!
//! Each rule is a small pass over the AST producing [`LintIssue`]s with a
//! stable dotted id, a severity, and where possible a hint and a suggested
//! rewrite. The catalog never throws for a well-formed tree; it accumulates.
//!
//! The crate also carries the two suppression primitives the lint driver
//! uses: [`Baseline`] files (known issues matched by tuple equality) and
//! the line-level [`IGNORE_DIRECTIVE`] comment.

mod baseline;
mod rules;

pub use baseline::{Baseline, BaselineEntry};
pub use rules::Linter;

use std::fmt;

use serde::{Deserialize, Serialize};

/// The directive that suppresses all issues for the following line.
pub const IGNORE_DIRECTIVE: &str = "// @regex-lint-ignore";

/// Issue severity buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LintSeverity {
    /// Stylistic; the pattern works as written
    Style,
    /// Performance hazard
    Perf,
    /// Probably not what the author meant
    Warning,
    /// The pattern is broken or meaningless
    Error,
}

impl fmt::Display for LintSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LintSeverity::Style => "style",
            LintSeverity::Perf => "perf",
            LintSeverity::Warning => "warning",
            LintSeverity::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// One lint finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintIssue {
    /// Stable dotted identifier, e.g. `regex.lint.alternation.empty-branch`
    pub id: String,
    /// Severity bucket
    pub severity: LintSeverity,
    /// What is wrong
    pub message: String,
    /// How to think about fixing it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Drop-in replacement for the offending fragment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_rewrite: Option<String>,
    /// Source file, filled in by the driver
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Source line, filled in by the driver
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Source column, filled in by the driver
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    /// The pattern the issue was found in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl LintIssue {
    /// Create an issue with only the analysis-side fields set.
    pub fn new(id: &str, severity: LintSeverity, message: impl Into<String>) -> Self {
        LintIssue {
            id: id.to_string(),
            severity,
            message: message.into(),
            hint: None,
            suggested_rewrite: None,
            file: None,
            line: None,
            column: None,
            pattern: None,
        }
    }

    /// Attach a hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach a suggested rewrite.
    pub fn with_rewrite(mut self, rewrite: impl Into<String>) -> Self {
        self.suggested_rewrite = Some(rewrite.into());
        self
    }
}

/// Whether the line before `line` (1-based) carries the ignore directive.
pub fn is_line_suppressed(source: &str, line: u32) -> bool {
    if line < 2 {
        return false;
    }
    source
        .lines()
        .nth(line as usize - 2)
        .map(|prev| prev.trim_start().starts_with(IGNORE_DIRECTIVE))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_serializes_lowercase() {
        let json = serde_json::to_string(&LintSeverity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }

    #[test]
    fn issue_json_omits_empty_fields() {
        let issue = LintIssue::new("regex.lint.test", LintSeverity::Style, "msg");
        let json = serde_json::to_value(&issue).unwrap();
        assert!(json.get("hint").is_none());
        assert!(json.get("file").is_none());
        assert_eq!(json["id"], "regex.lint.test");
    }

    #[test]
    fn ignore_directive_suppresses_next_line_only() {
        let source = "fn a() {}\n// @regex-lint-ignore\nlet p = \"/x/\";\nlet q = 1;\n";
        assert!(is_line_suppressed(source, 3));
        assert!(!is_line_suppressed(source, 4));
        assert!(!is_line_suppressed(source, 1));
    }
}
