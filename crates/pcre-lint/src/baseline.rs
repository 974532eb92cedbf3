//! Baseline files: known issues suppressed on later runs.

use serde::{Deserialize, Serialize};

/// One accepted issue. Matching is tuple equality on
/// `(file, line, type, message)`; `pattern` is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineEntry {
    /// Relative file path
    pub file: String,
    /// 1-based line
    pub line: u32,
    /// Issue message at the time of acceptance
    pub message: String,
    /// Issue id
    #[serde(rename = "type")]
    pub kind: String,
    /// The pattern, for human review of the baseline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// A loaded baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Baseline {
    entries: Vec<BaselineEntry>,
}

impl Baseline {
    /// Parse the JSON array format.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Serialize back to the JSON array format.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }

    /// All entries.
    pub fn entries(&self) -> &[BaselineEntry] {
        &self.entries
    }

    /// Record an entry.
    pub fn push(&mut self, entry: BaselineEntry) {
        self.entries.push(entry);
    }

    /// Whether an issue is covered by the baseline.
    pub fn matches(&self, file: &str, line: u32, kind: &str, message: &str) -> bool {
        self.entries.iter().any(|e| {
            e.file == file && e.line == line && e.kind == kind && e.message == message
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"file": "src/routes.rs", "line": 10, "message": "m", "type": "regex.lint.x", "pattern": "/a+/"},
        {"file": "src/routes.rs", "line": 12, "message": "n", "type": "regex.lint.y"}
    ]"#;

    #[test]
    fn parses_the_array_format() {
        let baseline = Baseline::from_json(SAMPLE).unwrap();
        assert_eq!(baseline.entries().len(), 2);
        assert_eq!(baseline.entries()[0].kind, "regex.lint.x");
        assert_eq!(baseline.entries()[1].pattern, None);
    }

    #[test]
    fn matching_is_tuple_equality() {
        let baseline = Baseline::from_json(SAMPLE).unwrap();
        assert!(baseline.matches("src/routes.rs", 10, "regex.lint.x", "m"));
        // any component off means no match
        assert!(!baseline.matches("src/routes.rs", 11, "regex.lint.x", "m"));
        assert!(!baseline.matches("src/other.rs", 10, "regex.lint.x", "m"));
        assert!(!baseline.matches("src/routes.rs", 10, "regex.lint.y", "m"));
        assert!(!baseline.matches("src/routes.rs", 10, "regex.lint.x", "other"));
    }

    #[test]
    fn round_trips_through_json() {
        let baseline = Baseline::from_json(SAMPLE).unwrap();
        let json = baseline.to_json().unwrap();
        let back = Baseline::from_json(&json).unwrap();
        assert_eq!(baseline, back);
    }
}
