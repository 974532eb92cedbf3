//! Structural ReDoS detection.
//!
//! Finds the shapes that make backtracking matchers blow up: nested
//! unbounded quantifiers, repetition over possibly-empty groups,
//! alternations whose branches overlap under repetition, and adjacent
//! unbounded quantifiers over overlapping alphabets. Detection is purely
//! structural over the AST; no subject strings are executed.
//!
//! ```
//! use pcre_parser::Parser;
//! use pcre_redos::{RedosAnalyzer, Severity};
//!
//! let ast = Parser::new().parse("/(a+)+$/").unwrap();
//! let report = RedosAnalyzer::new().analyze(&ast);
//! assert_eq!(report.severity, Severity::Critical);
//! ```

use std::fmt;

use pcre_analysis::sets::{atom_char_set, can_match_empty, first_char_set};
use pcre_analysis::{Compiler, SampleGenerator};
use pcre_ast::{GroupKind, Node, NodeKind, QuantMode};
use serde::Serialize;

/// Severity ladder for ReDoS findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// No ambiguous repetition found
    Safe,
    /// Theoretical only
    Low,
    /// Needs attacker-controlled input of some size
    Medium,
    /// Exploitable with short inputs
    High,
    /// Exponential blow-up
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Safe => "safe",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// Score boundaries between severities.
///
/// `score <= low` is Low, `<= medium` Medium, `<= high` High, above that
/// Critical. Zero is Safe.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    /// Upper bound of Low
    pub low: u32,
    /// Upper bound of Medium
    pub medium: u32,
    /// Upper bound of High
    pub high: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds { low: 3, medium: 6, high: 8 }
    }
}

impl Thresholds {
    /// Classify a numeric score.
    pub fn classify(&self, score: u32) -> Severity {
        if score == 0 {
            Severity::Safe
        } else if score <= self.low {
            Severity::Low
        } else if score <= self.medium {
            Severity::Medium
        } else if score <= self.high {
            Severity::High
        } else {
            Severity::Critical
        }
    }
}

/// Analyzer configuration.
#[derive(Debug, Clone, Copy)]
pub struct RedosOptions {
    /// Severity boundaries
    pub thresholds: Thresholds,
    /// Findings below this severity are suppressed
    pub min_severity: Severity,
}

impl Default for RedosOptions {
    fn default() -> Self {
        RedosOptions { thresholds: Thresholds::default(), min_severity: Severity::Low }
    }
}

/// One vulnerable construct.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Severity of this finding alone
    pub severity: Severity,
    /// What is wrong and where
    pub message: String,
    /// The vulnerable subpattern, recompiled
    pub pattern: String,
    /// A safer formulation, when one is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_rewrite: Option<String>,
    /// Detection confidence in `[0, 1]`
    pub confidence: f64,
    #[serde(skip)]
    score: u32,
}

/// Full analysis result, serializable to the report JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedosReport {
    /// Overall severity (the worst finding)
    pub severity: Severity,
    /// Overall score 0..=10
    pub score: u32,
    /// Confidence of the worst finding
    pub confidence: f64,
    /// A string that would stress the matcher
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    /// The worst finding's subpattern
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vulnerable_subpattern: Option<String>,
    /// All findings at or above the configured severity
    pub findings: Vec<Finding>,
    /// General advice derived from the findings
    pub recommendations: Vec<String>,
}

/// Structural ReDoS analyzer.
#[derive(Debug, Default)]
pub struct RedosAnalyzer {
    options: RedosOptions,
}

impl RedosAnalyzer {
    /// Analyzer with default thresholds.
    pub fn new() -> Self {
        RedosAnalyzer::default()
    }

    /// Analyzer with explicit options.
    pub fn with_options(options: RedosOptions) -> Self {
        RedosAnalyzer { options }
    }

    /// Analyze a parsed tree.
    pub fn analyze(&self, ast: &Node) -> RedosReport {
        let mut findings = Vec::new();
        scan(ast, false, &mut findings, &self.options.thresholds);

        findings.retain(|f| f.severity >= self.options.min_severity);
        findings.sort_by(|a, b| b.score.cmp(&a.score));

        let Some(worst) = findings.first() else {
            return RedosReport {
                severity: Severity::Safe,
                score: 0,
                confidence: 1.0,
                trigger: None,
                vulnerable_subpattern: None,
                findings,
                recommendations: Vec::new(),
            };
        };

        let score = worst.score;
        let trigger = build_trigger(ast);
        let mut recommendations = Vec::new();
        if findings.iter().any(|f| f.suggested_rewrite.is_some()) {
            recommendations.push(
                "Replace ambiguous repetition with possessive quantifiers or atomic groups"
                    .to_string(),
            );
        }
        recommendations
            .push("Bound repetition counts where input length is attacker-controlled".to_string());

        RedosReport {
            severity: self.options.thresholds.classify(score),
            score,
            confidence: worst.confidence,
            trigger: Some(trigger),
            vulnerable_subpattern: Some(worst.pattern.clone()),
            findings,
            recommendations,
        }
    }
}

fn fragment(node: &Node) -> String {
    Compiler::new().compile(node)
}

/// Whether the subtree contains an unbounded quantifier reachable without
/// crossing a lookaround or atomic boundary.
fn contains_unbounded_quantifier(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Quantifier { node: inner, kind, mode } => {
            (kind.is_unbounded() && *mode != QuantMode::Possessive)
                || contains_unbounded_quantifier(inner)
        }
        NodeKind::Group { kind, child } => {
            !matches!(kind, GroupKind::Atomic) && !kind.is_lookaround()
                && contains_unbounded_quantifier(child)
        }
        _ => node.children().iter().any(|c| contains_unbounded_quantifier(c)),
    }
}

fn scan(node: &Node, under_unbounded: bool, findings: &mut Vec<Finding>, thresholds: &Thresholds) {
    let mut now_under = under_unbounded;
    if let NodeKind::Quantifier { node: inner, kind, mode } = &node.kind {
        if kind.is_unbounded() && *mode != QuantMode::Possessive {
            now_under = true;
            check_nested(node, inner, findings, thresholds);
            check_empty_repeat(node, inner, findings, thresholds);
            check_overlapping_alternation(node, inner, findings, thresholds);
        }
    }
    if let NodeKind::Sequence { children } = &node.kind {
        check_adjacent(children, findings, thresholds);
    }
    for child in node.children() {
        scan(child, now_under, findings, thresholds);
    }
}

/// `(a+)+` — an unbounded quantifier whose body contains another one.
fn check_nested(
    quantifier: &Node,
    inner: &Node,
    findings: &mut Vec<Finding>,
    thresholds: &Thresholds,
) {
    if !contains_unbounded_quantifier(inner) {
        return;
    }
    let pattern = fragment(quantifier);
    let rewrite = atomic_rewrite(quantifier, inner);
    let score = 10;
    findings.push(Finding {
        severity: thresholds.classify(score),
        message: format!(
            "Pattern contains nested unbounded quantifiers: `{pattern}` lets the matcher \
             split the same input between inner and outer repetition"
        ),
        pattern,
        suggested_rewrite: rewrite,
        confidence: 0.95,
        score,
    });
}

/// `(a?)*` — repetition over something that can match nothing.
fn check_empty_repeat(
    quantifier: &Node,
    inner: &Node,
    findings: &mut Vec<Finding>,
    thresholds: &Thresholds,
) {
    if !can_match_empty(inner) {
        return;
    }
    // The nested check already covers empty bodies with inner repetition.
    if contains_unbounded_quantifier(inner) {
        return;
    }
    let pattern = fragment(quantifier);
    let score = 7;
    findings.push(Finding {
        severity: thresholds.classify(score),
        message: format!(
            "Unbounded repetition of a possibly-empty group in `{pattern}` creates \
             ambiguous match positions"
        ),
        pattern,
        suggested_rewrite: None,
        confidence: 0.9,
        score,
    });
}

/// `(ab|ac)+` — branches sharing first characters under repetition.
fn check_overlapping_alternation(
    quantifier: &Node,
    inner: &Node,
    findings: &mut Vec<Finding>,
    thresholds: &Thresholds,
) {
    let alternatives = match &inner.kind {
        NodeKind::Alternation { alternatives } => alternatives,
        NodeKind::Group { child, kind } if !kind.is_lookaround() => match &child.kind {
            NodeKind::Alternation { alternatives } => alternatives,
            _ => return,
        },
        _ => return,
    };
    for (i, a) in alternatives.iter().enumerate() {
        for b in &alternatives[i + 1..] {
            let (Some(sa), Some(sb)) = (first_char_set(a), first_char_set(b)) else {
                continue;
            };
            if !sa.intersects(&sb) {
                continue;
            }
            let pattern = fragment(quantifier);
            let score = 7;
            findings.push(Finding {
                severity: thresholds.classify(score),
                message: format!(
                    "Alternation branches `{}` and `{}` overlap under repetition in `{pattern}`",
                    fragment(a),
                    fragment(b)
                ),
                pattern,
                suggested_rewrite: None,
                confidence: 0.8,
                score,
            });
            return;
        }
    }
}

/// `\d+\w+` — adjacent unbounded quantifiers whose alphabets overlap.
fn check_adjacent(children: &[Node], findings: &mut Vec<Finding>, thresholds: &Thresholds) {
    for pair in children.windows(2) {
        let (NodeKind::Quantifier { node: left, kind: lk, mode: lm },
             NodeKind::Quantifier { node: right, kind: rk, mode: rm }) =
            (&pair[0].kind, &pair[1].kind)
        else {
            continue;
        };
        if !lk.is_unbounded() || !rk.is_unbounded() {
            continue;
        }
        if *lm == QuantMode::Possessive || *rm == QuantMode::Possessive {
            continue;
        }
        let (Some(sl), Some(sr)) = (atom_char_set(left), atom_char_set(right)) else {
            continue;
        };
        if !sl.intersects(&sr) {
            continue;
        }
        let pattern = format!("{}{}", fragment(&pair[0]), fragment(&pair[1]));
        let score = 5;
        findings.push(Finding {
            severity: thresholds.classify(score),
            message: format!(
                "Adjacent unbounded quantifiers over overlapping alphabets in `{pattern}` \
                 force quadratic backtracking"
            ),
            pattern,
            suggested_rewrite: None,
            confidence: 0.6,
            score,
        });
    }
}

/// Suggest the atomic-group form of a nested quantifier: `(a+)+` becomes
/// `(?>a+)+`.
fn atomic_rewrite(quantifier: &Node, inner: &Node) -> Option<String> {
    let NodeKind::Quantifier { kind, mode, .. } = &quantifier.kind else {
        return None;
    };
    let body = match &inner.kind {
        NodeKind::Group { child, .. } => fragment(child),
        _ => fragment(inner),
    };
    let suffix = {
        let probe = Node::new(
            NodeKind::Quantifier {
                node: Box::new(Node::new(NodeKind::Dot, quantifier.span)),
                kind: *kind,
                mode: *mode,
            },
            quantifier.span,
        );
        let text = fragment(&probe);
        text[1..].to_string()
    };
    Some(format!("(?>{body}){suffix}"))
}

/// A stress input: the sample for the repeated part, repeated, followed by
/// a byte that forces the overall match to fail.
fn build_trigger(ast: &Node) -> String {
    let sample = SampleGenerator::new().generate(ast);
    let unit = if sample.is_empty() { "a".to_string() } else { sample };
    let mut out = unit.repeat((32 / unit.len().max(1)).max(2));
    out.push('!');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcre_parser::Parser;

    fn analyze(source: &str) -> RedosReport {
        let ast = Parser::new().parse(source).unwrap();
        RedosAnalyzer::new().analyze(&ast)
    }

    #[test]
    fn nested_unbounded_quantifiers_are_critical() {
        let report = analyze("/(a+)+$/");
        assert_eq!(report.severity, Severity::Critical);
        assert!(report.score >= 8);
        assert!(report
            .findings
            .iter()
            .any(|f| f.message.contains("nested unbounded quantifiers")));
        let rewrite = report.findings[0].suggested_rewrite.as_deref().unwrap();
        assert!(rewrite.contains("(?>a+)+"), "got {rewrite}");
        assert!(report.trigger.is_some());
    }

    #[test]
    fn empty_matching_repetition_is_flagged() {
        let report = analyze("/(a?)*/");
        assert!(report.severity >= Severity::High);
        assert!(report
            .findings
            .iter()
            .any(|f| f.message.contains("possibly-empty")));
    }

    #[test]
    fn overlapping_alternation_under_repetition() {
        let report = analyze("/(ab|ac)+/");
        assert!(report.severity >= Severity::High);
        assert!(report.findings.iter().any(|f| f.message.contains("overlap")));
    }

    #[test]
    fn disjoint_alternation_is_safe() {
        let report = analyze("/(ab|cd)+/");
        assert_eq!(report.severity, Severity::Safe);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn adjacent_overlapping_quantifiers_are_medium() {
        let report = analyze(r"/\d+\w+x/");
        assert!(report.severity >= Severity::Medium);
    }

    #[test]
    fn possessive_forms_are_safe() {
        assert_eq!(analyze("/(a++)+$/").severity, Severity::Safe);
        assert_eq!(analyze(r"/\d++\w+/").severity, Severity::Safe);
    }

    #[test]
    fn plain_patterns_are_safe() {
        let report = analyze("/hello [a-z]+ world/");
        assert_eq!(report.severity, Severity::Safe);
        assert_eq!(report.score, 0);
    }

    #[test]
    fn report_serializes_with_camel_case_keys() {
        let report = analyze("/(a+)+/");
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("vulnerableSubpattern").is_some());
        assert!(json.get("recommendations").is_some());
        assert_eq!(json["severity"], "critical");
    }

    #[test]
    fn min_severity_suppresses_findings() {
        let options = RedosOptions { min_severity: Severity::Critical, ..Default::default() };
        let ast = Parser::new().parse(r"/\d+\w+/").unwrap();
        let report = RedosAnalyzer::with_options(options).analyze(&ast);
        assert!(report.findings.is_empty());
        assert_eq!(report.severity, Severity::Safe);
    }
}
