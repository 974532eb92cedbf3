//! The rule catalog.

use pcre_analysis::sets::can_match_empty;
use pcre_analysis::Compiler;
use pcre_ast::{Flags, GroupKind, Node, NodeKind, QuantMode, QuantifierKind};

use crate::{LintIssue, LintSeverity};

/// Runs every rule over a parsed tree.
#[derive(Debug, Default)]
pub struct Linter;

impl Linter {
    /// Create a linter.
    pub fn new() -> Self {
        Linter
    }

    /// Lint a tree. The returned issues carry analysis-side fields only;
    /// the driver fills in file/line/column and the pattern text.
    pub fn lint(&self, ast: &Node) -> Vec<LintIssue> {
        let mut issues = Vec::new();
        walk(ast, &mut issues);
        issues
    }
}

fn fragment(node: &Node) -> String {
    Compiler::new().compile(node)
}

fn walk(node: &Node, issues: &mut Vec<LintIssue>) {
    match &node.kind {
        NodeKind::Regex { flags, pattern, .. } => {
            check_redundant_flags(*flags, pattern, issues);
            check_leading_dot_star(pattern, issues);
            walk(pattern, issues);
            return;
        }
        NodeKind::Alternation { alternatives } => {
            check_empty_branches(node, alternatives, issues);
            check_duplicate_branches(node, alternatives, issues);
        }
        NodeKind::Quantifier { node: inner, kind, mode } => {
            check_nested_quantifier(node, inner, issues);
            check_empty_repeat(node, inner, *kind, *mode, issues);
        }
        NodeKind::CharClass { .. } => {
            check_single_char_class(node, issues);
            check_duplicate_class_items(node, issues);
        }
        NodeKind::Group { kind, child } => {
            check_empty_group(node, kind, child, issues);
        }
        _ => {}
    }
    for child in node.children() {
        walk(child, issues);
    }
}

/// `a|` and `(x||y)` — an empty branch matches everything at that point.
fn check_empty_branches(node: &Node, alternatives: &[Node], issues: &mut Vec<LintIssue>) {
    let empties = alternatives
        .iter()
        .filter(|a| matches!(&a.kind, NodeKind::Sequence { children } if children.is_empty()))
        .count();
    if empties > 0 {
        issues.push(
            LintIssue::new(
                "regex.lint.alternation.empty-branch",
                LintSeverity::Warning,
                format!("Alternation `{}` has an empty branch", fragment(node)),
            )
            .with_hint("An empty branch matches the empty string; use `?` on the alternation instead"),
        );
    }
}

/// `a|a` — the second branch can never add a match.
fn check_duplicate_branches(node: &Node, alternatives: &[Node], issues: &mut Vec<LintIssue>) {
    let compiled: Vec<String> = alternatives.iter().map(fragment).collect();
    for (i, branch) in compiled.iter().enumerate() {
        if compiled[..i].contains(branch) {
            issues.push(
                LintIssue::new(
                    "regex.lint.alternation.duplicate-branch",
                    LintSeverity::Warning,
                    format!("Branch `{branch}` is duplicated in `{}`", fragment(node)),
                )
                .with_hint("Remove the duplicate branch; alternation tries branches left to right"),
            );
            return;
        }
    }
}

/// `a**` and `(a+)+` shapes.
fn check_nested_quantifier(node: &Node, inner: &Node, issues: &mut Vec<LintIssue>) {
    if matches!(inner.kind, NodeKind::Quantifier { .. }) {
        issues.push(LintIssue::new(
            "regex.lint.quantifier.nested",
            LintSeverity::Error,
            format!("Quantifier applied directly to another quantifier in `{}`", fragment(node)),
        ));
    }
}

/// `(a?)*` — ambiguous empty iterations.
fn check_empty_repeat(
    node: &Node,
    inner: &Node,
    kind: QuantifierKind,
    mode: QuantMode,
    issues: &mut Vec<LintIssue>,
) {
    if !kind.is_unbounded() || mode == QuantMode::Possessive {
        return;
    }
    if matches!(inner.kind, NodeKind::Quantifier { .. }) {
        return; // covered by the nested rule
    }
    if can_match_empty(inner) {
        issues.push(
            LintIssue::new(
                "regex.lint.quantifier.possibly-empty",
                LintSeverity::Warning,
                format!(
                    "Unbounded repetition of a possibly-empty pattern in `{}`",
                    fragment(node)
                ),
            )
            .with_hint("Each iteration should consume at least one character"),
        );
    }
}

/// `[a]` — a class of one character is that character.
fn check_single_char_class(node: &Node, issues: &mut Vec<LintIssue>) {
    let NodeKind::CharClass { negated: false, expression } = &node.kind else {
        return;
    };
    let NodeKind::Literal { value, .. } = &expression.kind else {
        return;
    };
    if value.chars().count() == 1 {
        let rewrite = fragment(expression);
        issues.push(
            LintIssue::new(
                "regex.lint.class.single-char",
                LintSeverity::Style,
                format!("Character class `{}` contains a single character", fragment(node)),
            )
            .with_rewrite(rewrite),
        );
    }
}

/// `[aab]` — repeated class members.
fn check_duplicate_class_items(node: &Node, issues: &mut Vec<LintIssue>) {
    let NodeKind::CharClass { expression, .. } = &node.kind else {
        return;
    };
    let NodeKind::Sequence { children } = &expression.kind else {
        return;
    };
    let mut seen = Vec::new();
    for child in children {
        let text = fragment(child);
        if seen.contains(&text) {
            issues.push(
                LintIssue::new(
                    "regex.lint.class.duplicate",
                    LintSeverity::Style,
                    format!("`{text}` appears more than once in `{}`", fragment(node)),
                )
                .with_hint("Duplicate class members have no effect"),
            );
            return;
        }
        seen.push(text);
    }
}

/// `()` and `(?:)` capture or group nothing.
fn check_empty_group(node: &Node, kind: &GroupKind, child: &Node, issues: &mut Vec<LintIssue>) {
    // Flag directives legitimately have no body.
    if matches!(kind, GroupKind::InlineFlags { scoped: false, .. }) {
        return;
    }
    if matches!(&child.kind, NodeKind::Sequence { children } if children.is_empty()) {
        issues.push(LintIssue::new(
            "regex.lint.group.empty",
            LintSeverity::Warning,
            format!("Group `{}` is empty", fragment(node)),
        ));
    }
}

/// `/abc/s` and `/abc/m` — flags that cannot change what the pattern
/// matches.
fn check_redundant_flags(flags: Flags, pattern: &Node, issues: &mut Vec<LintIssue>) {
    if flags.dotall && !tree_contains(pattern, &|n| matches!(n.kind, NodeKind::Dot)) {
        issues.push(
            LintIssue::new(
                "regex.lint.flags.redundant",
                LintSeverity::Style,
                "The s flag has no effect; the pattern contains no dot",
            )
            .with_hint("Remove the flag; dot-matches-newline only changes `.`"),
        );
    }
    if flags.multiline && !tree_contains(pattern, &|n| matches!(n.kind, NodeKind::Anchor { .. }))
    {
        issues.push(
            LintIssue::new(
                "regex.lint.flags.redundant",
                LintSeverity::Style,
                "The m flag has no effect; the pattern has no anchors",
            )
            .with_hint("Remove the flag; multiline only changes `^` and `$`"),
        );
    }
}

fn tree_contains(node: &Node, pred: &dyn Fn(&Node) -> bool) -> bool {
    pred(node) || node.children().iter().any(|c| tree_contains(c, pred))
}

/// `.*foo` at the start of an unanchored pattern scans the whole subject.
fn check_leading_dot_star(pattern: &Node, issues: &mut Vec<LintIssue>) {
    let first = match &pattern.kind {
        NodeKind::Sequence { children } => children.first(),
        _ => Some(pattern),
    };
    let Some(first) = first else { return };
    let NodeKind::Quantifier { node: inner, kind, .. } = &first.kind else {
        return;
    };
    if kind.is_unbounded() && matches!(inner.kind, NodeKind::Dot) {
        issues.push(
            LintIssue::new(
                "regex.lint.dot-star.leading",
                LintSeverity::Perf,
                format!("Leading `{}` forces a scan of the whole subject", fragment(first)),
            )
            .with_hint("Anchor the pattern or match the interesting part directly"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcre_parser::Parser;

    fn lint(source: &str) -> Vec<LintIssue> {
        let ast = Parser::new().parse(source).unwrap();
        Linter::new().lint(&ast)
    }

    fn ids(source: &str) -> Vec<String> {
        lint(source).into_iter().map(|i| i.id).collect()
    }

    #[test]
    fn clean_pattern_lints_clean() {
        assert!(lint("/^[a-z]+(foo|bar)$/").is_empty());
    }

    #[test]
    fn empty_alternation_branch() {
        assert!(ids("/a|/").contains(&"regex.lint.alternation.empty-branch".to_string()));
    }

    #[test]
    fn duplicate_alternation_branch() {
        assert!(ids("/a|b|a/").contains(&"regex.lint.alternation.duplicate-branch".to_string()));
    }

    #[test]
    fn nested_quantifier_is_an_error() {
        let issues = lint("/a**/");
        let issue = issues
            .iter()
            .find(|i| i.id == "regex.lint.quantifier.nested")
            .unwrap();
        assert_eq!(issue.severity, LintSeverity::Error);
    }

    #[test]
    fn possibly_empty_repeat() {
        assert!(ids("/(a?)*/").contains(&"regex.lint.quantifier.possibly-empty".to_string()));
    }

    #[test]
    fn single_char_class_has_rewrite() {
        let issues = lint("/[a]/");
        let issue = issues
            .iter()
            .find(|i| i.id == "regex.lint.class.single-char")
            .unwrap();
        assert_eq!(issue.suggested_rewrite.as_deref(), Some("a"));
    }

    #[test]
    fn duplicate_class_members() {
        assert!(ids("/[aab]/").contains(&"regex.lint.class.duplicate".to_string()));
    }

    #[test]
    fn empty_group() {
        assert!(ids("/()/").contains(&"regex.lint.group.empty".to_string()));
        // flag directives are fine
        assert!(!ids("/(?i)a/").contains(&"regex.lint.group.empty".to_string()));
    }

    #[test]
    fn redundant_flags_are_style_issues() {
        let issues = lint("/abc/s");
        let issue = issues
            .iter()
            .find(|i| i.id == "regex.lint.flags.redundant")
            .unwrap();
        assert_eq!(issue.severity, LintSeverity::Style);
        assert!(issue.message.contains("s flag"));

        assert!(ids("/abc/m").contains(&"regex.lint.flags.redundant".to_string()));
        // both flags unused at once yields one issue per flag
        assert_eq!(
            lint("/abc/ms")
                .iter()
                .filter(|i| i.id == "regex.lint.flags.redundant")
                .count(),
            2
        );
    }

    #[test]
    fn effective_flags_are_not_flagged() {
        assert!(!ids("/a.c/s").contains(&"regex.lint.flags.redundant".to_string()));
        assert!(!ids("/^a$/m").contains(&"regex.lint.flags.redundant".to_string()));
    }

    #[test]
    fn leading_dot_star_is_perf() {
        let issues = lint("/.*foo/");
        let issue = issues
            .iter()
            .find(|i| i.id == "regex.lint.dot-star.leading")
            .unwrap();
        assert_eq!(issue.severity, LintSeverity::Perf);
    }
}
