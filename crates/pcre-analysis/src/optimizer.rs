//! Rule-based pattern rewriter.
//!
//! Every rewrite must keep the matched language identical; the final output
//! additionally has to pass [`is_optimization_safe`], which rejects
//! rewrites that emptied the pattern, dropped anchors, shrank it
//! drastically, or changed newline semantics. Rejected rewrites fall back
//! to the original pattern with no change notes.

use pcre_ast::{
    CharTypeKind, Flags, Node, NodeKind, QuantMode, QuantifierKind, Span,
};
use pcre_charset::{digit, space, word, CharSet};
use serde::Serialize;

use crate::compiler::Compiler;
use crate::sets::{atom_char_set, class_expression_set, first_char_set};

/// Optimizer knobs.
#[derive(Debug, Clone, Copy)]
pub struct OptimizerOptions {
    /// Minimum run length before `aaaa` collapses to `a{4}`
    pub min_quantifier_count: u32,
    /// Promote greedy quantifiers to possessive when the follow set is
    /// disjoint
    pub auto_possessify: bool,
    /// Merge single-character alternations into one class
    pub merge_classes: bool,
    /// Replace verbose classes (`[0-9]`) with escapes (`\d`)
    pub modernize_classes: bool,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        OptimizerOptions {
            min_quantifier_count: 4,
            auto_possessify: true,
            merge_classes: true,
            modernize_classes: true,
        }
    }
}

/// Outcome of an optimization run.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizeResult {
    /// The resulting pattern (the original when nothing improved)
    pub pattern: String,
    /// Human-readable notes, one per applied rule
    pub changes: Vec<String>,
    /// Whether the output differs from the input
    pub optimized: bool,
}

/// Rule-based optimizer.
#[derive(Debug, Default)]
pub struct Optimizer {
    options: OptimizerOptions,
}

impl Optimizer {
    /// Optimizer with default options.
    pub fn new() -> Self {
        Optimizer::default()
    }

    /// Optimizer with explicit options.
    pub fn with_options(options: OptimizerOptions) -> Self {
        Optimizer { options }
    }

    /// Rewrite a parsed tree. The input must be a `Regex` node.
    pub fn optimize(&self, ast: &Node) -> OptimizeResult {
        let original = Compiler::new().compile(ast);
        let mut notes = Vec::new();

        let rewritten = match &ast.kind {
            NodeKind::Regex { delimiter, flags, pattern } => {
                let body = self.rewrite(pattern, *flags, &mut notes);
                let flags = self.prune_flags(*flags, &body, &mut notes);
                Node::new(
                    NodeKind::Regex {
                        delimiter: *delimiter,
                        flags,
                        pattern: Box::new(body),
                    },
                    ast.span,
                )
            }
            _ => self.rewrite(ast, Flags::default(), &mut notes),
        };

        let optimized = Compiler::new().compile(&rewritten);
        if optimized == original || !is_optimization_safe(&original, &optimized) {
            return OptimizeResult { pattern: original, changes: Vec::new(), optimized: false };
        }
        OptimizeResult { pattern: optimized, changes: notes, optimized: true }
    }

    fn rewrite(&self, node: &Node, flags: Flags, notes: &mut Vec<String>) -> Node {
        let kind = match &node.kind {
            NodeKind::Sequence { children } => {
                let children: Vec<Node> =
                    children.iter().map(|c| self.rewrite(c, flags, notes)).collect();
                let children = self.collapse_runs(children, notes);
                let children = if self.options.auto_possessify {
                    self.possessify(children, notes)
                } else {
                    children
                };
                NodeKind::Sequence { children }
            }
            NodeKind::Alternation { alternatives } => {
                let alternatives: Vec<Node> =
                    alternatives.iter().map(|a| self.rewrite(a, flags, notes)).collect();
                if self.options.merge_classes {
                    if let Some(merged) = self.merge_alternation(&alternatives, node.span) {
                        notes.push(
                            "Merged single-character alternation into a character class"
                                .to_string(),
                        );
                        return self.rewrite(&merged, flags, notes);
                    }
                }
                NodeKind::Alternation { alternatives }
            }
            NodeKind::Group { kind, child } => NodeKind::Group {
                kind: kind.clone(),
                child: Box::new(self.rewrite(child, flags, notes)),
            },
            NodeKind::Quantifier { node: inner, kind, mode } => NodeKind::Quantifier {
                node: Box::new(self.rewrite(inner, flags, notes)),
                kind: *kind,
                mode: *mode,
            },
            NodeKind::CharClass { .. } if self.options.modernize_classes => {
                match self.modernize_class(node, flags, notes) {
                    Some(kind) => kind,
                    None => node.kind.clone(),
                }
            }
            NodeKind::Conditional { condition, yes, no } => NodeKind::Conditional {
                condition: condition.clone(),
                yes: Box::new(self.rewrite(yes, flags, notes)),
                no: no.as_ref().map(|n| Box::new(self.rewrite(n, flags, notes))),
            },
            other => other.clone(),
        };
        Node::new(kind, node.span)
    }

    /// `[0-9]` → `\d` and friends. ASCII-only shorthands are skipped under
    /// `/u` where their semantics could widen.
    fn modernize_class(
        &self,
        node: &Node,
        flags: Flags,
        notes: &mut Vec<String>,
    ) -> Option<NodeKind> {
        if flags.unicode {
            return None;
        }
        let NodeKind::CharClass { negated, expression } = &node.kind else {
            return None;
        };
        let set = class_expression_set(expression)?;
        let replacement = if set == *digit() {
            Some((CharTypeKind::Digit, CharTypeKind::NotDigit, "[0-9]", "\\d"))
        } else if set == *word() {
            Some((CharTypeKind::Word, CharTypeKind::NotWord, "[a-zA-Z0-9_]", "\\w"))
        } else if set == *space() {
            Some((CharTypeKind::Space, CharTypeKind::NotSpace, "[ \\t-\\r]", "\\s"))
        } else {
            None
        };
        let (plain, complemented, from, to) = replacement?;
        let kind = if *negated { complemented } else { plain };
        notes.push(format!("Replaced {from} with {to}"));
        Some(NodeKind::CharType { kind })
    }

    /// `aaaa` → `a{4}` for runs of at least `min_quantifier_count` equal
    /// atoms.
    fn collapse_runs(&self, children: Vec<Node>, notes: &mut Vec<String>) -> Vec<Node> {
        let min = self.options.min_quantifier_count.max(2) as usize;
        let mut out: Vec<Node> = Vec::with_capacity(children.len());
        let mut i = 0;
        while i < children.len() {
            let current = &children[i];
            if !is_repeatable_atom(current) {
                out.push(current.clone());
                i += 1;
                continue;
            }
            let fragment = Compiler::new().compile(current);
            let mut run = 1;
            while i + run < children.len()
                && Compiler::new().compile(&children[i + run]) == fragment
            {
                run += 1;
            }
            if run >= min {
                let span = current.span.cover(children[i + run - 1].span);
                notes.push(format!("Collapsed run of {run} `{fragment}` into `{fragment}{{{run}}}`"));
                out.push(Node::new(
                    NodeKind::Quantifier {
                        node: Box::new(current.clone()),
                        kind: QuantifierKind::Exact(run as u32),
                        mode: QuantMode::Greedy,
                    },
                    span,
                ));
            } else {
                for node in &children[i..i + run] {
                    out.push(node.clone());
                }
            }
            i += run;
        }
        out
    }

    /// `a+b` → `a++b` when `a` and the follow atom cannot share a first
    /// character, so backtracking into the quantifier can never help.
    fn possessify(&self, mut children: Vec<Node>, notes: &mut Vec<String>) -> Vec<Node> {
        for i in 0..children.len().saturating_sub(1) {
            let follow = match first_char_set(&children[i + 1]) {
                Some(set) if !set.is_empty() => set,
                _ => continue,
            };
            let (inner, kind) = match &children[i].kind {
                NodeKind::Quantifier { node, kind, mode: QuantMode::Greedy } => {
                    (node.clone(), *kind)
                }
                _ => continue,
            };
            let Some(atom_set) = atom_char_set(&inner) else { continue };
            if atom_set.intersects(&follow) {
                continue;
            }
            let fragment = Compiler::new().compile(&children[i]);
            notes.push(format!("Made `{fragment}` possessive; it cannot overlap what follows"));
            let span = children[i].span;
            children[i] = Node::new(
                NodeKind::Quantifier { node: inner, kind, mode: QuantMode::Possessive },
                span,
            );
        }
        children
    }

    /// `a|b|c` → `[abc]` when every branch is one character wide.
    fn merge_alternation(&self, alternatives: &[Node], span: Span) -> Option<Node> {
        let mut set = CharSet::empty();
        for alt in alternatives {
            let atom = atom_char_set(alt)?;
            // Negated or huge branches would explode the class; keep those.
            if atom.len() > 128 {
                return None;
            }
            set = set.union(&atom);
        }
        let mut items = Vec::new();
        for &(lo, hi) in set.ranges() {
            let start = char_node(lo, span)?;
            if lo == hi {
                items.push(start);
            } else {
                let end = char_node(hi, span)?;
                items.push(Node::new(
                    NodeKind::Range { start: Box::new(start), end: Box::new(end) },
                    span,
                ));
            }
        }
        let expression = Node::new(NodeKind::Sequence { children: items }, span);
        Some(Node::new(
            NodeKind::CharClass { negated: false, expression: Box::new(expression) },
            span,
        ))
    }

    /// Drop flags with no effect: `/s` without a dot, `/m` without anchors.
    fn prune_flags(&self, mut flags: Flags, body: &Node, notes: &mut Vec<String>) -> Flags {
        if flags.dotall && !tree_contains(body, &|n| matches!(n.kind, NodeKind::Dot)) {
            flags.dotall = false;
            notes.push("Removed the s flag; the pattern has no dot".to_string());
        }
        if flags.multiline && !tree_contains(body, &|n| matches!(n.kind, NodeKind::Anchor { .. }))
        {
            flags.multiline = false;
            notes.push("Removed the m flag; the pattern has no anchors".to_string());
        }
        flags
    }
}

fn is_repeatable_atom(node: &Node) -> bool {
    matches!(
        node.kind,
        NodeKind::Literal { .. }
            | NodeKind::CharLiteral { .. }
            | NodeKind::Dot
            | NodeKind::CharType { .. }
            | NodeKind::CharClass { .. }
    )
}

fn char_node(cp: u32, span: Span) -> Option<Node> {
    let ch = char::from_u32(cp)?;
    Some(Node::new(NodeKind::Literal { value: ch.to_string(), is_raw: false }, span))
}

fn tree_contains(node: &Node, pred: &dyn Fn(&Node) -> bool) -> bool {
    pred(node) || node.children().iter().any(|c| tree_contains(c, pred))
}

/// Safeguard applied to every `(original, optimized)` pair before the
/// rewrite is reported.
pub fn is_optimization_safe(original: &str, optimized: &str) -> bool {
    let Some((orig_body, orig_flags)) = split_body(original) else {
        return false;
    };
    let Some((opt_body, opt_flags)) = split_body(optimized) else {
        return false;
    };
    // An optimization may never produce an effectively empty pattern.
    if opt_body.is_empty() && !orig_body.is_empty() {
        return false;
    }
    // Drastic shrink is a sign the rewrite dropped semantics.
    if opt_body.len() * 5 < orig_body.len() {
        return false;
    }
    // Anchors must survive.
    if orig_body.starts_with('^') && !opt_body.starts_with('^') {
        return false;
    }
    if orig_body.ends_with('$') && !orig_body.ends_with("\\$") && !opt_body.ends_with('$') {
        return false;
    }
    // Removing /s while a dot remains changes what the dot matches.
    if orig_flags.contains('s') && !opt_flags.contains('s') && opt_body.contains('.') {
        return false;
    }
    true
}

fn split_body(pattern: &str) -> Option<(&str, &str)> {
    let open = pattern.chars().next()?;
    let close = match open {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        '<' => '>',
        other => other,
    };
    let rest = &pattern[open.len_utf8()..];
    let idx = rest.rfind(close)?;
    Some((&rest[..idx], &rest[idx + close.len_utf8()..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcre_parser::Parser;

    fn optimize(source: &str) -> OptimizeResult {
        let ast = Parser::new().parse(source).unwrap();
        Optimizer::new().optimize(&ast)
    }

    #[test]
    fn digit_class_modernizes() {
        let result = optimize("/[0-9]+/");
        assert_eq!(result.pattern, r"/\d+/");
        assert!(result.changes.iter().any(|c| c.contains("\\d")));
    }

    #[test]
    fn digit_class_is_kept_under_unicode_flag() {
        let result = optimize("/[0-9]+/u");
        assert_eq!(result.pattern, "/[0-9]+/u");
        assert!(!result.optimized);
    }

    #[test]
    fn literal_runs_collapse() {
        let result = optimize("/aaaa/");
        assert_eq!(result.pattern, "/a{4}/");
    }

    #[test]
    fn short_runs_stay() {
        let result = optimize("/aaa/");
        assert_eq!(result.pattern, "/aaa/");
        assert!(!result.optimized);
    }

    #[test]
    fn auto_possessify_on_disjoint_follow() {
        let result = optimize(r"/\d+x/");
        assert_eq!(result.pattern, r"/\d++x/");
    }

    #[test]
    fn no_possessify_on_overlap() {
        let result = optimize(r"/\w+x/");
        // x is a word character; backtracking matters
        assert_eq!(result.pattern, r"/\w+x/");
    }

    #[test]
    fn single_char_alternation_merges() {
        let result = optimize("/a|b|c/");
        assert_eq!(result.pattern, "/[a-c]/");
    }

    #[test]
    fn unused_dotall_flag_is_dropped() {
        let result = optimize("/abc/s");
        assert_eq!(result.pattern, "/abc/");
    }

    #[test]
    fn dotall_stays_while_dot_present() {
        let result = optimize("/a.c/s");
        assert_eq!(result.pattern, "/a.c/s");
    }

    #[test]
    fn safety_rejects_effectively_empty_rewrites() {
        assert!(!is_optimization_safe("/abc/", "##"));
        assert!(!is_optimization_safe("/abc/", "//"));
        assert!(is_optimization_safe("/[0-9]+/", r"/\d+/"));
    }

    #[test]
    fn safety_rejects_broken_anchors() {
        assert!(!is_optimization_safe("/^abcdef$/", "/abcdef/"));
        assert!(is_optimization_safe("/^abc$/", "/^ab{1}c$/"));
    }

    #[test]
    fn safety_rejects_drastic_shrink() {
        assert!(!is_optimization_safe("/abcdefghijklmnopqrstuvwxyz/", "/ab/"));
    }

    #[test]
    fn safety_rejects_lost_newline_semantics() {
        assert!(!is_optimization_safe("/a.c/s", "/a.c/"));
    }
}
