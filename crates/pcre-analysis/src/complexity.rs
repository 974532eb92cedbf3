//! Structural complexity scoring.

use pcre_ast::{Node, NodeKind};
use serde::Serialize;

/// Weighted complexity breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComplexityScore {
    /// Total weighted score
    pub score: u32,
    /// Total node count
    pub nodes: u32,
    /// Quantifier count
    pub quantifiers: u32,
    /// Unbounded quantifier count
    pub unbounded_quantifiers: u32,
    /// Deepest quantifier nesting
    pub quantifier_depth: u32,
    /// Alternation branch count
    pub alternation_branches: u32,
    /// Lookaround count
    pub lookarounds: u32,
    /// Backreference count
    pub backrefs: u32,
    /// Conditional and recursion construct count
    pub conditionals: u32,
}

/// Compute a complexity score for a tree.
pub fn score(node: &Node) -> ComplexityScore {
    let mut out = ComplexityScore::default();
    walk(node, 0, &mut out);
    out.score = out.nodes / 4
        + out.quantifiers * 2
        + out.unbounded_quantifiers
        + out.quantifier_depth * 3
        + out.alternation_branches
        + out.lookarounds * 3
        + out.backrefs * 4
        + out.conditionals * 4;
    out
}

fn walk(node: &Node, quant_depth: u32, out: &mut ComplexityScore) {
    out.nodes += 1;
    let mut next_depth = quant_depth;
    match &node.kind {
        NodeKind::Quantifier { kind, .. } => {
            out.quantifiers += 1;
            if kind.is_unbounded() {
                out.unbounded_quantifiers += 1;
                next_depth = quant_depth + 1;
                out.quantifier_depth = out.quantifier_depth.max(next_depth);
            }
        }
        NodeKind::Alternation { alternatives } => {
            out.alternation_branches += alternatives.len() as u32;
        }
        NodeKind::Group { kind, .. } if kind.is_lookaround() => out.lookarounds += 1,
        NodeKind::Backref { .. } => out.backrefs += 1,
        NodeKind::Conditional { .. } | NodeKind::Subroutine { .. } => out.conditionals += 1,
        _ => {}
    }
    for child in node.children() {
        walk(child, next_depth, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcre_parser::Parser;

    fn complexity(source: &str) -> ComplexityScore {
        let ast = Parser::new().parse(source).unwrap();
        score(&ast)
    }

    #[test]
    fn trivial_pattern_scores_low() {
        let plain = complexity("/abc/");
        assert!(plain.score < 5, "got {}", plain.score);
    }

    #[test]
    fn nested_unbounded_quantifiers_raise_depth() {
        let nested = complexity("/(a+)+/");
        assert_eq!(nested.quantifier_depth, 2);
        assert!(nested.score > complexity("/a+/").score);
    }

    #[test]
    fn lookarounds_and_backrefs_count() {
        let c = complexity(r"/(?=a)(b)\1/");
        assert_eq!(c.lookarounds, 1);
        assert_eq!(c.backrefs, 1);
    }

    #[test]
    fn score_is_monotone_in_structure() {
        assert!(complexity("/(a|b)+c?/").score > complexity("/abc/").score);
    }
}
