//! Pattern shape metrics.

use pcre_ast::{Node, NodeKind};
use serde::Serialize;

/// Counts and dimensions of a parsed pattern.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    /// Total AST nodes
    pub node_count: u32,
    /// Literal atoms
    pub literal_count: u32,
    /// Groups of any flavor
    pub group_count: u32,
    /// Capturing groups only
    pub capture_count: u32,
    /// Character classes
    pub class_count: u32,
    /// Quantifiers
    pub quantifier_count: u32,
    /// Alternations
    pub alternation_count: u32,
    /// Lookarounds
    pub lookaround_count: u32,
    /// Deepest nesting level
    pub max_depth: u32,
    /// Source length in bytes (span of the root node)
    pub pattern_length: u32,
}

/// Measure a tree.
pub fn measure(node: &Node) -> Metrics {
    let mut metrics = Metrics { pattern_length: node.span.len() as u32, ..Default::default() };
    walk(node, 1, &mut metrics);
    metrics
}

fn walk(node: &Node, depth: u32, metrics: &mut Metrics) {
    metrics.node_count += 1;
    metrics.max_depth = metrics.max_depth.max(depth);
    match &node.kind {
        NodeKind::Literal { .. } | NodeKind::CharLiteral { .. } => metrics.literal_count += 1,
        NodeKind::Group { kind, .. } => {
            metrics.group_count += 1;
            if kind.is_capturing() {
                metrics.capture_count += 1;
            }
            if kind.is_lookaround() {
                metrics.lookaround_count += 1;
            }
        }
        NodeKind::CharClass { .. } => metrics.class_count += 1,
        NodeKind::Quantifier { .. } => metrics.quantifier_count += 1,
        NodeKind::Alternation { .. } => metrics.alternation_count += 1,
        _ => {}
    }
    for child in node.children() {
        walk(child, depth + 1, metrics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcre_parser::Parser;

    #[test]
    fn counts_match_structure() {
        let ast = Parser::new().parse("/(a|b)+[c-d](?=e)/").unwrap();
        let m = measure(&ast);
        assert_eq!(m.group_count, 2);
        assert_eq!(m.capture_count, 1);
        assert_eq!(m.lookaround_count, 1);
        assert_eq!(m.class_count, 1);
        assert_eq!(m.quantifier_count, 1);
        assert_eq!(m.alternation_count, 1);
        assert!(m.max_depth >= 4);
        assert_eq!(m.pattern_length, 18);
    }

    #[test]
    fn empty_pattern_is_two_nodes() {
        let ast = Parser::new().parse("//").unwrap();
        let m = measure(&ast);
        assert_eq!(m.node_count, 2); // Regex + empty Sequence
    }
}
