//! Visitor dispatch seam.

use crate::ast::Node;

/// A traversal over the AST producing one value per node.
///
/// Implementations `match` exhaustively on [`crate::NodeKind`]; the closed
/// sum turns a forgotten construct into a compile error instead of a
/// runtime panic. Traversal state (quantifier depth, color stacks) lives on
/// the visitor itself, never on nodes.
pub trait AstVisitor {
    /// Result type of visiting one node.
    type Output;

    /// Visit a node, recursing as the pass requires.
    fn visit(&mut self, node: &Node) -> Self::Output;
}
