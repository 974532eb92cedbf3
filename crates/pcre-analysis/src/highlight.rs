//! ANSI syntax highlighting for patterns.
//!
//! Re-renders the pattern with terminal styling. Group colors cycle with
//! nesting depth; the active color lives on a stack on the visitor so
//! closing a group restores the enclosing style.

use pcre_ast::{AstVisitor, GroupKind, Node, NodeKind};

use crate::compiler::Compiler;

/// ANSI styles for each token family.
#[derive(Debug, Clone)]
pub struct HighlightTheme {
    /// Styles cycled by group nesting depth
    pub group_colors: Vec<&'static str>,
    /// Quantifiers, alternation, anchors, dot
    pub meta: &'static str,
    /// Character classes
    pub class: &'static str,
    /// Escapes: char types, assertions, properties, references
    pub escape: &'static str,
    /// Comments and verbs
    pub comment: &'static str,
    /// Reset sequence
    pub reset: &'static str,
}

impl Default for HighlightTheme {
    fn default() -> Self {
        HighlightTheme {
            group_colors: vec!["\x1b[33m", "\x1b[35m", "\x1b[36m"],
            meta: "\x1b[31m",
            class: "\x1b[32m",
            escape: "\x1b[34m",
            comment: "\x1b[90m",
            reset: "\x1b[0m",
        }
    }
}

/// Pattern highlighter.
pub struct Highlighter {
    theme: HighlightTheme,
    color_stack: Vec<&'static str>,
}

impl Default for Highlighter {
    fn default() -> Self {
        Highlighter { theme: HighlightTheme::default(), color_stack: Vec::new() }
    }
}

impl Highlighter {
    /// Highlighter with the default theme.
    pub fn new() -> Self {
        Highlighter::default()
    }

    /// Highlighter with a custom theme.
    pub fn with_theme(theme: HighlightTheme) -> Self {
        Highlighter { theme, color_stack: Vec::new() }
    }

    /// Render a tree with ANSI styling.
    pub fn highlight(&mut self, node: &Node) -> String {
        self.visit(node)
    }

    fn styled(&self, style: &str, text: &str) -> String {
        format!("{style}{text}{}", self.current_color())
    }

    fn current_color(&self) -> &'static str {
        self.color_stack.last().copied().unwrap_or(self.theme.reset)
    }

    fn plain(&mut self, node: &Node) -> String {
        Compiler::new().compile(node)
    }
}

impl AstVisitor for Highlighter {
    type Output = String;

    fn visit(&mut self, node: &Node) -> String {
        match &node.kind {
            NodeKind::Regex { delimiter, flags, pattern } => {
                let close = match delimiter {
                    '(' => ')',
                    '[' => ']',
                    '{' => '}',
                    '<' => '>',
                    other => *other,
                };
                let body = self.visit(pattern);
                let meta = self.theme.meta;
                let reset = self.theme.reset;
                format!("{meta}{delimiter}{reset}{body}{meta}{close}{flags}{reset}")
            }
            NodeKind::Sequence { children } => children.iter().map(|c| self.visit(c)).collect(),
            NodeKind::Alternation { alternatives } => {
                let sep = self.styled(self.theme.meta, "|");
                alternatives
                    .iter()
                    .map(|a| self.visit(a))
                    .collect::<Vec<_>>()
                    .join(&sep)
            }
            NodeKind::Group { kind, child } => {
                let color = self.theme.group_colors
                    [self.color_stack.len() % self.theme.group_colors.len()];
                self.color_stack.push(color);
                let prefix_node = Node::new(
                    NodeKind::Group {
                        kind: kind.clone(),
                        child: Box::new(Node::new(
                            NodeKind::Sequence { children: Vec::new() },
                            node.span,
                        )),
                    },
                    node.span,
                );
                // Render "(prefix)" then split to color the punctuation only.
                let shell = self.plain(&prefix_node);
                let open = &shell[..shell.len() - 1];
                let inner = if matches!(kind, GroupKind::InlineFlags { scoped: false, .. }) {
                    String::new()
                } else {
                    self.visit(child)
                };
                self.color_stack.pop();
                let reset = self.theme.reset;
                let outer = self.current_color();
                format!("{color}{open}{reset}{inner}{color}){outer}")
            }
            NodeKind::Quantifier { node: inner, .. } => {
                let body = self.visit(inner);
                let full = self.plain(node);
                let inner_plain = self.plain(inner);
                let suffix = &full[inner_plain.len()..];
                format!("{body}{}", self.styled(self.theme.meta, suffix))
            }
            NodeKind::Dot | NodeKind::Anchor { .. } => {
                let text = self.plain(node);
                self.styled(self.theme.meta, &text)
            }
            NodeKind::CharClass { .. } | NodeKind::PosixClass { .. } => {
                let text = self.plain(node);
                self.styled(self.theme.class, &text)
            }
            NodeKind::Comment { .. } | NodeKind::PcreVerb { .. } | NodeKind::LimitMatch { .. } => {
                let text = self.plain(node);
                self.styled(self.theme.comment, &text)
            }
            NodeKind::Assertion { .. }
            | NodeKind::CharType { .. }
            | NodeKind::UnicodeProp { .. }
            | NodeKind::Backref { .. }
            | NodeKind::Subroutine { .. }
            | NodeKind::CharLiteral { .. }
            | NodeKind::ControlChar { .. }
            | NodeKind::Keep => {
                let text = self.plain(node);
                self.styled(self.theme.escape, &text)
            }
            _ => self.plain(node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcre_parser::Parser;

    #[test]
    fn output_contains_styled_segments_and_reset() {
        let ast = Parser::new().parse("/(a|b)+/").unwrap();
        let out = Highlighter::new().highlight(&ast);
        assert!(out.contains("\x1b[33m(")); // group color
        assert!(out.contains("\x1b[0m"));
        assert!(out.contains('a') && out.contains('b'));
    }

    #[test]
    fn nested_groups_cycle_colors() {
        let ast = Parser::new().parse("/((a))/").unwrap();
        let out = Highlighter::new().highlight(&ast);
        assert!(out.contains("\x1b[33m("));
        assert!(out.contains("\x1b[35m("));
    }
}
