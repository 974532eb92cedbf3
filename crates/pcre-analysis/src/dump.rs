//! Diffable tree dump and Mermaid graph rendering.

use pcre_ast::{AstVisitor, CalloutId, GroupKind, Node, NodeKind};

/// Short label + detail used by both renderers.
fn describe(node: &Node) -> (&'static str, String) {
    match &node.kind {
        NodeKind::Regex { delimiter, flags, .. } => {
            ("Regex", format!("delimiter='{delimiter}' flags='{flags}'"))
        }
        NodeKind::Sequence { children } => ("Sequence", format!("{} children", children.len())),
        NodeKind::Alternation { alternatives } => {
            ("Alternation", format!("{} branches", alternatives.len()))
        }
        NodeKind::Group { kind, .. } => {
            let detail = match kind {
                GroupKind::Capturing { index } => format!("capturing #{index}"),
                GroupKind::NonCapturing => "non-capturing".to_string(),
                GroupKind::Named { name, index, .. } => format!("named '{name}' #{index}"),
                GroupKind::LookaheadPositive => "lookahead".to_string(),
                GroupKind::LookaheadNegative => "negative lookahead".to_string(),
                GroupKind::LookbehindPositive => "lookbehind".to_string(),
                GroupKind::LookbehindNegative => "negative lookbehind".to_string(),
                GroupKind::Atomic => "atomic".to_string(),
                GroupKind::BranchReset => "branch-reset".to_string(),
                GroupKind::InlineFlags { on, off, scoped } => {
                    format!("flags on='{on}' off='{off}' scoped={scoped}")
                }
            };
            ("Group", detail)
        }
        NodeKind::Quantifier { kind, mode, .. } => {
            ("Quantifier", format!("{kind:?} {mode:?}"))
        }
        NodeKind::Literal { value, is_raw } => {
            ("Literal", if *is_raw { format!("{value:?} raw") } else { format!("{value:?}") })
        }
        NodeKind::CharLiteral { code_point, kind, .. } => {
            ("CharLiteral", format!("U+{code_point:04X} {kind:?}"))
        }
        NodeKind::Dot => ("Dot", String::new()),
        NodeKind::Anchor { kind } => ("Anchor", format!("{kind:?}")),
        NodeKind::Assertion { kind } => ("Assertion", format!("{kind:?}")),
        NodeKind::CharType { kind } => ("CharType", format!("\\{}", kind.letter())),
        NodeKind::UnicodeProp { prop, .. } => ("UnicodeProp", prop.clone()),
        NodeKind::PosixClass { name } => ("PosixClass", name.clone()),
        NodeKind::CharClass { negated, .. } => {
            ("CharClass", if *negated { "negated".to_string() } else { String::new() })
        }
        NodeKind::Range { .. } => ("Range", String::new()),
        NodeKind::ClassOperation { op, .. } => ("ClassOperation", format!("{op:?}")),
        NodeKind::Backref { target } => ("Backref", format!("{target}")),
        NodeKind::ControlChar { ch } => ("ControlChar", format!("{ch}")),
        NodeKind::Keep => ("Keep", String::new()),
        NodeKind::Comment { text } => ("Comment", format!("{text:?}")),
        NodeKind::Conditional { no, .. } => {
            ("Conditional", if no.is_some() { "yes/no".to_string() } else { "yes".to_string() })
        }
        NodeKind::Define { .. } => ("Define", String::new()),
        NodeKind::Subroutine { target } => ("Subroutine", format!("{target}")),
        NodeKind::ScriptRun { script, .. } => ("ScriptRun", script.clone()),
        NodeKind::VersionCondition { version, .. } => ("VersionCondition", version.clone()),
        NodeKind::PcreVerb { verb, arg } => {
            ("PcreVerb", arg.as_ref().map(|a| format!("{verb}:{a}")).unwrap_or(verb.clone()))
        }
        NodeKind::Callout { id, .. } => (
            "Callout",
            match id {
                CalloutId::Number(n) => format!("#{n}"),
                CalloutId::Tag(tag) => format!("'{tag}'"),
            },
        ),
        NodeKind::LimitMatch { limit } => ("LimitMatch", format!("{limit}")),
    }
}

/// Indented tree dump, stable across runs, with byte spans for diffing.
#[derive(Debug, Default)]
pub struct Dumper {
    depth: usize,
}

impl Dumper {
    /// Create a dumper.
    pub fn new() -> Self {
        Dumper::default()
    }

    /// Dump a tree.
    pub fn dump(&mut self, node: &Node) -> String {
        self.visit(node)
    }
}

impl AstVisitor for Dumper {
    type Output = String;

    fn visit(&mut self, node: &Node) -> String {
        let (label, detail) = describe(node);
        let detail = if detail.is_empty() { String::new() } else { format!(" {detail}") };
        let mut out = format!(
            "{}{label}{detail} [{}..{})\n",
            "  ".repeat(self.depth),
            node.span.start,
            node.span.end
        );
        self.depth += 1;
        for child in node.children() {
            out.push_str(&self.visit(child));
        }
        self.depth -= 1;
        out
    }
}

/// Mermaid `graph TD` rendering with stable pre-order node ids.
#[derive(Debug, Default)]
pub struct MermaidRenderer {
    next_id: usize,
}

impl MermaidRenderer {
    /// Create a renderer.
    pub fn new() -> Self {
        MermaidRenderer::default()
    }

    /// Render a tree as a Mermaid directed graph.
    pub fn render(&mut self, node: &Node) -> String {
        let mut out = String::from("graph TD\n");
        self.emit(node, None, &mut out);
        out
    }

    fn emit(&mut self, node: &Node, parent: Option<usize>, out: &mut String) {
        let id = self.next_id;
        self.next_id += 1;
        let (label, detail) = describe(node);
        let text = if detail.is_empty() {
            label.to_string()
        } else {
            format!("{label}: {}", detail.replace('"', "'"))
        };
        out.push_str(&format!("    n{id}[\"{text}\"]\n"));
        if let Some(parent) = parent {
            out.push_str(&format!("    n{parent} --> n{id}\n"));
        }
        for child in node.children() {
            self.emit(child, Some(id), out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcre_parser::Parser;

    #[test]
    fn dump_is_indented_and_spanned() {
        let ast = Parser::new().parse("/a+/").unwrap();
        let dump = Dumper::new().dump(&ast);
        let lines: Vec<&str> = dump.lines().collect();
        assert!(lines[0].starts_with("Regex"));
        assert!(lines[1].starts_with("  Quantifier"));
        assert!(lines[2].starts_with("    Literal \"a\" [1..2)"));
    }

    #[test]
    fn mermaid_ids_are_stable_per_parse() {
        let ast = Parser::new().parse("/a|b/").unwrap();
        let first = MermaidRenderer::new().render(&ast);
        let second = MermaidRenderer::new().render(&ast);
        assert_eq!(first, second);
        assert!(first.starts_with("graph TD\n"));
        assert!(first.contains("n0 --> n1"));
    }
}
