//! Required-literal extraction.
//!
//! Finds text every match must contain: the fixed prefix and the literal
//! runs that are unconditionally required. Hosts use these for prefiltering
//! before running the real engine.

use pcre_ast::{Node, NodeKind, QuantifierKind};
use serde::Serialize;

/// Literals every match must contain.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Literals {
    /// Fixed prefix of every match (may be empty)
    pub prefix: String,
    /// Literal substrings (length >= 2) required by every match
    pub required: Vec<String>,
}

/// Extract required literals from a tree.
pub fn extract(node: &Node) -> Literals {
    let mut out = Literals { prefix: prefix_of(node), ..Default::default() };
    let mut run = String::new();
    collect_required(node, &mut run, &mut out.required);
    flush_run(&mut run, &mut out.required);
    out.required.sort();
    out.required.dedup();
    out
}

fn fixed_text(node: &Node) -> Option<String> {
    match &node.kind {
        NodeKind::Literal { value, .. } => Some(value.clone()),
        NodeKind::CharLiteral { code_point, .. } => {
            char::from_u32(*code_point).map(|c| c.to_string())
        }
        _ => None,
    }
}

fn prefix_of(node: &Node) -> String {
    match &node.kind {
        NodeKind::Regex { pattern, .. } => prefix_of(pattern),
        NodeKind::Sequence { children } => {
            let mut out = String::new();
            for child in children {
                match &child.kind {
                    NodeKind::Anchor { .. } | NodeKind::Assertion { .. } | NodeKind::Comment { .. } => {
                        continue
                    }
                    _ => {}
                }
                if let Some(text) = fixed_text(child) {
                    out.push_str(&text);
                    continue;
                }
                // A required group extends the prefix; anything else ends it.
                if let NodeKind::Group { kind, child: inner } = &child.kind {
                    if !kind.is_lookaround() {
                        out.push_str(&prefix_of(inner));
                    }
                }
                break;
            }
            out
        }
        NodeKind::Alternation { alternatives } => {
            let prefixes: Vec<String> = alternatives.iter().map(prefix_of).collect();
            common_prefix(&prefixes)
        }
        NodeKind::Group { kind, child } if !kind.is_lookaround() => prefix_of(child),
        NodeKind::Quantifier { node, kind, .. } if kind.min() >= 1 => prefix_of(node),
        _ => fixed_text(node).unwrap_or_default(),
    }
}

fn common_prefix(strings: &[String]) -> String {
    let Some(first) = strings.first() else {
        return String::new();
    };
    let mut len = first.len();
    for s in &strings[1..] {
        len = len.min(
            first
                .bytes()
                .zip(s.bytes())
                .take_while(|(a, b)| a == b)
                .count(),
        );
    }
    while !first.is_char_boundary(len) {
        len -= 1;
    }
    first[..len].to_string()
}

fn flush_run(run: &mut String, required: &mut Vec<String>) {
    if run.chars().count() >= 2 {
        required.push(std::mem::take(run));
    } else {
        run.clear();
    }
}

/// Walk positions that every match must pass through, accumulating literal
/// runs. Alternations and optional quantifiers end the current run.
fn collect_required(node: &Node, run: &mut String, required: &mut Vec<String>) {
    match &node.kind {
        NodeKind::Regex { pattern, .. } => collect_required(pattern, run, required),
        NodeKind::Sequence { children } => {
            for child in children {
                collect_required(child, run, required);
            }
        }
        NodeKind::Group { kind, child } if !kind.is_lookaround() => {
            collect_required(child, run, required);
        }
        NodeKind::Quantifier { node: inner, kind, .. } => {
            if let QuantifierKind::Exact(n) = kind {
                // A fixed repeat of a fixed char extends the run.
                if let Some(text) = fixed_text(inner) {
                    for _ in 0..(*n).min(64) {
                        run.push_str(&text);
                    }
                    return;
                }
            }
            if kind.min() >= 1 {
                flush_run(run, required);
                collect_required(inner, run, required);
            }
            flush_run(run, required);
        }
        NodeKind::Group { .. }
        | NodeKind::Anchor { .. }
        | NodeKind::Assertion { .. }
        | NodeKind::Comment { .. }
        | NodeKind::Keep => {}
        _ => match fixed_text(node) {
            Some(text) => run.push_str(&text),
            None => flush_run(run, required),
        },
    }
}
