//! Sample string generation.
//!
//! Produces one deterministic string the pattern would match, used by the
//! ReDoS reporter for trigger strings and by hosts for documentation.
//! Unbounded quantifiers expand to their minimum (or one repetition for
//! `+`), subroutine calls are expanded with a recursion bound, and opaque
//! constructs (properties, named characters) fall back to `a`.

use pcre_ast::{CharTypeKind, GroupKind, Node, NodeKind, QuantifierKind, RefTarget};
use rustc_hash::FxHashMap;

use crate::sets::{class_expression_set, posix_class_set};

const MAX_SUBROUTINE_DEPTH: usize = 3;

/// Deterministic sample generator.
pub struct SampleGenerator<'a> {
    captures: FxHashMap<u32, String>,
    named: FxHashMap<String, String>,
    groups_by_index: FxHashMap<u32, &'a Node>,
    groups_by_name: FxHashMap<String, &'a Node>,
    root: Option<&'a Node>,
    depth: usize,
}

impl<'a> SampleGenerator<'a> {
    /// Create a generator for one tree.
    pub fn new() -> Self {
        SampleGenerator {
            captures: FxHashMap::default(),
            named: FxHashMap::default(),
            groups_by_index: FxHashMap::default(),
            groups_by_name: FxHashMap::default(),
            root: None,
            depth: 0,
        }
    }

    /// Generate a sample for the tree.
    pub fn generate(&mut self, node: &'a Node) -> String {
        self.root = Some(node);
        self.index_groups(node);
        self.emit(node)
    }

    fn index_groups(&mut self, node: &'a Node) {
        if let NodeKind::Group { kind, .. } = &node.kind {
            match kind {
                GroupKind::Capturing { index } => {
                    self.groups_by_index.insert(*index, node);
                }
                GroupKind::Named { name, index, .. } => {
                    self.groups_by_index.insert(*index, node);
                    self.groups_by_name.insert(name.clone(), node);
                }
                _ => {}
            }
        }
        for child in node.children() {
            self.index_groups(child);
        }
    }

    fn emit(&mut self, node: &'a Node) -> String {
        match &node.kind {
            NodeKind::Regex { pattern, .. } => self.emit(pattern),
            NodeKind::Sequence { children } => children.iter().map(|c| self.emit(c)).collect(),
            NodeKind::Alternation { alternatives } => alternatives
                .first()
                .map(|a| self.emit(a))
                .unwrap_or_default(),
            NodeKind::Group { kind, child } => {
                if kind.is_lookaround() {
                    return String::new();
                }
                let text = self.emit(child);
                match kind {
                    GroupKind::Capturing { index } => {
                        self.captures.insert(*index, text.clone());
                    }
                    GroupKind::Named { name, index, .. } => {
                        self.captures.insert(*index, text.clone());
                        self.named.insert(name.clone(), text.clone());
                    }
                    _ => {}
                }
                text
            }
            NodeKind::Quantifier { node: inner, kind, .. } => {
                let count = match kind {
                    QuantifierKind::Star | QuantifierKind::Question => 0,
                    QuantifierKind::Plus => 1,
                    QuantifierKind::Exact(n)
                    | QuantifierKind::AtLeast(n)
                    | QuantifierKind::Range(n, _) => *n as usize,
                };
                let mut out = String::new();
                for _ in 0..count.min(16) {
                    out.push_str(&self.emit(inner));
                }
                out
            }
            NodeKind::Literal { value, .. } => value.clone(),
            NodeKind::CharLiteral { code_point, .. } => {
                char::from_u32(*code_point).unwrap_or('\u{FFFD}').to_string()
            }
            NodeKind::Dot => "a".to_string(),
            NodeKind::CharType { kind } => match kind {
                CharTypeKind::Digit => "0".to_string(),
                CharTypeKind::NotDigit => "a".to_string(),
                CharTypeKind::Space => " ".to_string(),
                CharTypeKind::NotSpace => "a".to_string(),
                CharTypeKind::Word => "a".to_string(),
                CharTypeKind::NotWord => " ".to_string(),
                CharTypeKind::HorizontalSpace => " ".to_string(),
                CharTypeKind::NotHorizontalSpace => "a".to_string(),
                CharTypeKind::VerticalSpace => "\n".to_string(),
                CharTypeKind::NotVerticalSpace => "a".to_string(),
                CharTypeKind::Newline => "\n".to_string(),
            },
            NodeKind::CharClass { negated, expression } => {
                let set = class_expression_set(expression).map(|s| {
                    if *negated {
                        s.complement(pcre_charset::UNICODE_MAX)
                    } else {
                        s
                    }
                });
                set.and_then(|s| pick_printable(&s)).unwrap_or('a').to_string()
            }
            NodeKind::PosixClass { name } => posix_class_set(name)
                .and_then(|s| pick_printable(&s))
                .unwrap_or('a')
                .to_string(),
            NodeKind::Range { start, .. } => self.emit(start),
            NodeKind::ClassOperation { left, .. } => self.emit(left),
            NodeKind::Backref { target } => match target {
                RefTarget::Index(n) => self.captures.get(n).cloned().unwrap_or_default(),
                RefTarget::Name(name) => self.named.get(name).cloned().unwrap_or_default(),
                RefTarget::Relative(_) => String::new(),
            },
            NodeKind::Subroutine { target } => {
                if self.depth >= MAX_SUBROUTINE_DEPTH {
                    return String::new();
                }
                let callee = match target {
                    RefTarget::Index(0) => self.root,
                    RefTarget::Index(n) => self.groups_by_index.get(n).copied(),
                    RefTarget::Name(name) => self.groups_by_name.get(name).copied(),
                    RefTarget::Relative(_) => None,
                };
                match callee {
                    Some(callee) => {
                        self.depth += 1;
                        let out = self.emit(callee);
                        self.depth -= 1;
                        out
                    }
                    None => String::new(),
                }
            }
            NodeKind::Conditional { yes, .. } => self.emit(yes),
            NodeKind::ScriptRun { body, .. } => self.emit(body),
            NodeKind::ControlChar { ch } => {
                char::from_u32((ch.to_ascii_uppercase() as u32) ^ 0x40)
                    .unwrap_or('\0')
                    .to_string()
            }
            NodeKind::UnicodeProp { .. } => "a".to_string(),
            // Zero-width or match-control constructs contribute nothing.
            NodeKind::Anchor { .. }
            | NodeKind::Assertion { .. }
            | NodeKind::Keep
            | NodeKind::Comment { .. }
            | NodeKind::Define { .. }
            | NodeKind::VersionCondition { .. }
            | NodeKind::PcreVerb { .. }
            | NodeKind::Callout { .. }
            | NodeKind::LimitMatch { .. } => String::new(),
        }
    }
}

impl Default for SampleGenerator<'_> {
    fn default() -> Self {
        SampleGenerator::new()
    }
}

/// Prefer a printable ASCII representative; fall back to the smallest
/// member.
fn pick_printable(set: &pcre_charset::CharSet) -> Option<char> {
    for cp in 0x61..=0x7A {
        if set.contains(cp) {
            return char::from_u32(cp);
        }
    }
    for cp in 0x30..=0x39 {
        if set.contains(cp) {
            return char::from_u32(cp);
        }
    }
    set.min().and_then(char::from_u32)
}
