//! Character-set approximations for AST atoms.
//!
//! Several passes (auto-possessify, ReDoS overlap checks) need to know
//! which code points an atom can start with. These helpers compute that as
//! a [`CharSet`]; `None` means the atom is too complex to approximate and
//! callers must assume overlap.

use pcre_ast::{CharTypeKind, ClassOp, Node, NodeKind};
use pcre_charset::{
    digit, horizontal_space, newline, space, vertical_space, word, CharSet, UNICODE_MAX,
};

/// The set behind a `\d`-family escape.
pub fn char_type_set(kind: CharTypeKind) -> CharSet {
    match kind {
        CharTypeKind::Digit => digit().clone(),
        CharTypeKind::NotDigit => digit().complement(UNICODE_MAX),
        CharTypeKind::Space => space().clone(),
        CharTypeKind::NotSpace => space().complement(UNICODE_MAX),
        CharTypeKind::Word => word().clone(),
        CharTypeKind::NotWord => word().complement(UNICODE_MAX),
        CharTypeKind::HorizontalSpace => horizontal_space().clone(),
        CharTypeKind::NotHorizontalSpace => horizontal_space().complement(UNICODE_MAX),
        CharTypeKind::VerticalSpace => vertical_space().clone(),
        CharTypeKind::NotVerticalSpace => vertical_space().complement(UNICODE_MAX),
        CharTypeKind::Newline => newline().clone(),
    }
}

/// The set behind a POSIX class name (ASCII semantics). Negated names carry
/// a leading `^`.
pub fn posix_class_set(name: &str) -> Option<CharSet> {
    let (negated, bare) = match name.strip_prefix('^') {
        Some(stripped) => (true, stripped),
        None => (false, name),
    };
    let set = match bare {
        "alnum" => CharSet::from_ranges([(0x30, 0x39), (0x41, 0x5A), (0x61, 0x7A)]),
        "alpha" => CharSet::from_ranges([(0x41, 0x5A), (0x61, 0x7A)]),
        "ascii" => CharSet::from_range(0x00, 0x7F),
        "blank" => CharSet::from_ranges([(0x09, 0x09), (0x20, 0x20)]),
        "cntrl" => CharSet::from_ranges([(0x00, 0x1F), (0x7F, 0x7F)]),
        "digit" => digit().clone(),
        "graph" => CharSet::from_range(0x21, 0x7E),
        "lower" => CharSet::from_range(0x61, 0x7A),
        "print" => CharSet::from_range(0x20, 0x7E),
        "punct" => CharSet::from_ranges([
            (0x21, 0x2F),
            (0x3A, 0x40),
            (0x5B, 0x60),
            (0x7B, 0x7E),
        ]),
        "space" => CharSet::from_ranges([(0x09, 0x0D), (0x20, 0x20)]),
        "upper" => CharSet::from_range(0x41, 0x5A),
        "word" => word().clone(),
        "xdigit" => CharSet::from_ranges([(0x30, 0x39), (0x41, 0x46), (0x61, 0x66)]),
        _ => return None,
    };
    Some(if negated { set.complement(UNICODE_MAX) } else { set })
}

/// The exact set an atom matches, when it is a pure character atom.
pub fn atom_char_set(node: &Node) -> Option<CharSet> {
    match &node.kind {
        NodeKind::Literal { value, .. } => {
            let mut chars = value.chars();
            let first = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            Some(CharSet::from_char(first as u32))
        }
        NodeKind::CharLiteral { code_point, .. } => Some(CharSet::from_char(*code_point)),
        NodeKind::ControlChar { ch } => {
            Some(CharSet::from_char((ch.to_ascii_uppercase() as u32) ^ 0x40))
        }
        NodeKind::Dot => Some(CharSet::from_char(b'\n' as u32).complement(UNICODE_MAX)),
        NodeKind::CharType { kind } => Some(char_type_set(*kind)),
        NodeKind::PosixClass { name } => posix_class_set(name),
        NodeKind::CharClass { negated, expression } => {
            let inner = class_expression_set(expression)?;
            Some(if *negated { inner.complement(UNICODE_MAX) } else { inner })
        }
        NodeKind::Range { start, end } => {
            let lo = atom_char_set(start)?.min()?;
            let hi = atom_char_set(end)?.min()?;
            Some(CharSet::from_range(lo, hi))
        }
        _ => None,
    }
}

/// The set matched by a class interior tree.
pub fn class_expression_set(node: &Node) -> Option<CharSet> {
    match &node.kind {
        NodeKind::Sequence { children } => {
            let mut out = CharSet::empty();
            for child in children {
                out = out.union(&class_item_set(child)?);
            }
            Some(out)
        }
        NodeKind::ClassOperation { op, left, right } => {
            let left = class_expression_set(left)?;
            let right = class_expression_set(right)?;
            Some(match op {
                ClassOp::Intersection => left.intersect(&right),
                ClassOp::Subtraction => left.subtract(&right),
            })
        }
        _ => class_item_set(node),
    }
}

fn class_item_set(node: &Node) -> Option<CharSet> {
    match &node.kind {
        // A raw or multi-char literal in a class is the set of its chars.
        NodeKind::Literal { value, .. } => {
            Some(CharSet::from_chars(value.chars()))
        }
        _ => atom_char_set(node),
    }
}

/// The set of code points a subtree's match can start with. `None` when the
/// construct needs more context than a set (references, lookarounds,
/// opaque properties).
pub fn first_char_set(node: &Node) -> Option<CharSet> {
    match &node.kind {
        NodeKind::Sequence { children } => {
            let mut out = CharSet::empty();
            for child in children {
                match &child.kind {
                    // Zero-width constructs do not constrain the first char.
                    NodeKind::Anchor { .. }
                    | NodeKind::Assertion { .. }
                    | NodeKind::Keep
                    | NodeKind::Comment { .. }
                    | NodeKind::Callout { .. }
                    | NodeKind::PcreVerb { .. }
                    | NodeKind::LimitMatch { .. } => continue,
                    _ => {}
                }
                let first = first_char_set(child)?;
                out = out.union(&first);
                if !can_match_empty(child) {
                    return Some(out);
                }
            }
            Some(out)
        }
        NodeKind::Alternation { alternatives } => {
            let mut out = CharSet::empty();
            for alt in alternatives {
                out = out.union(&first_char_set(alt)?);
            }
            Some(out)
        }
        NodeKind::Group { kind, child } => {
            if kind.is_lookaround() {
                return None;
            }
            first_char_set(child)
        }
        NodeKind::Quantifier { node, .. } => first_char_set(node),
        NodeKind::Regex { pattern, .. } => first_char_set(pattern),
        NodeKind::Conditional { yes, no, .. } => {
            let mut out = first_char_set(yes)?;
            if let Some(no) = no {
                out = out.union(&first_char_set(no)?);
            }
            Some(out)
        }
        NodeKind::ScriptRun { body, .. } => first_char_set(body),
        NodeKind::Anchor { .. }
        | NodeKind::Assertion { .. }
        | NodeKind::Keep
        | NodeKind::Comment { .. }
        | NodeKind::Callout { .. }
        | NodeKind::PcreVerb { .. }
        | NodeKind::LimitMatch { .. } => Some(CharSet::empty()),
        _ => atom_char_set(node),
    }
}

/// Whether a subtree can match the empty string.
pub fn can_match_empty(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Sequence { children } => children.iter().all(can_match_empty),
        NodeKind::Alternation { alternatives } => alternatives.iter().any(can_match_empty),
        NodeKind::Group { kind, child } => kind.is_lookaround() || can_match_empty(child),
        NodeKind::Quantifier { node, kind, .. } => {
            kind.min() == 0 || can_match_empty(node)
        }
        NodeKind::Anchor { .. }
        | NodeKind::Assertion { .. }
        | NodeKind::Keep
        | NodeKind::Comment { .. }
        | NodeKind::Callout { .. }
        | NodeKind::PcreVerb { .. }
        | NodeKind::LimitMatch { .. }
        | NodeKind::Define { .. }
        | NodeKind::VersionCondition { .. } => true,
        NodeKind::Conditional { yes, no, .. } => {
            can_match_empty(yes) || no.as_deref().map(|n| can_match_empty(n)).unwrap_or(true)
        }
        NodeKind::Regex { pattern, .. } => can_match_empty(pattern),
        NodeKind::ScriptRun { body, .. } => can_match_empty(body),
        NodeKind::Literal { value, .. } => value.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcre_parser::Parser;

    fn pattern(source: &str) -> Node {
        let ast = Parser::new().parse(source).unwrap();
        let NodeKind::Regex { pattern, .. } = ast.kind else {
            panic!("expected regex node");
        };
        *pattern
    }

    #[test]
    fn literal_first_set() {
        let set = first_char_set(&pattern("/abc/")).unwrap();
        assert_eq!(set, CharSet::from_char('a' as u32));
    }

    #[test]
    fn alternation_unions_branches() {
        let set = first_char_set(&pattern("/a|b/")).unwrap();
        assert!(set.contains('a' as u32) && set.contains('b' as u32));
    }

    #[test]
    fn optional_prefix_extends_first_set() {
        let set = first_char_set(&pattern("/a?b/")).unwrap();
        assert!(set.contains('a' as u32) && set.contains('b' as u32));
    }

    #[test]
    fn class_sets_respect_negation_and_ops() {
        let set = first_char_set(&pattern("/[^a-c]/")).unwrap();
        assert!(!set.contains('b' as u32));
        assert!(set.contains('z' as u32));

        let set = first_char_set(&pattern("/[a-z--m]/")).unwrap();
        assert!(set.contains('a' as u32));
        assert!(!set.contains('m' as u32));
    }

    #[test]
    fn lookaround_is_opaque() {
        assert!(first_char_set(&pattern("/(?=a)b/")).is_none());
    }

    #[test]
    fn empty_match_detection() {
        assert!(can_match_empty(&pattern("/a*/")));
        assert!(can_match_empty(&pattern("/(a?)(b?)/")));
        assert!(!can_match_empty(&pattern("/a+/")));
        assert!(!can_match_empty(&pattern("/ab/")));
    }
}
