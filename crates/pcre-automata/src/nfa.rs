//! Thompson construction with range-labeled edges.
//!
//! Edges carry a [`CharSet`] instead of a single symbol, so one edge covers
//! an entire character class. Constructs outside the regular languages
//! (backreferences, lookarounds, subroutines, possessive/atomic
//! backtracking control) are rejected up front with a typed error.

use pcre_ast::{
    AnchorKind, AssertionKind, CharTypeKind, ClassOp, Flags, GroupKind, Node, NodeKind, QuantMode,
    QuantifierKind,
};
use pcre_charset::{
    digit, horizontal_space, newline, space, vertical_space, word, CharSet, BYTE_MAX, UNICODE_MAX,
};
use rustc_hash::FxHashMap;

use crate::error::ComplexityError;

/// Whole-string or substring comparison semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    /// Both automata describe complete strings; anchors are no-ops
    Full,
    /// The pattern may match anywhere; the automaton is wrapped in `.*`
    Unanchored,
}

impl Default for MatchMode {
    fn default() -> Self {
        MatchMode::Full
    }
}

/// One NFA state: epsilon edges plus labeled edges.
#[derive(Debug, Clone, Default)]
pub struct NfaState {
    /// `(None, target)` is an epsilon edge; `(Some(set), target)` consumes
    /// one code point from `set`
    pub edges: Vec<(Option<CharSet>, usize)>,
}

/// A Thompson NFA with one start and one accept state.
#[derive(Debug, Clone)]
pub struct Nfa {
    /// States addressed by index
    pub states: Vec<NfaState>,
    /// Entry state
    pub start: usize,
    /// Single accepting state
    pub accept: usize,
    /// Highest code point of the alphabet (`0xFF` or `0x10FFFF`)
    pub max_code_point: u32,
}

impl Nfa {
    /// All distinct CharSets referenced by edges.
    pub fn edge_sets(&self) -> Vec<&CharSet> {
        let mut out = Vec::new();
        for state in &self.states {
            for (set, _) in &state.edges {
                if let Some(set) = set {
                    out.push(set);
                }
            }
        }
        out
    }
}

/// Translation options.
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    /// Comparison semantics
    pub match_mode: MatchMode,
    /// Label → CharSet table for `\p{…}`; properties not present are
    /// rejected
    pub property_table: FxHashMap<String, CharSet>,
    /// Upper bound on counted-repetition expansion (0 means the default)
    pub max_repeat: u32,
}

impl TranslateOptions {
    /// Options for a match mode with the default repeat bound.
    pub fn for_mode(mode: MatchMode) -> Self {
        TranslateOptions { match_mode: mode, ..Default::default() }
    }
}

/// Translate a parsed tree into an NFA.
pub fn translate(ast: &Node, options: &TranslateOptions) -> Result<Nfa, ComplexityError> {
    let (flags, pattern) = match &ast.kind {
        NodeKind::Regex { flags, pattern, .. } => (*flags, pattern.as_ref()),
        _ => (Flags::default(), ast),
    };
    let max_code_point = if flags.unicode { UNICODE_MAX } else { BYTE_MAX };
    let max_repeat = if options.max_repeat == 0 { 256 } else { options.max_repeat };
    let mut builder = Builder {
        states: Vec::new(),
        flags,
        max_code_point,
        property_table: &options.property_table,
        max_repeat,
    };
    let (mut start, mut accept) = builder.build(pattern)?;
    if options.match_mode == MatchMode::Unanchored {
        let any = CharSet::full(max_code_point);
        let s0 = builder.new_state();
        builder.states[s0].edges.push((Some(any.clone()), s0));
        builder.states[s0].edges.push((None, start));
        let f0 = builder.new_state();
        builder.states[accept].edges.push((None, f0));
        builder.states[f0].edges.push((Some(any), f0));
        start = s0;
        accept = f0;
    }
    Ok(Nfa { states: builder.states, start, accept, max_code_point })
}

struct Builder<'a> {
    states: Vec<NfaState>,
    flags: Flags,
    max_code_point: u32,
    property_table: &'a FxHashMap<String, CharSet>,
    max_repeat: u32,
}

type Fragment = (usize, usize);

impl Builder<'_> {
    fn new_state(&mut self) -> usize {
        self.states.push(NfaState::default());
        self.states.len() - 1
    }

    fn epsilon_fragment(&mut self) -> Fragment {
        let s = self.new_state();
        let f = self.new_state();
        self.states[s].edges.push((None, f));
        (s, f)
    }

    fn set_fragment(&mut self, set: CharSet) -> Fragment {
        let set = self.clamp(self.fold_case(set));
        let s = self.new_state();
        let f = self.new_state();
        self.states[s].edges.push((Some(set), f));
        (s, f)
    }

    fn clamp(&self, set: CharSet) -> CharSet {
        set.intersect(&CharSet::full(self.max_code_point))
    }

    /// Under `/i`, close a set over ASCII case pairs.
    fn fold_case(&self, set: CharSet) -> CharSet {
        if !self.flags.ignore_case {
            return set;
        }
        let lower = CharSet::from_range(0x61, 0x7A);
        let upper = CharSet::from_range(0x41, 0x5A);
        let mut out = set.clone();
        for &(lo, hi) in set.intersect(&lower).ranges() {
            out = out.union(&CharSet::from_range(lo - 0x20, hi - 0x20));
        }
        for &(lo, hi) in set.intersect(&upper).ranges() {
            out = out.union(&CharSet::from_range(lo + 0x20, hi + 0x20));
        }
        out
    }

    fn unsupported(&self, construct: &str, node: &Node) -> ComplexityError {
        ComplexityError::UnsupportedConstruct {
            construct: construct.to_string(),
            offset: node.span.start,
        }
    }

    fn concat(&mut self, fragments: Vec<Fragment>) -> Fragment {
        let Some(&(first_start, mut prev_accept)) = fragments.first() else {
            return self.epsilon_fragment();
        };
        for &(start, accept) in &fragments[1..] {
            self.states[prev_accept].edges.push((None, start));
            prev_accept = accept;
        }
        (first_start, prev_accept)
    }

    fn union(&mut self, fragments: Vec<Fragment>) -> Fragment {
        let s = self.new_state();
        let f = self.new_state();
        for (start, accept) in fragments {
            self.states[s].edges.push((None, start));
            self.states[accept].edges.push((None, f));
        }
        (s, f)
    }

    fn star(&mut self, inner: Fragment) -> Fragment {
        let s = self.new_state();
        let f = self.new_state();
        self.states[s].edges.push((None, inner.0));
        self.states[s].edges.push((None, f));
        self.states[inner.1].edges.push((None, inner.0));
        self.states[inner.1].edges.push((None, f));
        (s, f)
    }

    fn repeat(
        &mut self,
        node: &Node,
        inner_node: &Node,
        kind: QuantifierKind,
    ) -> Result<Fragment, ComplexityError> {
        let max_repeat = self.max_repeat;
        let at = node.span.start;
        let check = move |n: u32| -> Result<(), ComplexityError> {
            if n > max_repeat {
                Err(ComplexityError::UnsupportedConstruct {
                    construct: format!("counted repetition beyond {{{max_repeat}}}"),
                    offset: at,
                })
            } else {
                Ok(())
            }
        };
        match kind {
            QuantifierKind::Star => {
                let inner = self.build(inner_node)?;
                Ok(self.star(inner))
            }
            QuantifierKind::Plus => {
                let first = self.build(inner_node)?;
                let rest = self.build(inner_node)?;
                let looped = self.star(rest);
                Ok(self.concat(vec![first, looped]))
            }
            QuantifierKind::Question => {
                let inner = self.build(inner_node)?;
                let empty = self.epsilon_fragment();
                Ok(self.union(vec![inner, empty]))
            }
            QuantifierKind::Exact(n) => {
                check(n)?;
                let mut parts = Vec::new();
                for _ in 0..n {
                    parts.push(self.build(inner_node)?);
                }
                Ok(self.concat(parts))
            }
            QuantifierKind::AtLeast(n) => {
                check(n)?;
                let mut parts = Vec::new();
                for _ in 0..n {
                    parts.push(self.build(inner_node)?);
                }
                let tail = self.build(inner_node)?;
                let looped = self.star(tail);
                parts.push(looped);
                Ok(self.concat(parts))
            }
            QuantifierKind::Range(n, m) => {
                check(m)?;
                let mut parts = Vec::new();
                for _ in 0..n {
                    parts.push(self.build(inner_node)?);
                }
                for _ in n..m {
                    let optional_inner = self.build(inner_node)?;
                    let empty = self.epsilon_fragment();
                    parts.push(self.union(vec![optional_inner, empty]));
                }
                if parts.is_empty() {
                    Ok(self.epsilon_fragment())
                } else {
                    Ok(self.concat(parts))
                }
            }
        }
    }

    fn char_type_set(&self, kind: CharTypeKind) -> CharSet {
        let max = self.max_code_point;
        match kind {
            CharTypeKind::Digit => digit().clone(),
            CharTypeKind::NotDigit => digit().complement(max),
            CharTypeKind::Space => space().clone(),
            CharTypeKind::NotSpace => space().complement(max),
            CharTypeKind::Word => word().clone(),
            CharTypeKind::NotWord => word().complement(max),
            CharTypeKind::HorizontalSpace => horizontal_space().clone(),
            CharTypeKind::NotHorizontalSpace => horizontal_space().complement(max),
            CharTypeKind::VerticalSpace => vertical_space().clone(),
            CharTypeKind::NotVerticalSpace => vertical_space().complement(max),
            CharTypeKind::Newline => newline().clone(),
        }
    }

    fn posix_set(&self, name: &str, node: &Node) -> Result<CharSet, ComplexityError> {
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
            "space" => space().clone(),
            "upper" => CharSet::from_range(0x41, 0x5A),
            "word" => word().clone(),
            "xdigit" => CharSet::from_ranges([(0x30, 0x39), (0x41, 0x46), (0x61, 0x66)]),
            _ => return Err(self.unsupported("unknown POSIX class", node)),
        };
        Ok(if negated { set.complement(self.max_code_point) } else { set })
    }

    fn class_set(&self, node: &Node) -> Result<CharSet, ComplexityError> {
        match &node.kind {
            NodeKind::Sequence { children } => {
                let mut out = CharSet::empty();
                for child in children {
                    out = out.union(&self.class_set(child)?);
                }
                Ok(out)
            }
            NodeKind::ClassOperation { op, left, right } => {
                let left = self.class_set(left)?;
                let right = self.class_set(right)?;
                Ok(match op {
                    ClassOp::Intersection => left.intersect(&right),
                    ClassOp::Subtraction => left.subtract(&right),
                })
            }
            NodeKind::Literal { value, .. } => Ok(CharSet::from_chars(value.chars())),
            NodeKind::CharLiteral { code_point, .. } => Ok(CharSet::from_char(*code_point)),
            NodeKind::ControlChar { ch } => {
                Ok(CharSet::from_char((ch.to_ascii_uppercase() as u32) ^ 0x40))
            }
            NodeKind::CharType { kind } => Ok(self.char_type_set(*kind)),
            NodeKind::PosixClass { name } => self.posix_set(name, node),
            NodeKind::Range { start, end } => {
                let lo = self.class_set(start)?.min().unwrap_or(0);
                let hi = self.class_set(end)?.min().unwrap_or(0);
                Ok(CharSet::from_range(lo, hi))
            }
            NodeKind::UnicodeProp { prop, .. } => self.property_set(prop, node),
            NodeKind::CharClass { negated, expression } => {
                let inner = self.class_set(expression)?;
                Ok(if *negated { inner.complement(self.max_code_point) } else { inner })
            }
            _ => Err(self.unsupported("character class element", node)),
        }
    }

    fn property_set(&self, prop: &str, node: &Node) -> Result<CharSet, ComplexityError> {
        let (negated, bare) = match prop.strip_prefix('^') {
            Some(stripped) => (true, stripped),
            None => (false, prop),
        };
        let set = self
            .property_table
            .get(bare)
            .ok_or_else(|| self.unsupported(&format!("Unicode property \\p{{{bare}}}"), node))?;
        Ok(if negated {
            set.complement(self.max_code_point)
        } else {
            set.clone()
        })
    }

    fn build(&mut self, node: &Node) -> Result<Fragment, ComplexityError> {
        match &node.kind {
            NodeKind::Regex { pattern, .. } => self.build(pattern),
            NodeKind::Sequence { children } => {
                let mut parts = Vec::new();
                for child in children {
                    parts.push(self.build(child)?);
                }
                if parts.is_empty() {
                    Ok(self.epsilon_fragment())
                } else {
                    Ok(self.concat(parts))
                }
            }
            NodeKind::Alternation { alternatives } => {
                let mut parts = Vec::new();
                for alt in alternatives {
                    parts.push(self.build(alt)?);
                }
                Ok(self.union(parts))
            }
            NodeKind::Group { kind, child } => match kind {
                GroupKind::Capturing { .. }
                | GroupKind::NonCapturing
                | GroupKind::Named { .. }
                | GroupKind::BranchReset => self.build(child),
                GroupKind::InlineFlags { scoped, .. } => {
                    if *scoped {
                        self.build(child)
                    } else {
                        Ok(self.epsilon_fragment())
                    }
                }
                GroupKind::Atomic => Err(self.unsupported("atomic group", node)),
                GroupKind::LookaheadPositive
                | GroupKind::LookaheadNegative
                | GroupKind::LookbehindPositive
                | GroupKind::LookbehindNegative => Err(self.unsupported("lookaround", node)),
            },
            NodeKind::Quantifier { node: inner, kind, mode } => {
                if *mode == QuantMode::Possessive {
                    return Err(self.unsupported("possessive quantifier", node));
                }
                self.repeat(node, inner, *kind)
            }
            NodeKind::Literal { value, .. } => {
                let mut parts = Vec::new();
                for ch in value.chars() {
                    parts.push(self.set_fragment(CharSet::from_char(ch as u32)));
                }
                if parts.is_empty() {
                    Ok(self.epsilon_fragment())
                } else {
                    Ok(self.concat(parts))
                }
            }
            NodeKind::CharLiteral { code_point, .. } => {
                Ok(self.set_fragment(CharSet::from_char(*code_point)))
            }
            NodeKind::Dot => {
                let newline_set = CharSet::from_char(b'\n' as u32);
                let set = if self.flags.dotall {
                    CharSet::full(self.max_code_point)
                } else {
                    newline_set.complement(self.max_code_point)
                };
                Ok(self.set_fragment(set))
            }
            NodeKind::CharType { kind } => {
                if *kind == CharTypeKind::Newline {
                    // \R is CRLF or any vertical space
                    let crlf = {
                        let cr = self.set_fragment(CharSet::from_char(0x0D));
                        let lf = self.set_fragment(CharSet::from_char(0x0A));
                        self.concat(vec![cr, lf])
                    };
                    let single = self.set_fragment(newline().clone());
                    return Ok(self.union(vec![crlf, single]));
                }
                let set = self.char_type_set(*kind);
                Ok(self.set_fragment(set))
            }
            NodeKind::UnicodeProp { prop, .. } => {
                let set = self.property_set(prop, node)?;
                Ok(self.set_fragment(set))
            }
            NodeKind::PosixClass { name } => {
                let set = self.posix_set(name, node)?;
                Ok(self.set_fragment(set))
            }
            NodeKind::CharClass { .. } => {
                let set = self.class_set(node)?;
                Ok(self.set_fragment(set))
            }
            NodeKind::Range { .. } | NodeKind::ClassOperation { .. } => {
                let set = self.class_set(node)?;
                Ok(self.set_fragment(set))
            }
            NodeKind::ControlChar { ch } => {
                let cp = (ch.to_ascii_uppercase() as u32) ^ 0x40;
                Ok(self.set_fragment(CharSet::from_char(cp)))
            }
            // Anchors and buffer assertions are no-ops under whole-string
            // semantics.
            NodeKind::Anchor { kind: AnchorKind::Start | AnchorKind::End } => {
                Ok(self.epsilon_fragment())
            }
            NodeKind::Assertion { kind } => match kind {
                AssertionKind::BufferStart
                | AssertionKind::BufferEnd
                | AssertionKind::BufferEndNewline => Ok(self.epsilon_fragment()),
                AssertionKind::MatchStart => Err(self.unsupported("\\G assertion", node)),
                AssertionKind::WordBoundary
                | AssertionKind::NotWordBoundary
                | AssertionKind::GraphemeBoundary
                | AssertionKind::NotGraphemeBoundary => {
                    Err(self.unsupported("boundary assertion", node))
                }
            },
            NodeKind::Comment { .. } | NodeKind::Callout { .. } => Ok(self.epsilon_fragment()),
            NodeKind::Backref { .. } => Err(self.unsupported("backreference", node)),
            NodeKind::Subroutine { .. } => Err(self.unsupported("subroutine call", node)),
            NodeKind::Conditional { .. } => Err(self.unsupported("conditional group", node)),
            NodeKind::Define { .. } => Err(self.unsupported("DEFINE block", node)),
            NodeKind::Keep => Err(self.unsupported("\\K", node)),
            NodeKind::ScriptRun { .. } => Err(self.unsupported("script run", node)),
            NodeKind::VersionCondition { .. } => {
                Err(self.unsupported("version condition", node))
            }
            NodeKind::PcreVerb { .. } => Err(self.unsupported("backtracking verb", node)),
            NodeKind::LimitMatch { .. } => Err(self.unsupported("match limit", node)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcre_parser::Parser;

    fn nfa(source: &str) -> Nfa {
        let ast = Parser::new().parse(source).unwrap();
        translate(&ast, &TranslateOptions::default()).unwrap()
    }

    fn nfa_err(source: &str) -> ComplexityError {
        let ast = Parser::new().parse(source).unwrap();
        translate(&ast, &TranslateOptions::default()).unwrap_err()
    }

    #[test]
    fn literal_chain_has_one_edge_per_char() {
        let nfa = nfa("/ab/");
        let labeled = nfa
            .states
            .iter()
            .flat_map(|s| &s.edges)
            .filter(|(set, _)| set.is_some())
            .count();
        assert_eq!(labeled, 2);
    }

    #[test]
    fn byte_mode_alphabet_is_clamped() {
        let nfa = nfa("/./");
        assert_eq!(nfa.max_code_point, BYTE_MAX);
        for set in nfa.edge_sets() {
            assert!(set.max().unwrap_or(0) <= BYTE_MAX);
        }
    }

    #[test]
    fn unicode_mode_reaches_the_top_plane() {
        let nfa = nfa("/./u");
        assert_eq!(nfa.max_code_point, UNICODE_MAX);
    }

    #[test]
    fn case_folding_under_i() {
        let nfa = nfa("/a/i");
        let set = nfa.edge_sets()[0];
        assert!(set.contains('a' as u32));
        assert!(set.contains('A' as u32));
    }

    #[test]
    fn non_regular_constructs_are_rejected() {
        assert!(matches!(
            nfa_err(r"/(a)\1/"),
            ComplexityError::UnsupportedConstruct { ref construct, .. } if construct == "backreference"
        ));
        assert!(matches!(
            nfa_err("/(?=a)b/"),
            ComplexityError::UnsupportedConstruct { ref construct, .. } if construct == "lookaround"
        ));
        assert!(matches!(
            nfa_err("/(a)(?1)/"),
            ComplexityError::UnsupportedConstruct { ref construct, .. } if construct == "subroutine call"
        ));
        assert!(matches!(
            nfa_err("/a++/"),
            ComplexityError::UnsupportedConstruct { ref construct, .. } if construct == "possessive quantifier"
        ));
    }

    #[test]
    fn unknown_property_is_rejected_but_table_resolves() {
        assert!(nfa_err(r"/\p{L}/").to_string().contains("Unicode property"));
        let ast = Parser::new().parse(r"/\p{L}/").unwrap();
        let mut options = TranslateOptions::default();
        options
            .property_table
            .insert("L".to_string(), CharSet::from_range(0x41, 0x5A));
        assert!(translate(&ast, &options).is_ok());
    }

    #[test]
    fn oversized_counted_repetition_is_rejected() {
        let err = nfa_err("/a{999}/");
        assert!(err.to_string().contains("counted repetition"));
    }

    #[test]
    fn unanchored_mode_wraps_with_any_loops() {
        let ast = Parser::new().parse("/a/").unwrap();
        let full = translate(&ast, &TranslateOptions::default()).unwrap();
        let wrapped =
            translate(&ast, &TranslateOptions::for_mode(MatchMode::Unanchored)).unwrap();
        assert!(wrapped.states.len() > full.states.len());
        // start has a self loop over the whole alphabet
        let has_loop = wrapped.states[wrapped.start]
            .edges
            .iter()
            .any(|(set, t)| *t == wrapped.start && set.is_some());
        assert!(has_loop);
    }
}
