//! AST-to-pattern recompiler.
//!
//! Produces a pattern string that re-parses to a structurally equivalent
//! tree. Cosmetic details are normalized (flag order, escape spelling of
//! backreferences); everything semantic — group flavors, named-group
//! syntax, quantifier modes, class structure — is preserved.

use pcre_ast::{
    AnchorKind, AssertionKind, AstVisitor, CalloutId, ClassOp, GroupKind, NamedSyntax, Node,
    NodeKind, QuantMode, QuantifierKind, RefTarget, VersionOp,
};

/// Recompiles an AST into pattern source.
pub struct Compiler {
    delimiter: char,
    in_class: bool,
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler { delimiter: '/', in_class: false }
    }
}

impl Compiler {
    /// Create a compiler; the delimiter is taken from the `Regex` node when
    /// present.
    pub fn new() -> Self {
        Compiler::default()
    }

    /// Compile a full tree. For a `Regex` node the result carries delimiters
    /// and flags; for any other node only the fragment is produced.
    pub fn compile(&mut self, node: &Node) -> String {
        self.visit(node)
    }

    fn closing_delimiter(&self) -> char {
        match self.delimiter {
            '(' => ')',
            '[' => ']',
            '{' => '}',
            '<' => '>',
            other => other,
        }
    }

    fn escape_literal(&self, value: &str, raw: bool) -> String {
        if raw {
            return format!("\\Q{value}\\E");
        }
        let mut out = String::with_capacity(value.len());
        for ch in value.chars() {
            match ch {
                '\t' => out.push_str("\\t"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\x0C' => out.push_str("\\f"),
                '\x1B' => out.push_str("\\e"),
                '\x07' => out.push_str("\\a"),
                '\x08' if self.in_class => out.push_str("\\b"),
                c if (c as u32) < 0x20 => {
                    out.push_str(&format!("\\x{:02X}", c as u32));
                }
                c => {
                    let needs_escape = if self.in_class {
                        matches!(c, '\\' | ']' | '^' | '-' | '[')
                    } else {
                        matches!(
                            c,
                            '\\' | '.' | '^' | '$' | '|' | '?' | '*' | '+' | '(' | ')' | '['
                                | ']' | '{' | '}'
                        )
                    };
                    if needs_escape || c == self.delimiter || c == self.closing_delimiter() {
                        out.push('\\');
                    }
                    out.push(c);
                }
            }
        }
        out
    }

    fn group_prefix(kind: &GroupKind) -> String {
        match kind {
            GroupKind::Capturing { .. } => String::new(),
            GroupKind::NonCapturing => "?:".to_string(),
            GroupKind::Named { name, syntax, .. } => match syntax {
                NamedSyntax::Angle => format!("?<{name}>"),
                NamedSyntax::PAngle => format!("?P<{name}>"),
                NamedSyntax::Quote => format!("?'{name}'"),
            },
            GroupKind::LookaheadPositive => "?=".to_string(),
            GroupKind::LookaheadNegative => "?!".to_string(),
            GroupKind::LookbehindPositive => "?<=".to_string(),
            GroupKind::LookbehindNegative => "?<!".to_string(),
            GroupKind::Atomic => "?>".to_string(),
            GroupKind::BranchReset => "?|".to_string(),
            GroupKind::InlineFlags { on, off, .. } => {
                let mut prefix = format!("?{on}");
                if !off.is_empty() {
                    prefix.push('-');
                    prefix.push_str(off);
                }
                prefix
            }
        }
    }

    fn quantifier_suffix(kind: QuantifierKind, mode: QuantMode) -> String {
        let mut out = match kind {
            QuantifierKind::Star => "*".to_string(),
            QuantifierKind::Plus => "+".to_string(),
            QuantifierKind::Question => "?".to_string(),
            QuantifierKind::Exact(n) => format!("{{{n}}}"),
            QuantifierKind::AtLeast(n) => format!("{{{n},}}"),
            QuantifierKind::Range(n, m) => format!("{{{n},{m}}}"),
        };
        match mode {
            QuantMode::Greedy => {}
            QuantMode::Lazy => out.push('?'),
            QuantMode::Possessive => out.push('+'),
        }
        out
    }

    fn condition_inner(&mut self, condition: &Node) -> String {
        match &condition.kind {
            NodeKind::Backref { target } => match target {
                RefTarget::Index(n) => format!("{n}"),
                RefTarget::Relative(n) if *n > 0 => format!("+{n}"),
                RefTarget::Relative(n) => format!("{n}"),
                RefTarget::Name(name) => format!("<{name}>"),
            },
            NodeKind::Subroutine { target } => match target {
                RefTarget::Index(0) => "R".to_string(),
                RefTarget::Index(n) => format!("R{n}"),
                RefTarget::Relative(n) => format!("R{n}"),
                RefTarget::Name(name) => format!("R&{name}"),
            },
            NodeKind::VersionCondition { op, version } => {
                let op = match op {
                    VersionOp::Ge => ">=",
                    VersionOp::Eq => "=",
                };
                format!("VERSION{op}{version}")
            }
            _ => self.visit(condition),
        }
    }
}

impl AstVisitor for Compiler {
    type Output = String;

    fn visit(&mut self, node: &Node) -> String {
        match &node.kind {
            NodeKind::Regex { delimiter, flags, pattern } => {
                self.delimiter = *delimiter;
                let body = self.visit(pattern);
                format!("{}{}{}{}", delimiter, body, self.closing_delimiter(), flags)
            }
            NodeKind::Sequence { children } => {
                children.iter().map(|c| self.visit(c)).collect()
            }
            NodeKind::Alternation { alternatives } => alternatives
                .iter()
                .map(|a| self.visit(a))
                .collect::<Vec<_>>()
                .join("|"),
            NodeKind::Group { kind, child } => {
                if let GroupKind::InlineFlags { scoped: false, .. } = kind {
                    return format!("({})", Self::group_prefix(kind));
                }
                let prefix = Self::group_prefix(kind);
                let inner = self.visit(child);
                let separator = if matches!(kind, GroupKind::InlineFlags { .. }) { ":" } else { "" };
                format!("({prefix}{separator}{inner})")
            }
            NodeKind::Quantifier { node, kind, mode } => {
                format!("{}{}", self.visit(node), Self::quantifier_suffix(*kind, *mode))
            }
            NodeKind::Literal { value, is_raw } => self.escape_literal(value, *is_raw),
            NodeKind::CharLiteral { original, .. } => original.clone(),
            NodeKind::Dot => ".".to_string(),
            NodeKind::Anchor { kind } => match kind {
                AnchorKind::Start => "^".to_string(),
                AnchorKind::End => "$".to_string(),
            },
            NodeKind::Assertion { kind } => match kind {
                AssertionKind::BufferStart => "\\A".to_string(),
                AssertionKind::BufferEnd => "\\z".to_string(),
                AssertionKind::BufferEndNewline => "\\Z".to_string(),
                AssertionKind::MatchStart => "\\G".to_string(),
                AssertionKind::WordBoundary => "\\b".to_string(),
                AssertionKind::NotWordBoundary => "\\B".to_string(),
                AssertionKind::GraphemeBoundary => "\\b{g}".to_string(),
                AssertionKind::NotGraphemeBoundary => "\\B{g}".to_string(),
            },
            NodeKind::CharType { kind } => format!("\\{}", kind.letter()),
            NodeKind::UnicodeProp { prop, has_braces } => {
                let (negated, name) = match prop.strip_prefix('^') {
                    Some(stripped) => (true, stripped),
                    None => (false, prop.as_str()),
                };
                let letter = if negated { 'P' } else { 'p' };
                if *has_braces || name.len() > 1 {
                    format!("\\{letter}{{{name}}}")
                } else {
                    format!("\\{letter}{name}")
                }
            }
            NodeKind::PosixClass { name } => format!("[:{name}:]"),
            NodeKind::CharClass { negated, expression } => {
                let was_in_class = self.in_class;
                self.in_class = true;
                let inner = self.visit(expression);
                self.in_class = was_in_class;
                format!("[{}{}]", if *negated { "^" } else { "" }, inner)
            }
            NodeKind::Range { start, end } => {
                format!("{}-{}", self.visit(start), self.visit(end))
            }
            NodeKind::ClassOperation { op, left, right } => {
                let op = match op {
                    ClassOp::Intersection => "&&",
                    ClassOp::Subtraction => "--",
                };
                format!("{}{}{}", self.visit(left), op, self.visit(right))
            }
            NodeKind::Backref { target } => match target {
                RefTarget::Index(n) => format!("\\{n}"),
                RefTarget::Relative(n) => format!("\\g{{{n}}}"),
                RefTarget::Name(name) => format!("\\k<{name}>"),
            },
            NodeKind::ControlChar { ch } => format!("\\c{ch}"),
            NodeKind::Keep => "\\K".to_string(),
            NodeKind::Comment { text } => format!("(?#{text})"),
            NodeKind::Conditional { condition, yes, no } => {
                let cond = if matches!(condition.kind, NodeKind::Group { .. }) {
                    self.visit(condition)
                } else {
                    format!("({})", self.condition_inner(condition))
                };
                let mut out = format!("(?{cond}{}", self.visit(yes));
                if let Some(no) = no {
                    out.push('|');
                    out.push_str(&self.visit(no));
                }
                out.push(')');
                out
            }
            NodeKind::Define { content } => format!("(?(DEFINE){})", self.visit(content)),
            NodeKind::Subroutine { target } => match target {
                RefTarget::Index(0) => "(?R)".to_string(),
                RefTarget::Index(n) => format!("(?{n})"),
                RefTarget::Relative(n) if *n > 0 => format!("(?+{n})"),
                RefTarget::Relative(n) => format!("(?{n})"),
                RefTarget::Name(name) => format!("(?&{name})"),
            },
            NodeKind::ScriptRun { script, body } => {
                format!("(*{script}:{})", self.visit(body))
            }
            NodeKind::VersionCondition { op, version } => {
                let op = match op {
                    VersionOp::Ge => ">=",
                    VersionOp::Eq => "=",
                };
                format!("VERSION{op}{version}")
            }
            NodeKind::PcreVerb { verb, arg } => match arg {
                Some(arg) => format!("(*{verb}:{arg})"),
                None => format!("(*{verb})"),
            },
            NodeKind::Callout { id, .. } => match id {
                CalloutId::Number(0) => "(?C)".to_string(),
                CalloutId::Number(n) => format!("(?C{n})"),
                CalloutId::Tag(tag) => format!("(?C'{tag}')"),
            },
            NodeKind::LimitMatch { limit } => format!("(*LIMIT_MATCH={limit})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcre_parser::Parser;
    use pretty_assertions::assert_eq;

    fn recompile(source: &str) -> String {
        let ast = Parser::new().parse(source).unwrap();
        Compiler::new().compile(&ast)
    }

    #[test]
    fn simple_patterns_round_trip_verbatim() {
        for source in [
            "/abc/",
            "/a|b|c/i",
            "/(a)(?:b)(?>c)/",
            "/(?<word>\\w+)/",
            "/a{2,3}?b*+/",
            "/[a-z0-9_]/",
            "/[^\\d]/",
            "/\\Ax\\z/",
            "/(?|(a)|(b))\\1/",
            "/(?(1)a|b)/",
            "/(?(DEFINE)(?<d>\\d))(?&d)/",
            "/(*SKIP)a/",
            "/(?C3)a/",
        ] {
            assert_eq!(recompile(source), source, "recompile of {source}");
        }
    }

    #[test]
    fn flag_order_is_normalized() {
        assert_eq!(recompile("/a/mi"), "/a/im");
    }

    #[test]
    fn quote_mode_span_is_preserved() {
        assert_eq!(recompile(r"/\Qa.b\E/"), r"/\Qa.b\E/");
    }

    #[test]
    fn delimiter_is_preserved_and_escaped() {
        assert_eq!(recompile("#a#"), "#a#");
        assert_eq!(recompile("{a}i"), "{a}i");
    }

    #[test]
    fn control_bytes_reescape() {
        let out = recompile("/\\t\\n/");
        assert_eq!(out, "/\\t\\n/");
    }

    #[test]
    fn recompiled_pattern_reparses_to_same_tree() {
        for source in [
            "/(a+)+$/",
            "/(?i-sm:x)|[\\w&&[:ascii:]]/",
            "/(?<y>a)(?(<y>)b|c)/",
            "/a(?#note)b/",
            "/(?=x)(?<!y)/",
            "/(*sr:ab)/x",
        ] {
            let first = Parser::new().parse(source).unwrap();
            let recompiled = Compiler::new().compile(&first);
            let second = Parser::new().parse(&recompiled).unwrap();
            let again = Compiler::new().compile(&second);
            assert_eq!(recompiled, again, "fixed point for {source}");
        }
    }
}
