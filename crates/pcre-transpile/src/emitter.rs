//! The shared emit visitor behind both targets.
//!
//! One exhaustive walk over the tree; target differences live in the match
//! arms. Anything the target cannot express returns `TranspileError` with
//! the source offset; nuance changes are recorded on the context.

use pcre_analysis::sets::{char_type_set, posix_class_set};
use pcre_ast::{
    AnchorKind, AssertionKind, CharLiteralKind, CharTypeKind, ClassOp, GroupKind, NamedSyntax,
    Node, NodeKind, QuantMode, QuantifierKind, RefTarget,
};
use pcre_charset::CharSet;

use crate::{Target, TranspileContext, TranspileError, TranspileResult};

/// Convert a tree for one target.
pub fn transpile_tree(ast: &Node, target: Target) -> Result<TranspileResult, TranspileError> {
    let (flags, pattern) = match &ast.kind {
        NodeKind::Regex { flags, pattern, .. } => (*flags, pattern.as_ref()),
        _ => (pcre_ast::Flags::default(), ast),
    };
    let mut emitter = Emitter {
        target,
        ctx: TranspileContext::default(),
        in_class: false,
        ungreedy: flags.ungreedy,
    };
    let mut target_flags = emitter.map_flags(&flags);
    let body = emitter.emit(pattern)?;
    for flag in emitter.ctx.required_flags.clone() {
        if !target_flags.contains(flag) {
            target_flags.push(flag);
        }
    }
    let target_flags = canonical_flags(target, &target_flags);
    let literal = match target {
        Target::JavaScript => format!("/{body}/{target_flags}"),
        Target::Python => {
            let flag_expr: Vec<&str> = target_flags
                .chars()
                .filter_map(|c| match c {
                    'i' => Some("re.I"),
                    'm' => Some("re.M"),
                    's' => Some("re.S"),
                    'x' => Some("re.X"),
                    _ => None,
                })
                .collect();
            if flag_expr.is_empty() {
                format!("re.compile(r\"{body}\")")
            } else {
                format!("re.compile(r\"{body}\", {})", flag_expr.join(" | "))
            }
        }
    };
    Ok(TranspileResult {
        target: target.to_string(),
        pattern: body,
        flags: target_flags,
        literal,
        warnings: emitter.ctx.warnings,
        notes: emitter.ctx.notes,
    })
}

fn canonical_flags(target: Target, flags: &str) -> String {
    let order = match target {
        Target::JavaScript => "dgimsuvy",
        Target::Python => "imsx",
    };
    let mut out = String::new();
    for c in order.chars() {
        if flags.contains(c) {
            out.push(c);
        }
    }
    out
}

struct Emitter {
    target: Target,
    ctx: TranspileContext,
    in_class: bool,
    ungreedy: bool,
}

impl Emitter {
    fn map_flags(&mut self, flags: &pcre_ast::Flags) -> String {
        let mut out = String::new();
        if flags.ignore_case {
            out.push('i');
        }
        if flags.multiline {
            out.push('m');
        }
        if flags.dotall {
            out.push('s');
        }
        if flags.extended {
            self.ctx
                .note("Dropped the x flag; free-spacing layout is not preserved".to_string());
        }
        if flags.unicode {
            match self.target {
                Target::JavaScript => out.push('u'),
                Target::Python => self
                    .ctx
                    .note("Python 3 str patterns are Unicode by default; dropped the u flag"),
            }
        }
        if flags.ungreedy {
            self.ctx
                .note("Emulated the U flag by swapping greedy and lazy quantifiers");
        }
        if flags.dup_names {
            self.ctx.note("Dropped the J flag; duplicate names are target-checked");
        }
        if flags.anchored {
            self.ctx
                .warn("The A flag has no equivalent; anchor the pattern explicitly");
        }
        if flags.dollar_end_only {
            self.ctx.note("Dropped the D flag");
        }
        if flags.study {
            self.ctx.note("Dropped the S flag");
        }
        if flags.extra {
            self.ctx.note("Dropped the X flag");
        }
        out
    }

    fn err(&self, message: impl Into<String>, node: &Node) -> TranspileError {
        TranspileError::new(message, node.span.start)
    }

    fn emit(&mut self, node: &Node) -> Result<String, TranspileError> {
        match &node.kind {
            NodeKind::Regex { pattern, .. } => self.emit(pattern),
            NodeKind::Sequence { children } => {
                let mut out = String::new();
                for child in children {
                    out.push_str(&self.emit(child)?);
                }
                Ok(out)
            }
            NodeKind::Alternation { alternatives } => {
                let parts: Result<Vec<String>, _> =
                    alternatives.iter().map(|a| self.emit(a)).collect();
                Ok(parts?.join("|"))
            }
            NodeKind::Group { kind, child } => self.emit_group(node, kind, child),
            NodeKind::Quantifier { node: inner, kind, mode } => {
                self.emit_quantifier(node, inner, *kind, *mode)
            }
            NodeKind::Literal { value, .. } => Ok(self.escape_literal(value)),
            NodeKind::CharLiteral { original, code_point, kind } => {
                self.emit_char_literal(original, *code_point, *kind)
            }
            NodeKind::Dot => Ok(".".to_string()),
            NodeKind::Anchor { kind } => Ok(match kind {
                AnchorKind::Start => "^".to_string(),
                AnchorKind::End => "$".to_string(),
            }),
            NodeKind::Assertion { kind } => self.emit_assertion(node, *kind),
            NodeKind::CharType { kind } => self.emit_char_type(*kind),
            NodeKind::UnicodeProp { prop, .. } => match self.target {
                Target::JavaScript => {
                    self.ctx.require_flag('u');
                    self.ctx.note("Unicode property escapes require the u flag");
                    let (negated, name) = match prop.strip_prefix('^') {
                        Some(stripped) => (true, stripped),
                        None => (false, prop.as_str()),
                    };
                    let letter = if negated { 'P' } else { 'p' };
                    Ok(format!("\\{letter}{{{name}}}"))
                }
                Target::Python => Err(self.err(
                    "Unicode property escapes not supported by the re module",
                    node,
                )),
            },
            NodeKind::PosixClass { name } => self.emit_posix_class(node, name),
            NodeKind::CharClass { negated, expression } => {
                let was = self.in_class;
                self.in_class = true;
                let inner = self.emit(expression);
                self.in_class = was;
                Ok(format!("[{}{}]", if *negated { "^" } else { "" }, inner?))
            }
            NodeKind::Range { start, end } => {
                Ok(format!("{}-{}", self.emit(start)?, self.emit(end)?))
            }
            NodeKind::ClassOperation { op, left, right } => match self.target {
                Target::JavaScript => {
                    self.ctx.require_flag('v');
                    self.ctx.note("Class set operations require the v flag");
                    let op = match op {
                        ClassOp::Intersection => "&&",
                        ClassOp::Subtraction => "--",
                    };
                    Ok(format!("{}{}{}", self.emit(left)?, op, self.emit(right)?))
                }
                Target::Python => {
                    Err(self.err("Character class operations not supported in Python", node))
                }
            },
            NodeKind::Backref { target } => match target {
                RefTarget::Index(n) => Ok(format!("\\{n}")),
                RefTarget::Relative(_) => {
                    Err(self.err("Relative backreferences are not supported", node))
                }
                RefTarget::Name(name) => Ok(match self.target {
                    Target::JavaScript => format!("\\k<{name}>"),
                    Target::Python => format!("(?P={name})"),
                }),
            },
            NodeKind::ControlChar { ch } => match self.target {
                Target::JavaScript => Ok(format!("\\c{ch}")),
                Target::Python => {
                    let cp = (ch.to_ascii_uppercase() as u32) ^ 0x40;
                    self.ctx.note("Rewrote \\cX control escapes as hex escapes");
                    Ok(format!("\\x{cp:02X}"))
                }
            },
            NodeKind::Keep => Err(self.err("\\K is not supported by the target", node)),
            NodeKind::Comment { text } => match self.target {
                Target::JavaScript => {
                    self.ctx.note("Removed inline comments; JavaScript has none");
                    Ok(String::new())
                }
                Target::Python => Ok(format!("(?#{text})")),
            },
            NodeKind::Conditional { condition, yes, no } => {
                self.emit_conditional(node, condition, yes, no.as_deref())
            }
            NodeKind::Define { .. } => {
                Err(self.err("DEFINE blocks are not supported by the target", node))
            }
            NodeKind::Subroutine { .. } => Err(self.err(
                "Subroutine calls and recursion are not supported by the target",
                node,
            )),
            NodeKind::ScriptRun { .. } => {
                Err(self.err("Script runs are not supported by the target", node))
            }
            NodeKind::VersionCondition { .. } => {
                Err(self.err("PCRE version conditions are not supported by the target", node))
            }
            NodeKind::PcreVerb { .. } => {
                Err(self.err("Backtracking control verbs are not supported by the target", node))
            }
            NodeKind::Callout { .. } => {
                Err(self.err("Callouts are not supported by the target", node))
            }
            NodeKind::LimitMatch { .. } => {
                Err(self.err("Match limits are not supported by the target", node))
            }
        }
    }

    fn emit_group(
        &mut self,
        node: &Node,
        kind: &GroupKind,
        child: &Node,
    ) -> Result<String, TranspileError> {
        let prefix = match kind {
            GroupKind::Capturing { .. } => String::new(),
            GroupKind::NonCapturing => "?:".to_string(),
            GroupKind::Named { name, syntax, .. } => match self.target {
                Target::JavaScript => {
                    if *syntax != NamedSyntax::Angle {
                        self.ctx.note("Normalized named group syntax to (?<name>)");
                    }
                    format!("?<{name}>")
                }
                Target::Python => {
                    if *syntax != NamedSyntax::PAngle {
                        self.ctx.note("Normalized named group syntax to (?P<name>)");
                    }
                    format!("?P<{name}>")
                }
            },
            GroupKind::LookaheadPositive => "?=".to_string(),
            GroupKind::LookaheadNegative => "?!".to_string(),
            GroupKind::LookbehindPositive => "?<=".to_string(),
            GroupKind::LookbehindNegative => "?<!".to_string(),
            GroupKind::Atomic => match self.target {
                Target::JavaScript => {
                    return Err(self.err("Atomic groups not supported in JavaScript", node))
                }
                Target::Python => {
                    self.ctx.note("Atomic groups require Python 3.11+");
                    "?>".to_string()
                }
            },
            GroupKind::InlineFlags { on, off, scoped } => match self.target {
                Target::JavaScript => {
                    return Err(self.err("Inline flag groups not supported in JavaScript", node))
                }
                Target::Python => {
                    let allowed = |s: &str| s.chars().all(|c| "imsx".contains(c));
                    if !allowed(on) || !allowed(off) {
                        return Err(self.err(
                            "Inline flags outside imsx not supported in Python",
                            node,
                        ));
                    }
                    if !scoped {
                        // A global flag group anywhere but the very start is
                        // invalid for the re module; hoist the flags into the
                        // re.compile constructor instead.
                        if !off.is_empty() {
                            return Err(self.err(
                                "Unsetting flags in a directive has no re.compile equivalent",
                                node,
                            ));
                        }
                        for c in on.chars() {
                            self.ctx.require_flag(c);
                        }
                        self.ctx.warn(
                            "Hoisted an inline flag directive into the re.compile flags; \
                             it now applies to the whole pattern",
                        );
                        return Ok(String::new());
                    }
                    let mut text = format!("?{on}");
                    if !off.is_empty() {
                        text.push('-');
                        text.push_str(off);
                    }
                    text.push(':');
                    text
                }
            },
            GroupKind::BranchReset => {
                return Err(self.err("Branch reset groups are not supported by the target", node))
            }
        };
        let inner = self.emit(child)?;
        Ok(format!("({prefix}{inner})"))
    }

    fn emit_quantifier(
        &mut self,
        node: &Node,
        inner: &Node,
        kind: QuantifierKind,
        mode: QuantMode,
    ) -> Result<String, TranspileError> {
        let mode = match (self.ungreedy, mode) {
            (true, QuantMode::Greedy) => QuantMode::Lazy,
            (true, QuantMode::Lazy) => QuantMode::Greedy,
            (_, other) => other,
        };
        let suffix = match kind {
            QuantifierKind::Star => "*".to_string(),
            QuantifierKind::Plus => "+".to_string(),
            QuantifierKind::Question => "?".to_string(),
            QuantifierKind::Exact(n) => format!("{{{n}}}"),
            QuantifierKind::AtLeast(n) => format!("{{{n},}}"),
            QuantifierKind::Range(n, m) => format!("{{{n},{m}}}"),
        };
        let mode_suffix = match mode {
            QuantMode::Greedy => "",
            QuantMode::Lazy => "?",
            QuantMode::Possessive => match self.target {
                Target::JavaScript => {
                    return Err(
                        self.err("Possessive quantifiers not supported in JavaScript", node)
                    )
                }
                Target::Python => {
                    self.ctx.note("Possessive quantifiers require Python 3.11+");
                    "+"
                }
            },
        };
        Ok(format!("{}{suffix}{mode_suffix}", self.emit(inner)?))
    }

    fn emit_char_literal(
        &mut self,
        original: &str,
        code_point: u32,
        kind: CharLiteralKind,
    ) -> Result<String, TranspileError> {
        match kind {
            CharLiteralKind::Hex => Ok(original.to_string()),
            CharLiteralKind::Unicode | CharLiteralKind::UnicodeNamed => match self.target {
                Target::JavaScript => {
                    self.ctx.require_flag('u');
                    self.ctx.warn("Added /u for Unicode code point escapes.");
                    Ok(format!("\\u{{{code_point:X}}}"))
                }
                Target::Python => {
                    self.ctx.note("Rewrote \\x{…} escapes in Python spelling");
                    if code_point <= 0xFFFF {
                        Ok(format!("\\u{code_point:04X}"))
                    } else {
                        Ok(format!("\\U{code_point:08X}"))
                    }
                }
            },
            CharLiteralKind::Octal | CharLiteralKind::OctalLegacy => {
                self.ctx.note("Rewrote octal escapes as hex escapes");
                if code_point <= 0xFF {
                    Ok(format!("\\x{code_point:02X}"))
                } else {
                    match self.target {
                        Target::JavaScript => {
                            self.ctx.require_flag('u');
                            Ok(format!("\\u{{{code_point:X}}}"))
                        }
                        Target::Python => Ok(format!("\\u{code_point:04X}")),
                    }
                }
            }
        }
    }

    fn emit_assertion(
        &mut self,
        node: &Node,
        kind: AssertionKind,
    ) -> Result<String, TranspileError> {
        match kind {
            AssertionKind::WordBoundary => Ok("\\b".to_string()),
            AssertionKind::NotWordBoundary => Ok("\\B".to_string()),
            AssertionKind::BufferStart => match self.target {
                Target::JavaScript => {
                    self.ctx.warn("Replaced \\A with ^; they differ under the m flag");
                    Ok("^".to_string())
                }
                Target::Python => Ok("\\A".to_string()),
            },
            AssertionKind::BufferEnd => match self.target {
                Target::JavaScript => {
                    self.ctx.warn("Replaced \\z with $; they differ under the m flag");
                    Ok("$".to_string())
                }
                Target::Python => Ok("\\Z".to_string()),
            },
            AssertionKind::BufferEndNewline => match self.target {
                Target::JavaScript => {
                    self.ctx.warn("Replaced \\Z with $; a final newline is treated differently");
                    Ok("$".to_string())
                }
                Target::Python => {
                    self.ctx.warn(
                        "Python \\Z matches only at the very end; PCRE \\Z allows a final newline",
                    );
                    Ok("\\Z".to_string())
                }
            },
            AssertionKind::MatchStart => {
                Err(self.err("\\G is not supported by the target", node))
            }
            AssertionKind::GraphemeBoundary | AssertionKind::NotGraphemeBoundary => {
                Err(self.err("Grapheme boundary assertions are not supported by the target", node))
            }
        }
    }

    fn emit_char_type(&mut self, kind: CharTypeKind) -> Result<String, TranspileError> {
        match kind {
            CharTypeKind::Digit
            | CharTypeKind::NotDigit
            | CharTypeKind::Space
            | CharTypeKind::NotSpace
            | CharTypeKind::Word
            | CharTypeKind::NotWord => Ok(format!("\\{}", kind.letter())),
            CharTypeKind::Newline => {
                self.ctx.note("Expanded \\R to an explicit newline alternation");
                Ok("(?:\\r\\n|[\\n\\x0B\\f\\r\\x85\\u2028\\u2029])".to_string())
            }
            CharTypeKind::HorizontalSpace
            | CharTypeKind::NotHorizontalSpace
            | CharTypeKind::VerticalSpace
            | CharTypeKind::NotVerticalSpace => {
                self.ctx.note(format!(
                    "Expanded \\{} to an explicit character class",
                    kind.letter()
                ));
                let negated = matches!(
                    kind,
                    CharTypeKind::NotHorizontalSpace | CharTypeKind::NotVerticalSpace
                );
                let base = char_type_set(match kind {
                    CharTypeKind::HorizontalSpace | CharTypeKind::NotHorizontalSpace => {
                        CharTypeKind::HorizontalSpace
                    }
                    _ => CharTypeKind::VerticalSpace,
                });
                Ok(self.class_from_set(&base, negated))
            }
        }
    }

    fn emit_posix_class(&mut self, node: &Node, name: &str) -> Result<String, TranspileError> {
        let (negated, bare) = match name.strip_prefix('^') {
            Some(stripped) => (true, stripped),
            None => (false, name),
        };
        let set = posix_class_set(bare)
            .ok_or_else(|| self.err(format!("Unknown POSIX class [:{bare}:]"), node))?;
        // posix sets are ASCII; clamp the complement accordingly
        let set = if negated {
            CharSet::from_range(0, 0x7F).subtract(&set)
        } else {
            set
        };
        self.ctx
            .note(format!("Expanded [:{name}:] to explicit ranges"));
        Ok(self.ranges_text(&set))
    }

    fn emit_conditional(
        &mut self,
        node: &Node,
        condition: &Node,
        yes: &Node,
        no: Option<&Node>,
    ) -> Result<String, TranspileError> {
        if self.target == Target::JavaScript {
            return Err(self.err("Conditional groups not supported in JavaScript", node));
        }
        let head = match &condition.kind {
            NodeKind::Backref { target: RefTarget::Index(n) } => format!("{n}"),
            NodeKind::Backref { target: RefTarget::Name(name) } => name.clone(),
            _ => {
                return Err(self.err(
                    "Python conditionals support only group-existence tests",
                    node,
                ))
            }
        };
        let mut out = format!("(?({head}){}", self.emit(yes)?);
        if let Some(no) = no {
            out.push('|');
            out.push_str(&self.emit(no)?);
        }
        out.push(')');
        Ok(out)
    }

    fn class_from_set(&mut self, set: &CharSet, negated: bool) -> String {
        let body = self.ranges_text(set);
        if self.in_class {
            // inside a class the caller supplies brackets; negation cannot
            // be expressed, so fall back to the positive set
            return body;
        }
        format!("[{}{body}]", if negated { "^" } else { "" })
    }

    fn ranges_text(&mut self, set: &CharSet) -> String {
        let mut out = String::new();
        for &(lo, hi) in set.ranges() {
            out.push_str(&self.escaped_code_point(lo));
            if hi > lo {
                out.push('-');
                out.push_str(&self.escaped_code_point(hi));
            }
        }
        out
    }

    fn escaped_code_point(&mut self, cp: u32) -> String {
        match cp {
            0x09 => "\\t".to_string(),
            0x0A => "\\n".to_string(),
            0x0D => "\\r".to_string(),
            0x0C => "\\f".to_string(),
            0x0B => "\\x0B".to_string(),
            0x20..=0x7E => {
                let ch = char::from_u32(cp).unwrap_or('?');
                self.escape_literal(&ch.to_string())
            }
            0x00..=0xFF => format!("\\x{cp:02X}"),
            _ => match self.target {
                Target::JavaScript => format!("\\u{{{cp:X}}}"),
                Target::Python if cp <= 0xFFFF => format!("\\u{cp:04X}"),
                Target::Python => format!("\\U{cp:08X}"),
            },
        }
    }

    fn escape_literal(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len());
        for ch in value.chars() {
            match ch {
                '\t' => out.push_str("\\t"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\x0C' => out.push_str("\\f"),
                '\x07' => out.push_str("\\x07"),
                '\x1B' => out.push_str("\\x1B"),
                c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02X}", c as u32)),
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
                    let is_delimiter = match self.target {
                        Target::JavaScript => c == '/',
                        Target::Python => c == '"',
                    };
                    if needs_escape || is_delimiter {
                        out.push('\\');
                    }
                    out.push(c);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transpile;
    use pcre_parser::Parser;

    fn js(source: &str) -> Result<TranspileResult, TranspileError> {
        let ast = Parser::new().parse(source).unwrap();
        transpile(&ast, Target::JavaScript)
    }

    fn py(source: &str) -> Result<TranspileResult, TranspileError> {
        let ast = Parser::new().parse(source).unwrap();
        transpile(&ast, Target::Python)
    }

    #[test]
    fn unicode_escape_adds_u_flag_for_js() {
        let result = js(r"/\x{1F600}/").unwrap();
        assert_eq!(result.literal, r"/\u{1F600}/u");
        assert!(result
            .warnings
            .contains(&"Added /u for Unicode code point escapes.".to_string()));
    }

    #[test]
    fn possessive_quantifier_fails_for_js() {
        let err = js("/a++/").unwrap_err();
        assert_eq!(err.message, "Possessive quantifiers not supported in JavaScript");
    }

    #[test]
    fn atomic_group_fails_for_js_but_notes_for_python() {
        assert!(js("/(?>a)/").is_err());
        let result = py("/(?>a)/").unwrap();
        assert_eq!(result.pattern, "(?>a)");
        assert!(result.notes.iter().any(|n| n.contains("3.11")));
    }

    #[test]
    fn named_groups_use_target_syntax() {
        let result = js("/(?P<word>a)/").unwrap();
        assert_eq!(result.pattern, "(?<word>a)");
        let result = py("/(?<word>a)/").unwrap();
        assert_eq!(result.pattern, "(?P<word>a)");
    }

    #[test]
    fn named_backrefs_use_target_syntax() {
        let result = js(r"/(?<w>a)\k<w>/").unwrap();
        assert_eq!(result.pattern, r"(?<w>a)\k<w>");
        let result = py(r"/(?<w>a)\k<w>/").unwrap();
        assert_eq!(result.pattern, r"(?P<w>a)(?P=w)");
    }

    #[test]
    fn flags_map_into_the_literal() {
        let result = js("/a/im").unwrap();
        assert_eq!(result.literal, "/a/im");
        let result = py("/a/is").unwrap();
        assert_eq!(result.literal, "re.compile(r\"a\", re.I | re.S)");
    }

    #[test]
    fn python_flag_directive_hoists_into_constructor() {
        let result = py("/a(?i)bc/").unwrap();
        assert_eq!(result.pattern, "abc");
        assert!(result.flags.contains('i'));
        assert_eq!(result.literal, "re.compile(r\"abc\", re.I)");
        assert!(result.warnings.iter().any(|w| w.contains("whole pattern")));
    }

    #[test]
    fn python_flag_unsetting_directive_fails() {
        let err = py("/(?-i)a/").unwrap_err();
        assert!(err.message.contains("no re.compile equivalent"));
    }

    #[test]
    fn ungreedy_flag_swaps_modes() {
        let result = js("/a+b+?/U").unwrap();
        assert_eq!(result.pattern, "a+?b+");
    }

    #[test]
    fn buffer_assertions_degrade_for_js() {
        let result = js(r"/\Aabc\z/").unwrap();
        assert_eq!(result.pattern, "^abc$");
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn subroutines_fail_for_both_targets() {
        assert!(js("/(a)(?1)/").is_err());
        assert!(py("/(a)(?1)/").is_err());
    }

    #[test]
    fn conditionals_work_for_python_only() {
        assert!(js("/(a)(?(1)b|c)/").is_err());
        let result = py("/(a)(?(1)b|c)/").unwrap();
        assert_eq!(result.pattern, "(a)(?(1)b|c)");
    }

    #[test]
    fn unicode_property_fails_for_python() {
        let err = py(r"/\p{L}/").unwrap_err();
        assert!(err.message.contains("re module"));
        let result = js(r"/\p{L}/").unwrap();
        assert_eq!(result.pattern, r"\p{L}");
        assert!(result.flags.contains('u'));
    }

    #[test]
    fn newline_type_expands() {
        let result = js(r"/\R/").unwrap();
        assert!(result.pattern.starts_with("(?:"));
        assert!(result.notes.iter().any(|n| n.contains("\\R")));
    }

    #[test]
    fn posix_class_expands_to_ranges() {
        let result = js("/[[:digit:]]/").unwrap();
        assert_eq!(result.pattern, "[0-9]");
    }

    #[test]
    fn comments_drop_in_js_and_stay_in_python() {
        let result = js("/a(?#note)b/").unwrap();
        assert_eq!(result.pattern, "ab");
        let result = py("/a(?#note)b/").unwrap();
        assert_eq!(result.pattern, "a(?#note)b");
    }

    #[test]
    fn result_serializes_for_the_report() {
        let result = js("/a/i").unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["target"], "javascript");
        assert_eq!(json["literal"], "/a/i");
    }
}
