//! Plain-language pattern explanation.

use pcre_ast::{
    AnchorKind, AssertionKind, AstVisitor, CalloutId, CharTypeKind, ClassOp, GroupKind, Node,
    NodeKind, QuantMode, QuantifierKind, RefTarget,
};

/// Renders a pattern as an indented, human-readable outline.
#[derive(Debug, Default)]
pub struct Explainer {
    depth: usize,
}

impl Explainer {
    /// Create an explainer.
    pub fn new() -> Self {
        Explainer::default()
    }

    /// Explain a whole tree.
    pub fn explain(&mut self, node: &Node) -> String {
        self.visit(node)
    }

    fn line(&self, text: impl AsRef<str>) -> String {
        format!("{}{}\n", "  ".repeat(self.depth), text.as_ref())
    }

    fn nested(&mut self, header: impl AsRef<str>, children: &[&Node]) -> String {
        let mut out = self.line(header);
        self.depth += 1;
        for child in children {
            out.push_str(&self.visit(child));
        }
        self.depth -= 1;
        out
    }

    fn quantifier_phrase(kind: QuantifierKind, mode: QuantMode) -> String {
        let count = match kind {
            QuantifierKind::Star => "zero or more times".to_string(),
            QuantifierKind::Plus => "one or more times".to_string(),
            QuantifierKind::Question => "optionally".to_string(),
            QuantifierKind::Exact(n) => format!("exactly {n} times"),
            QuantifierKind::AtLeast(n) => format!("at least {n} times"),
            QuantifierKind::Range(n, m) => format!("between {n} and {m} times"),
        };
        let mode = match mode {
            QuantMode::Greedy => "greedy",
            QuantMode::Lazy => "lazy",
            QuantMode::Possessive => "possessive",
        };
        format!("Repeat {count} ({mode}):")
    }

    fn char_type_phrase(kind: CharTypeKind) -> &'static str {
        match kind {
            CharTypeKind::Digit => "a digit",
            CharTypeKind::NotDigit => "a non-digit",
            CharTypeKind::Space => "a whitespace character",
            CharTypeKind::NotSpace => "a non-whitespace character",
            CharTypeKind::Word => "a word character",
            CharTypeKind::NotWord => "a non-word character",
            CharTypeKind::HorizontalSpace => "a horizontal whitespace character",
            CharTypeKind::NotHorizontalSpace => "a non-horizontal-whitespace character",
            CharTypeKind::VerticalSpace => "a vertical whitespace character",
            CharTypeKind::NotVerticalSpace => "a non-vertical-whitespace character",
            CharTypeKind::Newline => "a newline sequence",
        }
    }

    fn group_phrase(kind: &GroupKind) -> String {
        match kind {
            GroupKind::Capturing { index } => format!("Capturing group #{index}:"),
            GroupKind::NonCapturing => "Group (non-capturing):".to_string(),
            GroupKind::Named { name, index, .. } => {
                format!("Named capturing group \"{name}\" (#{index}):")
            }
            GroupKind::LookaheadPositive => "Lookahead (must be followed by):".to_string(),
            GroupKind::LookaheadNegative => "Negative lookahead (must not be followed by):".to_string(),
            GroupKind::LookbehindPositive => "Lookbehind (must be preceded by):".to_string(),
            GroupKind::LookbehindNegative => "Negative lookbehind (must not be preceded by):".to_string(),
            GroupKind::Atomic => "Atomic group (no backtracking):".to_string(),
            GroupKind::BranchReset => "Branch-reset group:".to_string(),
            GroupKind::InlineFlags { on, off, scoped } => {
                let mut parts = Vec::new();
                if !on.is_empty() {
                    parts.push(format!("enable \"{on}\""));
                }
                if !off.is_empty() {
                    parts.push(format!("disable \"{off}\""));
                }
                let change = parts.join(", ");
                if *scoped {
                    format!("Scoped flags ({change}):")
                } else {
                    format!("Set flags ({change})")
                }
            }
        }
    }
}

impl AstVisitor for Explainer {
    type Output = String;

    fn visit(&mut self, node: &Node) -> String {
        match &node.kind {
            NodeKind::Regex { flags, pattern, .. } => {
                let header = if flags.is_empty() {
                    "Pattern:".to_string()
                } else {
                    format!("Pattern (flags: {flags}):")
                };
                self.nested(header, &[pattern])
            }
            NodeKind::Sequence { children } => {
                children.iter().map(|c| self.visit(c)).collect()
            }
            NodeKind::Alternation { alternatives } => {
                let mut out = self.line("Match any of:");
                self.depth += 1;
                for (i, alt) in alternatives.iter().enumerate() {
                    out.push_str(&self.line(format!("Alternative {}:", i + 1)));
                    self.depth += 1;
                    out.push_str(&self.visit(alt));
                    self.depth -= 1;
                }
                self.depth -= 1;
                out
            }
            NodeKind::Group { kind, child } => {
                if let GroupKind::InlineFlags { scoped: false, .. } = kind {
                    return self.line(Self::group_phrase(kind));
                }
                self.nested(Self::group_phrase(kind), &[child])
            }
            NodeKind::Quantifier { node, kind, mode } => {
                self.nested(Self::quantifier_phrase(*kind, *mode), &[node])
            }
            NodeKind::Literal { value, is_raw } => {
                if *is_raw {
                    self.line(format!("Match the text {value:?} verbatim"))
                } else {
                    self.line(format!("Match {value:?}"))
                }
            }
            NodeKind::CharLiteral { original, code_point, .. } => self.line(format!(
                "Match the character U+{code_point:04X} (written {original})"
            )),
            NodeKind::Dot => self.line("Match any character (except newline unless s is set)"),
            NodeKind::Anchor { kind } => self.line(match kind {
                AnchorKind::Start => "Assert position at the start of the line",
                AnchorKind::End => "Assert position at the end of the line",
            }),
            NodeKind::Assertion { kind } => self.line(match kind {
                AssertionKind::BufferStart => "Assert position at the start of the subject",
                AssertionKind::BufferEnd => "Assert position at the very end of the subject",
                AssertionKind::BufferEndNewline => {
                    "Assert position at the end of the subject (before a final newline)"
                }
                AssertionKind::MatchStart => "Assert position where the last match ended",
                AssertionKind::WordBoundary => "Assert a word boundary",
                AssertionKind::NotWordBoundary => "Assert not at a word boundary",
                AssertionKind::GraphemeBoundary => "Assert a grapheme cluster boundary",
                AssertionKind::NotGraphemeBoundary => "Assert not at a grapheme cluster boundary",
            }),
            NodeKind::CharType { kind } => {
                self.line(format!("Match {}", Self::char_type_phrase(*kind)))
            }
            NodeKind::UnicodeProp { prop, .. } => match prop.strip_prefix('^') {
                Some(name) => {
                    self.line(format!("Match a character without the Unicode property {name}"))
                }
                None => self.line(format!("Match a character with the Unicode property {prop}")),
            },
            NodeKind::PosixClass { name } => {
                self.line(format!("Match a character in the POSIX class [:{name}:]"))
            }
            NodeKind::CharClass { negated, expression } => {
                let header = if *negated {
                    "Match a character outside the set:"
                } else {
                    "Match a character in the set:"
                };
                self.nested(header, &[expression])
            }
            NodeKind::Range { start, end } => {
                let mut out = self.line("Range:");
                self.depth += 1;
                out.push_str(&self.visit(start));
                out.push_str(&self.line("through"));
                out.push_str(&self.visit(end));
                self.depth -= 1;
                out
            }
            NodeKind::ClassOperation { op, left, right } => {
                let header = match op {
                    ClassOp::Intersection => "Intersection of:",
                    ClassOp::Subtraction => "Subtraction of:",
                };
                self.nested(header, &[left, right])
            }
            NodeKind::Backref { target } => match target {
                RefTarget::Index(n) => self.line(format!("Match the same text as group #{n}")),
                RefTarget::Relative(n) => {
                    self.line(format!("Match the same text as the group {n} back"))
                }
                RefTarget::Name(name) => {
                    self.line(format!("Match the same text as group \"{name}\""))
                }
            },
            NodeKind::ControlChar { ch } => self.line(format!("Match the control character ^{ch}")),
            NodeKind::Keep => self.line("Reset the start of the reported match (\\K)"),
            NodeKind::Comment { text } => self.line(format!("Comment: {text}")),
            NodeKind::Conditional { condition, yes, no } => {
                let mut out = self.line("Conditional:");
                self.depth += 1;
                out.push_str(&self.line("If:"));
                self.depth += 1;
                out.push_str(&self.visit(condition));
                self.depth -= 1;
                out.push_str(&self.line("Then:"));
                self.depth += 1;
                out.push_str(&self.visit(yes));
                self.depth -= 1;
                if let Some(no) = no {
                    out.push_str(&self.line("Else:"));
                    self.depth += 1;
                    out.push_str(&self.visit(no));
                    self.depth -= 1;
                }
                self.depth -= 1;
                out
            }
            NodeKind::Define { content } => {
                self.nested("Definitions (not matched directly):", &[content])
            }
            NodeKind::Subroutine { target } => match target {
                RefTarget::Index(0) => self.line("Recurse into the whole pattern"),
                RefTarget::Index(n) => self.line(format!("Call the subpattern of group #{n}")),
                RefTarget::Relative(n) => {
                    self.line(format!("Call the subpattern {n} groups away"))
                }
                RefTarget::Name(name) => {
                    self.line(format!("Call the subpattern named \"{name}\""))
                }
            },
            NodeKind::ScriptRun { script, body } => {
                self.nested(format!("Script run ({script}):"), &[body])
            }
            NodeKind::VersionCondition { version, .. } => {
                self.line(format!("If the PCRE version is at least {version}"))
            }
            NodeKind::PcreVerb { verb, arg } => match arg {
                Some(arg) => self.line(format!("Backtracking verb (*{verb}:{arg})")),
                None => self.line(format!("Backtracking verb (*{verb})")),
            },
            NodeKind::Callout { id, .. } => match id {
                CalloutId::Number(n) => self.line(format!("Callout #{n}")),
                CalloutId::Tag(tag) => self.line(format!("Callout \"{tag}\"")),
            },
            NodeKind::LimitMatch { limit } => {
                self.line(format!("Limit the match count to {limit}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcre_parser::Parser;

    #[test]
    fn explains_a_simple_pattern() {
        let ast = Parser::new().parse("/a+|b/i").unwrap();
        let text = Explainer::new().explain(&ast);
        assert!(text.starts_with("Pattern (flags: i):"));
        assert!(text.contains("Match any of:"));
        assert!(text.contains("Repeat one or more times (greedy):"));
        assert!(text.contains("Match \"a\""));
    }

    #[test]
    fn explanation_is_deterministic() {
        let ast = Parser::new().parse("/(?<w>x)[0-9]$/").unwrap();
        let first = Explainer::new().explain(&ast);
        let second = Explainer::new().explain(&ast);
        assert_eq!(first, second);
    }
}
