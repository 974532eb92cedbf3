//! Recursive-descent parser for PCRE2 patterns.
//!
//! Consumes the [`TokenStream`] produced by `pcre-lexer` and builds the
//! typed AST from `pcre-ast`. The parser owns delimiter stripping and flag
//! validation; everything downstream works on the tree.
//!
//! # Usage
//!
//! ```
//! use pcre_parser::Parser;
//! use pcre_ast::NodeKind;
//!
//! let ast = Parser::new().parse("/a|b/i").unwrap();
//! let NodeKind::Regex { delimiter, flags, .. } = &ast.kind else { unreachable!() };
//! assert_eq!(*delimiter, '/');
//! assert!(flags.ignore_case);
//! ```
//!
//! # Limits
//!
//! [`ParserOptions`] bounds recursion depth and node count so pathological
//! patterns fail with a typed error instead of exhausting the stack.

pub mod error;
mod registry;

pub use error::{ParseError, ParseResult};

use pcre_ast::{
    AnchorKind, AssertionKind, CalloutId, CharLiteralKind, CharTypeKind, ClassOp, Flags, GroupKind,
    NamedSyntax, Node, NodeKind, QuantMode, QuantifierKind, RefTarget, Span, VersionOp,
    FLAG_ALPHABET,
};
use pcre_lexer::{Lexer, LexerOptions};
use pcre_token::{Token, TokenKind, TokenStream};
use registry::GroupRegistry;
use tracing::trace;

/// Parser limits.
#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    /// Maximum nesting depth of the descent
    pub max_recursion_depth: usize,
    /// Maximum number of AST nodes for one pattern
    pub max_nodes: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions { max_recursion_depth: 64, max_nodes: 100_000 }
    }
}

/// Recursive-descent pattern parser.
#[derive(Debug, Default)]
pub struct Parser {
    options: ParserOptions,
}

impl Parser {
    /// Create a parser with default limits.
    pub fn new() -> Self {
        Parser { options: ParserOptions::default() }
    }

    /// Create a parser with explicit limits.
    pub fn with_options(options: ParserOptions) -> Self {
        Parser { options }
    }

    /// Parse a delimited pattern (`/body/flags`) into a `Regex` node.
    pub fn parse(&self, source: &str) -> ParseResult<Node> {
        trace!(len = source.len(), "parsing pattern");
        let (delimiter, body, flag_str, body_offset) = split_delimited(source)?;
        let flags = Flags::parse(flag_str).map_err(|e| ParseError::UnknownFlags {
            unknown: e.unknown,
            offset: body_offset + body.len() + 1,
        })?;
        let lexer_options = LexerOptions { unicode: flags.unicode, extended: flags.extended };
        let stream = Lexer::with_options(body, lexer_options)
            .at_offset(body_offset)
            .tokenize()?;
        let mut run = Run {
            stream,
            registry: GroupRegistry::new(),
            node_count: 0,
            options: self.options,
        };
        let pattern = run.parse_alternation(0)?;
        let trailing = run.stream.peek().clone();
        if trailing.kind != TokenKind::Eof {
            return Err(ParseError::UnexpectedToken { kind: trailing.kind, offset: trailing.start });
        }
        run.node(
            NodeKind::Regex { delimiter, flags, pattern: Box::new(pattern) },
            Span::new(0, source.len()),
        )
    }
}

/// Split `/body/flags` into its parts. Paired delimiters close with their
/// counterpart; any other delimiter closes with itself at its last
/// occurrence.
fn split_delimited(source: &str) -> ParseResult<(char, &str, &str, usize)> {
    let open = source.chars().next().ok_or(ParseError::InvalidDelimiter { offset: 0 })?;
    if open.is_alphanumeric() || open == '\\' || open.is_whitespace() {
        return Err(ParseError::InvalidDelimiter { offset: 0 });
    }
    let close = match open {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        '<' => '>',
        other => other,
    };
    let body_offset = open.len_utf8();
    let rest = &source[body_offset..];
    let close_idx = rest.rfind(close).ok_or(ParseError::MissingEndDelimiter {
        delimiter: close,
        offset: source.len(),
    })?;
    let body = &rest[..close_idx];
    let flags = &rest[close_idx + close.len_utf8()..];
    Ok((open, body, flags, body_offset))
}

/// One parse in flight: the stream, capture numbering, and budgets.
struct Run {
    stream: TokenStream,
    registry: GroupRegistry,
    node_count: usize,
    options: ParserOptions,
}

impl Run {
    fn node(&mut self, kind: NodeKind, span: Span) -> ParseResult<Node> {
        self.node_count += 1;
        if self.node_count > self.options.max_nodes {
            return Err(ParseError::TooManyNodes { limit: self.options.max_nodes });
        }
        Ok(Node::new(kind, span))
    }

    fn check_depth(&self, depth: usize) -> ParseResult<()> {
        if depth > self.options.max_recursion_depth {
            return Err(ParseError::RecursionLimit { offset: self.stream.position() });
        }
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        let token = self.stream.next();
        if token.kind == kind {
            Ok(token)
        } else if token.kind == TokenKind::Eof {
            Err(ParseError::UnexpectedEof { offset: token.start })
        } else {
            Err(ParseError::UnexpectedToken { kind: token.kind, offset: token.start })
        }
    }

    /// Collapse a child list: empty list becomes an empty `Sequence`, a
    /// single child stands alone, anything longer becomes a `Sequence`.
    fn sequence(&mut self, mut children: Vec<Node>, at: usize) -> ParseResult<Node> {
        match children.len() {
            0 => self.node(NodeKind::Sequence { children }, Span::new(at, at)),
            1 => children.pop().ok_or(ParseError::UnexpectedEof { offset: at }),
            _ => {
                let span = children
                    .iter()
                    .fold(children[0].span, |acc, c| acc.cover(c.span));
                self.node(NodeKind::Sequence { children }, span)
            }
        }
    }

    // ===== grammar =====

    fn parse_alternation(&mut self, depth: usize) -> ParseResult<Node> {
        self.check_depth(depth)?;
        let at = self.stream.position();
        let mut alternatives = vec![self.parse_sequence(depth + 1)?];
        while self.stream.peek().kind == TokenKind::Alternation {
            self.stream.next();
            alternatives.push(self.parse_sequence(depth + 1)?);
        }
        if alternatives.len() == 1 {
            return alternatives.pop().ok_or(ParseError::UnexpectedEof { offset: at });
        }
        let span = alternatives
            .iter()
            .fold(alternatives[0].span, |acc, a| acc.cover(a.span));
        self.node(NodeKind::Alternation { alternatives }, span)
    }

    fn parse_sequence(&mut self, depth: usize) -> ParseResult<Node> {
        self.check_depth(depth)?;
        let at = self.stream.position();
        let mut children: Vec<Node> = Vec::new();
        loop {
            let peeked = self.stream.peek();
            match peeked.kind {
                TokenKind::Eof | TokenKind::GroupClose | TokenKind::Alternation => break,
                TokenKind::Quantifier => {
                    let token = self.stream.next();
                    let Some(prev) = children.pop() else {
                        return Err(ParseError::UnexpectedToken {
                            kind: TokenKind::Quantifier,
                            offset: token.start,
                        });
                    };
                    children.push(self.make_quantifier(prev, &token)?);
                }
                _ => children.push(self.parse_atom(depth + 1)?),
            }
        }
        self.sequence(children, at)
    }

    fn make_quantifier(&mut self, node: Node, token: &Token) -> ParseResult<Node> {
        let value: &str = &token.value;
        let kind = if let Some(inner) = value.strip_prefix('{').and_then(|v| v.strip_suffix('}')) {
            match inner.split_once(',') {
                None => QuantifierKind::Exact(parse_u32(inner, token.start)?),
                Some((min, "")) => QuantifierKind::AtLeast(parse_u32(min, token.start)?),
                Some((min, max)) => {
                    let min = parse_u32(min, token.start)?;
                    let max = parse_u32(max, token.start)?;
                    if min > max {
                        return Err(ParseError::InvalidQuantifierRange {
                            min,
                            max,
                            offset: token.start,
                        });
                    }
                    QuantifierKind::Range(min, max)
                }
            }
        } else {
            match value {
                "*" => QuantifierKind::Star,
                "+" => QuantifierKind::Plus,
                _ => QuantifierKind::Question,
            }
        };
        let mode = if token.text.len() > value.len() {
            match token.text.as_bytes()[token.text.len() - 1] {
                b'?' => QuantMode::Lazy,
                _ => QuantMode::Possessive,
            }
        } else {
            QuantMode::Greedy
        };
        let span = Span::new(node.span.start, token.end);
        self.node(NodeKind::Quantifier { node: Box::new(node), kind, mode }, span)
    }

    fn parse_atom(&mut self, depth: usize) -> ParseResult<Node> {
        self.check_depth(depth)?;
        let token = self.stream.next();
        let span = Span::new(token.start, token.end);
        match token.kind {
            TokenKind::Literal | TokenKind::LiteralEscaped => {
                self.node(NodeKind::Literal { value: token.value.to_string(), is_raw: false }, span)
            }
            TokenKind::Dot => self.node(NodeKind::Dot, span),
            TokenKind::Anchor => {
                let kind = if &*token.text == "^" { AnchorKind::Start } else { AnchorKind::End };
                self.node(NodeKind::Anchor { kind }, span)
            }
            TokenKind::Assertion => {
                let kind = assertion_kind(&token.value, token.start)?;
                self.node(NodeKind::Assertion { kind }, span)
            }
            TokenKind::CharType => {
                let kind = char_type_kind(&token.value, token.start)?;
                self.node(NodeKind::CharType { kind }, span)
            }
            TokenKind::UnicodeProp => self.node(
                NodeKind::UnicodeProp {
                    prop: token.value.to_string(),
                    has_braces: token.text.contains('{'),
                },
                span,
            ),
            TokenKind::Unicode | TokenKind::Octal | TokenKind::OctalLegacy => {
                self.char_literal(&token)
            }
            TokenKind::UnicodeNamed => self.unicode_named(&token),
            TokenKind::ControlChar => {
                let ch = token.value.chars().next().unwrap_or('\0');
                self.node(NodeKind::ControlChar { ch }, span)
            }
            TokenKind::Backref => {
                let target = parse_ref_target(&token.value);
                self.node(NodeKind::Backref { target }, span)
            }
            TokenKind::GReference => {
                let target = parse_subroutine_target(&token.value);
                self.node(NodeKind::Subroutine { target }, span)
            }
            TokenKind::Keep => self.node(NodeKind::Keep, span),
            TokenKind::QuoteModeStart => self.parse_quoted(&token),
            TokenKind::CommentOpen => self.parse_comment(&token),
            TokenKind::PcreVerb => self.parse_verb(&token, depth),
            TokenKind::Callout => self.parse_callout(&token),
            TokenKind::GroupOpen => {
                let index = self.registry.allocate();
                self.parse_group(&token, GroupKind::Capturing { index }, depth)
            }
            TokenKind::GroupModifierOpen => self.parse_modified_group(&token, depth),
            TokenKind::CharClassOpen => self.parse_char_class(&token, depth),
            TokenKind::Eof => Err(ParseError::UnexpectedEof { offset: token.start }),
            other => Err(ParseError::UnexpectedToken { kind: other, offset: token.start }),
        }
    }

    /// `\Q literal \E` becomes one raw literal node.
    fn parse_quoted(&mut self, open: &Token) -> ParseResult<Node> {
        let mut value = String::new();
        let mut end = open.end;
        if self.stream.peek().kind == TokenKind::Literal {
            let body = self.stream.next();
            value = body.text.to_string();
            end = body.end;
        }
        if self.stream.peek().kind == TokenKind::QuoteModeEnd {
            end = self.stream.next().end;
        }
        self.node(NodeKind::Literal { value, is_raw: true }, Span::new(open.start, end))
    }

    fn parse_comment(&mut self, open: &Token) -> ParseResult<Node> {
        let mut text = String::new();
        if self.stream.peek().kind == TokenKind::CommentBody {
            text = self.stream.next().text.to_string();
        }
        let close = self.expect(TokenKind::CommentClose)?;
        self.node(NodeKind::Comment { text }, Span::new(open.start, close.end))
    }

    fn parse_verb(&mut self, token: &Token, depth: usize) -> ParseResult<Node> {
        let value: &str = &token.value;
        if value == "script_run" || value == "atomic_script_run" {
            let body = self.parse_alternation(depth + 1)?;
            let close = self.expect(TokenKind::GroupClose)?;
            return self.node(
                NodeKind::ScriptRun { script: value.to_string(), body: Box::new(body) },
                Span::new(token.start, close.end),
            );
        }
        let span = Span::new(token.start, token.end);
        if let Some((name, arg)) = value.split_once('=') {
            if name == "LIMIT_MATCH" {
                let limit = parse_u32(arg, token.start)?;
                return self.node(NodeKind::LimitMatch { limit }, span);
            }
            return self.node(
                NodeKind::PcreVerb { verb: name.to_string(), arg: Some(arg.to_string()) },
                span,
            );
        }
        if let Some((name, arg)) = value.split_once(':') {
            return self.node(
                NodeKind::PcreVerb { verb: name.to_string(), arg: Some(arg.to_string()) },
                span,
            );
        }
        self.node(NodeKind::PcreVerb { verb: value.to_string(), arg: None }, span)
    }

    fn parse_callout(&mut self, token: &Token) -> ParseResult<Node> {
        let value: &str = &token.value;
        let span = Span::new(token.start, token.end);
        if value.is_empty() {
            return self.node(NodeKind::Callout { id: CalloutId::Number(0), has_paren: false }, span);
        }
        if value.bytes().all(|b| b.is_ascii_digit()) {
            let id = CalloutId::Number(parse_u32(value, token.start)?);
            return self.node(NodeKind::Callout { id, has_paren: false }, span);
        }
        // quoted or braced tag; strip the delimiters
        let tag = value
            .get(1..value.len().saturating_sub(1))
            .unwrap_or_default()
            .to_string();
        self.node(NodeKind::Callout { id: CalloutId::Tag(tag), has_paren: true }, span)
    }

    fn parse_group(&mut self, open: &Token, kind: GroupKind, depth: usize) -> ParseResult<Node> {
        let child = self.parse_alternation(depth + 1)?;
        let close = self.expect(TokenKind::GroupClose)?;
        self.node(
            NodeKind::Group { kind, child: Box::new(child) },
            Span::new(open.start, close.end),
        )
    }

    fn parse_modified_group(&mut self, token: &Token, depth: usize) -> ParseResult<Node> {
        let value = token.value.to_string();
        match value.as_str() {
            ":" => self.parse_group(token, GroupKind::NonCapturing, depth),
            ">" => self.parse_group(token, GroupKind::Atomic, depth),
            "=" => self.parse_group(token, GroupKind::LookaheadPositive, depth),
            "!" => self.parse_group(token, GroupKind::LookaheadNegative, depth),
            "<=" => self.parse_group(token, GroupKind::LookbehindPositive, depth),
            "<!" => self.parse_group(token, GroupKind::LookbehindNegative, depth),
            "|" => self.parse_branch_reset(token, depth),
            v if v.starts_with('(') => self.parse_conditional(token, v, depth),
            v if v.starts_with('<') => {
                self.parse_named_group(token, v, '<', '>', NamedSyntax::Angle, depth)
            }
            v if v.starts_with("P<") => {
                self.parse_named_group(token, &v[1..], '<', '>', NamedSyntax::PAngle, depth)
            }
            v if v.starts_with('\'') => {
                self.parse_named_group(token, v, '\'', '\'', NamedSyntax::Quote, depth)
            }
            v => self.parse_inline_flags(token, v, depth),
        }
    }

    fn parse_named_group(
        &mut self,
        token: &Token,
        wrapped: &str,
        open_ch: char,
        close_ch: char,
        syntax: NamedSyntax,
        depth: usize,
    ) -> ParseResult<Node> {
        let name = wrapped
            .strip_prefix(open_ch)
            .and_then(|v| v.strip_suffix(close_ch))
            .unwrap_or_default()
            .to_string();
        if !is_valid_group_name(&name) {
            return Err(ParseError::InvalidGroupName { name, offset: token.start });
        }
        let index = self.registry.allocate();
        self.registry.declare_name(&name, index);
        self.parse_group(token, GroupKind::Named { name, index, syntax }, depth)
    }

    /// `(?|…)` — capture numbers restart in every branch.
    fn parse_branch_reset(&mut self, token: &Token, depth: usize) -> ParseResult<Node> {
        self.check_depth(depth)?;
        let at = self.stream.position();
        let saved = self.registry.enter_branch_reset();
        self.registry.restart_branch(saved);
        let mut alternatives = vec![self.parse_sequence(depth + 1)?];
        while self.stream.peek().kind == TokenKind::Alternation {
            self.stream.next();
            self.registry.restart_branch(saved);
            alternatives.push(self.parse_sequence(depth + 1)?);
        }
        self.registry.leave_branch_reset();
        let child = if alternatives.len() == 1 {
            alternatives.pop().ok_or(ParseError::UnexpectedEof { offset: at })?
        } else {
            let span = alternatives
                .iter()
                .fold(alternatives[0].span, |acc, a| acc.cover(a.span));
            self.node(NodeKind::Alternation { alternatives }, span)?
        };
        let close = self.expect(TokenKind::GroupClose)?;
        self.node(
            NodeKind::Group { kind: GroupKind::BranchReset, child: Box::new(child) },
            Span::new(token.start, close.end),
        )
    }

    /// `(?(cond)yes|no)`. The lexer hands simple conditions over as text in
    /// the modifier payload; lookaround conditions arrive as ordinary group
    /// tokens.
    fn parse_conditional(&mut self, token: &Token, value: &str, depth: usize) -> ParseResult<Node> {
        if value == "(DEFINE)" {
            // (?(DEFINE)…) — the whole construct is the definition region
            let content = self.parse_alternation(depth + 1)?;
            let close = self.expect(TokenKind::GroupClose)?;
            return self.node(
                NodeKind::Define { content: Box::new(content) },
                Span::new(token.start, close.end),
            );
        }
        let condition = if value == "(" {
            let cond = self.parse_atom(depth + 1)?;
            let is_lookaround = matches!(
                &cond.kind,
                NodeKind::Group { kind, .. } if kind.is_lookaround()
            );
            if !is_lookaround {
                return Err(ParseError::InvalidConditionalCondition { offset: token.start });
            }
            cond
        } else {
            let inner = &value[1..value.len() - 1];
            let span = Span::new(token.start + 3, token.end.saturating_sub(1));
            self.classify_condition(inner, span, token.start)?
        };
        let yes = self.parse_sequence(depth + 1)?;
        let no = if self.stream.peek().kind == TokenKind::Alternation {
            self.stream.next();
            Some(Box::new(self.parse_sequence(depth + 1)?))
        } else {
            None
        };
        if self.stream.peek().kind == TokenKind::Alternation {
            return Err(ParseError::InvalidConditionalConstruct { offset: token.start });
        }
        let close = self.expect(TokenKind::GroupClose)?;
        self.node(
            NodeKind::Conditional {
                condition: Box::new(condition),
                yes: Box::new(yes),
                no,
            },
            Span::new(token.start, close.end),
        )
    }

    fn classify_condition(&mut self, inner: &str, span: Span, at: usize) -> ParseResult<Node> {
        if inner == "R" {
            return self.node(NodeKind::Subroutine { target: RefTarget::Index(0) }, span);
        }
        if let Some(digits) = inner.strip_prefix('R') {
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                let n = parse_u32(digits, at)?;
                return self.node(NodeKind::Subroutine { target: RefTarget::Index(n) }, span);
            }
            if let Some(name) = digits.strip_prefix('&') {
                if is_valid_group_name(name) {
                    return self.node(
                        NodeKind::Subroutine { target: RefTarget::Name(name.to_string()) },
                        span,
                    );
                }
            }
            return Err(ParseError::InvalidConditionalCondition { offset: at });
        }
        if let Some(version) = inner.strip_prefix("VERSION") {
            let (op, number) = if let Some(n) = version.strip_prefix(">=") {
                (VersionOp::Ge, n)
            } else if let Some(n) = version.strip_prefix('=') {
                (VersionOp::Eq, n)
            } else {
                return Err(ParseError::InvalidConditionalCondition { offset: at });
            };
            if !is_valid_version(number) {
                return Err(ParseError::InvalidConditionalCondition { offset: at });
            }
            return self.node(
                NodeKind::VersionCondition { op, version: number.to_string() },
                span,
            );
        }
        if !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_digit()) {
            let n = parse_u32(inner, at)?;
            return self.node(NodeKind::Backref { target: RefTarget::Index(n) }, span);
        }
        if let Some(rest) = inner.strip_prefix('+').or_else(|| inner.strip_prefix('-')) {
            if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
                let n: i32 = inner.parse().map_err(|_| {
                    ParseError::InvalidConditionalCondition { offset: at }
                })?;
                return self.node(NodeKind::Backref { target: RefTarget::Relative(n) }, span);
            }
        }
        let name = inner
            .strip_prefix('<')
            .and_then(|v| v.strip_suffix('>'))
            .or_else(|| inner.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
            .or_else(|| inner.strip_prefix('{').and_then(|v| v.strip_suffix('}')))
            .unwrap_or(inner);
        if is_valid_group_name(name) {
            return self.node(NodeKind::Backref { target: RefTarget::Name(name.to_string()) }, span);
        }
        Err(ParseError::InvalidConditionalCondition { offset: at })
    }

    /// `(?imsx-imsx:…)` scoped group or `(?imsx)` directive.
    fn parse_inline_flags(&mut self, token: &Token, value: &str, depth: usize) -> ParseResult<Node> {
        let scoped = value.ends_with(':');
        let flag_part = if scoped { &value[..value.len() - 1] } else { value };
        let (on, off) = match flag_part.split_once('-') {
            Some((on, off)) => (on.to_string(), off.to_string()),
            None => (flag_part.to_string(), String::new()),
        };
        let unknown: String = on
            .chars()
            .chain(off.chars())
            .filter(|&c| c != '^' && !FLAG_ALPHABET.contains(c))
            .collect();
        if !unknown.is_empty() {
            return Err(ParseError::UnknownFlags { unknown, offset: token.start });
        }
        let kind = GroupKind::InlineFlags { on, off, scoped };
        if scoped {
            return self.parse_group(token, kind, depth);
        }
        let close = self.expect(TokenKind::GroupClose)?;
        let child = self.node(
            NodeKind::Sequence { children: Vec::new() },
            Span::new(token.end, token.end),
        )?;
        self.node(
            NodeKind::Group { kind, child: Box::new(child) },
            Span::new(token.start, close.end),
        )
    }

    // ===== character classes =====

    fn parse_char_class(&mut self, open: &Token, depth: usize) -> ParseResult<Node> {
        self.check_depth(depth)?;
        let negated = if self.stream.peek().kind == TokenKind::Negation {
            self.stream.next();
            true
        } else {
            false
        };
        let (expression, end) = self.parse_class_interior(depth + 1)?;
        self.node(
            NodeKind::CharClass { negated, expression: Box::new(expression) },
            Span::new(open.start, end),
        )
    }

    /// Everything up to and including the closing `]`. Returns the interior
    /// tree and the byte offset just past the `]`.
    fn parse_class_interior(&mut self, depth: usize) -> ParseResult<(Node, usize)> {
        self.check_depth(depth)?;
        let at = self.stream.position();
        let mut items: Vec<Node> = Vec::new();
        loop {
            let peeked = self.stream.peek().clone();
            match peeked.kind {
                TokenKind::CharClassClose => {
                    self.stream.next();
                    let seq = self.sequence(items, at)?;
                    return Ok((seq, peeked.end));
                }
                TokenKind::ClassIntersection | TokenKind::ClassSubtraction => {
                    self.stream.next();
                    let op = if peeked.kind == TokenKind::ClassIntersection {
                        ClassOp::Intersection
                    } else {
                        ClassOp::Subtraction
                    };
                    let left = self.sequence(items, at)?;
                    let (right, end) = self.parse_class_interior(depth + 1)?;
                    let span = Span::new(left.span.start.min(peeked.start), right.span.end);
                    let node = self.node(
                        NodeKind::ClassOperation {
                            op,
                            left: Box::new(left),
                            right: Box::new(right),
                        },
                        span,
                    )?;
                    return Ok((node, end));
                }
                TokenKind::Range => {
                    self.stream.next();
                    let Some(start_node) = items.pop() else {
                        return Err(ParseError::InvalidClassRange { offset: peeked.start });
                    };
                    let end_node = self.parse_class_atom(depth + 1)?;
                    items.push(self.make_class_range(start_node, end_node)?);
                }
                TokenKind::Eof => {
                    return Err(ParseError::UnexpectedEof { offset: peeked.start });
                }
                _ => items.push(self.parse_class_atom(depth + 1)?),
            }
        }
    }

    fn make_class_range(&mut self, start: Node, end: Node) -> ParseResult<Node> {
        let start_cp = class_atom_code_point(&start)
            .ok_or(ParseError::InvalidClassRange { offset: start.span.start })?;
        let end_cp = class_atom_code_point(&end)
            .ok_or(ParseError::InvalidClassRange { offset: end.span.start })?;
        if start_cp > end_cp {
            return Err(ParseError::ClassRangeOutOfOrder { offset: start.span.start });
        }
        let span = start.span.cover(end.span);
        self.node(NodeKind::Range { start: Box::new(start), end: Box::new(end) }, span)
    }

    fn parse_class_atom(&mut self, depth: usize) -> ParseResult<Node> {
        self.check_depth(depth)?;
        let token = self.stream.next();
        let span = Span::new(token.start, token.end);
        match token.kind {
            TokenKind::Literal | TokenKind::LiteralEscaped => {
                self.node(NodeKind::Literal { value: token.value.to_string(), is_raw: false }, span)
            }
            TokenKind::CharType => {
                let kind = char_type_kind(&token.value, token.start)?;
                self.node(NodeKind::CharType { kind }, span)
            }
            TokenKind::PosixClass => {
                self.node(NodeKind::PosixClass { name: token.value.to_string() }, span)
            }
            TokenKind::UnicodeProp => self.node(
                NodeKind::UnicodeProp {
                    prop: token.value.to_string(),
                    has_braces: token.text.contains('{'),
                },
                span,
            ),
            TokenKind::Unicode | TokenKind::Octal | TokenKind::OctalLegacy => {
                self.char_literal(&token)
            }
            TokenKind::ControlChar => {
                let ch = token.value.chars().next().unwrap_or('\0');
                self.node(NodeKind::ControlChar { ch }, span)
            }
            TokenKind::UnicodeNamed => self.unicode_named(&token),
            TokenKind::QuoteModeStart => self.parse_quoted(&token),
            TokenKind::Eof => Err(ParseError::UnexpectedEof { offset: token.start }),
            other => Err(ParseError::UnexpectedToken { kind: other, offset: token.start }),
        }
    }

    // ===== escapes resolving to single code points =====

    fn char_literal(&mut self, token: &Token) -> ParseResult<Node> {
        let (radix, kind) = match token.kind {
            TokenKind::Octal => (8, CharLiteralKind::Octal),
            TokenKind::OctalLegacy => (8, CharLiteralKind::OctalLegacy),
            _ if token.text.starts_with("\\x{") || token.text.starts_with("\\u") => {
                (16, CharLiteralKind::Unicode)
            }
            _ => (16, CharLiteralKind::Hex),
        };
        let code_point = u32::from_str_radix(&token.value, radix)
            .map_err(|_| ParseError::CodePointTooLarge { offset: token.start })?;
        if code_point > 0x10FFFF {
            return Err(ParseError::CodePointTooLarge { offset: token.start });
        }
        self.node(
            NodeKind::CharLiteral { original: token.text.to_string(), code_point, kind },
            Span::new(token.start, token.end),
        )
    }

    fn unicode_named(&mut self, token: &Token) -> ParseResult<Node> {
        let value: &str = &token.value;
        let code_point = if let Some(hex) = value.strip_prefix("U+") {
            let cp = u32::from_str_radix(hex, 16)
                .map_err(|_| ParseError::CodePointTooLarge { offset: token.start })?;
            if cp > 0x10FFFF {
                return Err(ParseError::CodePointTooLarge { offset: token.start });
            }
            cp
        } else {
            // Named characters need a Unicode database; kept opaque.
            0xFFFD
        };
        self.node(
            NodeKind::CharLiteral {
                original: token.text.to_string(),
                code_point,
                kind: CharLiteralKind::UnicodeNamed,
            },
            Span::new(token.start, token.end),
        )
    }
}

// ===== small classification helpers =====

fn parse_u32(digits: &str, at: usize) -> ParseResult<u32> {
    digits
        .parse::<u32>()
        .map_err(|_| ParseError::CodePointTooLarge { offset: at })
}

fn is_valid_group_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(b) if b == b'_' || b.is_ascii_alphabetic() => {}
        _ => return false,
    }
    bytes.all(|b| b == b'_' || b.is_ascii_alphanumeric())
}

fn is_valid_version(version: &str) -> bool {
    let mut parts = version.split('.');
    let major_ok = parts
        .next()
        .is_some_and(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
    let rest_ok = parts.all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
    major_ok && rest_ok
}

fn assertion_kind(value: &str, at: usize) -> ParseResult<AssertionKind> {
    Ok(match value {
        "A" => AssertionKind::BufferStart,
        "z" => AssertionKind::BufferEnd,
        "Z" => AssertionKind::BufferEndNewline,
        "G" => AssertionKind::MatchStart,
        "b" => AssertionKind::WordBoundary,
        "B" => AssertionKind::NotWordBoundary,
        "b{g}" => AssertionKind::GraphemeBoundary,
        "B{g}" => AssertionKind::NotGraphemeBoundary,
        _ => return Err(ParseError::UnexpectedToken { kind: TokenKind::Assertion, offset: at }),
    })
}

fn char_type_kind(value: &str, at: usize) -> ParseResult<CharTypeKind> {
    Ok(match value {
        "d" => CharTypeKind::Digit,
        "D" => CharTypeKind::NotDigit,
        "s" => CharTypeKind::Space,
        "S" => CharTypeKind::NotSpace,
        "w" => CharTypeKind::Word,
        "W" => CharTypeKind::NotWord,
        "h" => CharTypeKind::HorizontalSpace,
        "H" => CharTypeKind::NotHorizontalSpace,
        "v" => CharTypeKind::VerticalSpace,
        "V" => CharTypeKind::NotVerticalSpace,
        "R" => CharTypeKind::Newline,
        _ => return Err(ParseError::UnexpectedToken { kind: TokenKind::CharType, offset: at }),
    })
}

fn parse_ref_target(value: &str) -> RefTarget {
    if value.bytes().all(|b| b.is_ascii_digit()) && !value.is_empty() {
        return RefTarget::Index(value.parse().unwrap_or(0));
    }
    if (value.starts_with('-') || value.starts_with('+'))
        && value[1..].bytes().all(|b| b.is_ascii_digit())
        && value.len() > 1
    {
        return RefTarget::Relative(value.parse().unwrap_or(0));
    }
    RefTarget::Name(value.to_string())
}

fn parse_subroutine_target(value: &str) -> RefTarget {
    if value == "R" {
        return RefTarget::Index(0);
    }
    if let Some(name) = value.strip_prefix('&') {
        return RefTarget::Name(name.to_string());
    }
    parse_ref_target(value)
}

/// The code point a class range endpoint resolves to, when it is a single
/// character.
fn class_atom_code_point(node: &Node) -> Option<u32> {
    match &node.kind {
        NodeKind::Literal { value, .. } => {
            let mut chars = value.chars();
            let first = chars.next()?;
            chars.next().is_none().then_some(first as u32)
        }
        NodeKind::CharLiteral { code_point, .. } => Some(*code_point),
        NodeKind::ControlChar { ch } => Some((ch.to_ascii_uppercase() as u32) ^ 0x40),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Node {
        Parser::new().parse(source).unwrap()
    }

    fn body(source: &str) -> Node {
        let NodeKind::Regex { pattern, .. } = parse(source).kind else {
            panic!("expected Regex node");
        };
        *pattern
    }

    #[test]
    fn empty_pattern_is_empty_sequence() {
        let pattern = body("//");
        assert_eq!(pattern.kind, NodeKind::Sequence { children: Vec::new() });
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let err = Parser::new().parse("/a/qz").unwrap_err();
        assert_eq!(err.to_string(), "Unknown regex flag(s) \"qz\"");
    }

    #[test]
    fn alternation_collects_all_branches() {
        let pattern = body("/a|b|c/");
        let NodeKind::Alternation { alternatives } = pattern.kind else {
            panic!("expected alternation");
        };
        assert_eq!(alternatives.len(), 3);
    }

    #[test]
    fn single_branch_is_not_an_alternation() {
        let pattern = body("/ab/");
        assert!(matches!(pattern.kind, NodeKind::Sequence { .. }));
    }

    #[test]
    fn quantifier_binds_to_previous_atom() {
        let pattern = body("/ab+/");
        let NodeKind::Sequence { children } = pattern.kind else {
            panic!("expected sequence");
        };
        assert!(matches!(children[0].kind, NodeKind::Literal { .. }));
        let NodeKind::Quantifier { kind, mode, .. } = &children[1].kind else {
            panic!("expected quantifier");
        };
        assert_eq!(*kind, QuantifierKind::Plus);
        assert_eq!(*mode, QuantMode::Greedy);
    }

    #[test]
    fn quantifier_modes() {
        let cases = [("/a+?/", QuantMode::Lazy), ("/a++/", QuantMode::Possessive)];
        for (source, expected) in cases {
            let NodeKind::Quantifier { mode, .. } = body(source).kind else {
                panic!("expected quantifier for {source}");
            };
            assert_eq!(mode, expected);
        }
    }

    #[test]
    fn quantifier_range_min_over_max_is_rejected() {
        let err = Parser::new().parse("/a{3,2}/").unwrap_err();
        assert_eq!(err.to_string(), "Invalid quantifier range \"{3,2}\": min > max");
    }

    #[test]
    fn leading_quantifier_is_rejected() {
        assert!(Parser::new().parse("/*a/").is_err());
    }

    #[test]
    fn group_kinds_by_modifier() {
        let cases: Vec<(&str, fn(&GroupKind) -> bool)> = vec![
            ("/(a)/", |k| matches!(k, GroupKind::Capturing { index: 1 })),
            ("/(?:a)/", |k| matches!(k, GroupKind::NonCapturing)),
            ("/(?>a)/", |k| matches!(k, GroupKind::Atomic)),
            ("/(?=a)/", |k| matches!(k, GroupKind::LookaheadPositive)),
            ("/(?!a)/", |k| matches!(k, GroupKind::LookaheadNegative)),
            ("/(?<=a)/", |k| matches!(k, GroupKind::LookbehindPositive)),
            ("/(?<!a)/", |k| matches!(k, GroupKind::LookbehindNegative)),
            ("/(?|a|b)/", |k| matches!(k, GroupKind::BranchReset)),
        ];
        for (source, check) in cases {
            let NodeKind::Group { kind, .. } = body(source).kind else {
                panic!("expected group for {source}");
            };
            assert!(check(&kind), "wrong kind for {source}: {kind:?}");
        }
    }

    #[test]
    fn named_group_syntax_is_preserved() {
        for (source, expected) in [
            ("/(?<word>a)/", NamedSyntax::Angle),
            ("/(?P<word>a)/", NamedSyntax::PAngle),
            ("/(?'word'a)/", NamedSyntax::Quote),
        ] {
            let NodeKind::Group { kind: GroupKind::Named { name, index, syntax }, .. } =
                body(source).kind
            else {
                panic!("expected named group for {source}");
            };
            assert_eq!(name, "word");
            assert_eq!(index, 1);
            assert_eq!(syntax, expected);
        }
    }

    #[test]
    fn branch_reset_reuses_capture_numbers() {
        let pattern = body(r"/(?|(a)|(b))\1/");
        let NodeKind::Sequence { children } = pattern.kind else {
            panic!("expected sequence");
        };
        let NodeKind::Group { kind: GroupKind::BranchReset, child } = &children[0].kind else {
            panic!("expected branch reset group");
        };
        let NodeKind::Alternation { alternatives } = &child.kind else {
            panic!("expected alternation inside");
        };
        for alt in alternatives {
            let NodeKind::Group { kind: GroupKind::Capturing { index }, .. } = &alt.kind else {
                panic!("expected capture in branch");
            };
            assert_eq!(*index, 1);
        }
        assert!(matches!(
            &children[1].kind,
            NodeKind::Backref { target: RefTarget::Index(1) }
        ));
    }

    #[test]
    fn inline_flags_scoped_and_directive() {
        let NodeKind::Group { kind: GroupKind::InlineFlags { on, off, scoped }, .. } =
            body("/(?i-sm:a)/").kind
        else {
            panic!("expected scoped inline flags");
        };
        assert_eq!((on.as_str(), off.as_str(), scoped), ("i", "sm", true));

        let NodeKind::Sequence { children } = body("/(?i)a/").kind else {
            panic!("expected sequence");
        };
        let NodeKind::Group { kind: GroupKind::InlineFlags { scoped, .. }, .. } = &children[0].kind
        else {
            panic!("expected flag directive");
        };
        assert!(!scoped);
    }

    #[test]
    fn conditional_with_numeric_reference() {
        let NodeKind::Conditional { condition, yes, no } = body("/(?(1)a|b)/").kind else {
            panic!("expected conditional");
        };
        assert!(matches!(
            condition.kind,
            NodeKind::Backref { target: RefTarget::Index(1) }
        ));
        assert!(matches!(yes.kind, NodeKind::Literal { .. }));
        assert!(no.is_some());
    }

    #[test]
    fn conditional_shapes() {
        assert!(matches!(
            body("/(?(R)a)/").kind,
            NodeKind::Conditional { .. }
        ));
        assert!(matches!(
            body("/(?(R2)a)/").kind,
            NodeKind::Conditional { .. }
        ));
        assert!(matches!(
            body("/(?(<name>)a)/").kind,
            NodeKind::Conditional { .. }
        ));
        let NodeKind::Conditional { condition, .. } = body("/(?(VERSION>=10.4)a|b)/").kind else {
            panic!("expected version conditional");
        };
        assert_eq!(
            condition.kind,
            NodeKind::VersionCondition { op: VersionOp::Ge, version: "10.4".to_string() }
        );
    }

    #[test]
    fn conditional_with_lookaround_condition() {
        let NodeKind::Conditional { condition, .. } = body("/(?(?=a)b|c)/").kind else {
            panic!("expected conditional");
        };
        assert!(matches!(
            condition.kind,
            NodeKind::Group { kind: GroupKind::LookaheadPositive, .. }
        ));
    }

    #[test]
    fn conditional_with_three_branches_is_rejected() {
        let err = Parser::new().parse("/(?(1)a|b|c)/").unwrap_err();
        assert_eq!(err.to_string(), "Invalid conditional construct");
    }

    #[test]
    fn invalid_condition_shape_is_rejected() {
        let err = Parser::new().parse("/(?(%%)a)/").unwrap_err();
        assert_eq!(err.to_string(), "Invalid conditional condition");
    }

    #[test]
    fn define_block() {
        let NodeKind::Define { content } = body("/(?(DEFINE)(?<digit>\\d))/").kind else {
            panic!("expected define");
        };
        assert!(matches!(
            content.kind,
            NodeKind::Group { kind: GroupKind::Named { .. }, .. }
        ));
    }

    #[test]
    fn subroutine_forms() {
        for (source, expected) in [
            ("/(a)(?1)/", RefTarget::Index(1)),
            ("/(a)(?R)/", RefTarget::Index(0)),
            ("/(a)(?-1)/", RefTarget::Relative(-1)),
            ("/(?<w>a)(?&w)/", RefTarget::Name("w".to_string())),
            ("/(?<w>a)\\g<w>/", RefTarget::Name("w".to_string())),
        ] {
            let NodeKind::Sequence { children } = body(source).kind else {
                panic!("expected sequence for {source}");
            };
            let last = children.last().map(|c| c.kind.clone());
            assert_eq!(
                last,
                Some(NodeKind::Subroutine { target: expected }),
                "for {source}"
            );
        }
    }

    #[test]
    fn char_class_with_range_and_type() {
        let NodeKind::CharClass { negated, expression } = body("/[a-z\\d]/").kind else {
            panic!("expected class");
        };
        assert!(!negated);
        let NodeKind::Sequence { children } = expression.kind else {
            panic!("expected interior sequence");
        };
        assert!(matches!(children[0].kind, NodeKind::Range { .. }));
        assert!(matches!(
            children[1].kind,
            NodeKind::CharType { kind: CharTypeKind::Digit }
        ));
    }

    #[test]
    fn class_range_out_of_order_is_rejected() {
        let err = Parser::new().parse("/[z-a]/").unwrap_err();
        assert_eq!(err.to_string(), "Range out of order in character class");
    }

    #[test]
    fn class_operations_nest_to_the_right() {
        let NodeKind::CharClass { expression, .. } = body("/[\\w&&[:ascii:]]/").kind else {
            panic!("expected class");
        };
        let NodeKind::ClassOperation { op, left, right } = expression.kind else {
            panic!("expected class operation");
        };
        assert_eq!(op, ClassOp::Intersection);
        assert!(matches!(left.kind, NodeKind::CharType { .. }));
        assert!(matches!(right.kind, NodeKind::PosixClass { .. }));
    }

    #[test]
    fn quoted_literal_is_raw() {
        let NodeKind::Literal { value, is_raw } = body(r"/\Qa.b\E/").kind else {
            panic!("expected literal");
        };
        assert_eq!(value, "a.b");
        assert!(is_raw);
    }

    #[test]
    fn comment_node_keeps_text() {
        let NodeKind::Sequence { children } = body("/a(?#note)b/").kind else {
            panic!("expected sequence");
        };
        assert_eq!(
            children[1].kind,
            NodeKind::Comment { text: "note".to_string() }
        );
    }

    #[test]
    fn verbs_and_limits() {
        let NodeKind::Sequence { children } = body("/(*MARK:here)a/").kind else {
            panic!("expected sequence");
        };
        assert_eq!(
            children[0].kind,
            NodeKind::PcreVerb { verb: "MARK".to_string(), arg: Some("here".to_string()) }
        );
        let NodeKind::Sequence { children } = body("/(*LIMIT_MATCH=100)a/").kind else {
            panic!("expected sequence");
        };
        assert_eq!(children[0].kind, NodeKind::LimitMatch { limit: 100 });
    }

    #[test]
    fn callout_forms() {
        assert_eq!(
            body("/(?C7)/").kind,
            NodeKind::Callout { id: CalloutId::Number(7), has_paren: false }
        );
        assert_eq!(
            body("/(?C'tag')/").kind,
            NodeKind::Callout { id: CalloutId::Tag("tag".to_string()), has_paren: true }
        );
    }

    #[test]
    fn script_run_wraps_body() {
        let NodeKind::ScriptRun { script, body: inner } = body("/(*sr:ab)/").kind else {
            panic!("expected script run");
        };
        assert_eq!(script, "script_run");
        assert!(matches!(inner.kind, NodeKind::Sequence { .. }));
    }

    #[test]
    fn spans_are_byte_accurate() {
        let source = "/a(bc)+/";
        let ast = parse(source);
        assert_eq!(ast.span, Span::new(0, source.len()));
        fn check(node: &Node, len: usize) {
            assert!(node.span.start <= node.span.end, "span inverted: {:?}", node.span);
            assert!(node.span.end <= len, "span out of bounds: {:?}", node.span);
            let mut last = node.span.start;
            for child in node.children() {
                assert!(child.span.start >= last || matches!(node.kind, NodeKind::Regex { .. }));
                last = child.span.start;
                check(child, len);
            }
        }
        check(&ast, source.len());
    }

    #[test]
    fn paired_delimiters() {
        let ast = parse("{ab}i");
        let NodeKind::Regex { delimiter, flags, .. } = ast.kind else {
            panic!("expected regex node");
        };
        assert_eq!(delimiter, '{');
        assert!(flags.ignore_case);
    }

    #[test]
    fn missing_end_delimiter() {
        let err = Parser::new().parse("/ab").unwrap_err();
        assert_eq!(err.to_string(), "No ending delimiter \"/\" found");
    }

    #[test]
    fn recursion_limit_trips() {
        let deep = format!("/{}a{}/", "(".repeat(80), ")".repeat(80));
        let err = Parser::with_options(ParserOptions { max_recursion_depth: 16, max_nodes: 100_000 })
            .parse(&deep)
            .unwrap_err();
        assert!(matches!(err, ParseError::RecursionLimit { .. }));
    }

    #[test]
    fn node_budget_trips() {
        let wide = format!("/{}/", "a".repeat(64));
        let err = Parser::with_options(ParserOptions { max_recursion_depth: 64, max_nodes: 10 })
            .parse(&wide)
            .unwrap_err();
        assert_eq!(err, ParseError::TooManyNodes { limit: 10 });
    }

    #[test]
    fn unbalanced_close_is_rejected() {
        assert!(Parser::new().parse("/a)/").is_err());
        assert!(Parser::new().parse("/(a/").is_err());
    }
}
