//! PCRE Token Definitions
//!
//! This crate provides the shared token definitions used by the PCRE lexer
//! and parser, plus the buffered [`TokenStream`] cursor the parser consumes.

use std::fmt;
use std::sync::Arc;

/// Token produced by the lexer and consumed by the parser.
///
/// Stores the token kind, original source slice, the canonicalized payload,
/// and byte positions. The text is kept in an `Arc<str>` so lookahead
/// buffering can clone tokens cheaply.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Token classification for parser decision making
    pub kind: TokenKind,
    /// Original source text for precise reconstruction
    pub text: Arc<str>,
    /// Canonicalized payload: `\t` carries the tab byte, `\P{^L}` carries
    /// `L`, a quantifier carries its bare form without the mode suffix
    pub value: Arc<str>,
    /// Starting byte position in the pattern body
    pub start: usize,
    /// Ending byte position (exclusive)
    pub end: usize,
    /// Whether the token was produced inside a character class
    pub in_class: bool,
}

impl Token {
    /// Create a new token whose value equals its source text.
    pub fn new(kind: TokenKind, text: impl Into<Arc<str>>, start: usize) -> Self {
        let text = text.into();
        let end = start + text.len();
        let value = Arc::clone(&text);
        Token { kind, text, value, start, end, in_class: false }
    }

    /// Create a token with a canonicalized value distinct from its lexeme.
    pub fn with_value(
        kind: TokenKind,
        text: impl Into<Arc<str>>,
        value: impl Into<Arc<str>>,
        start: usize,
    ) -> Self {
        let text = text.into();
        let end = start + text.len();
        Token { kind, text, value: value.into(), start, end, in_class: false }
    }

    /// Mark the token as lexed inside a character class.
    pub fn in_class(mut self, in_class: bool) -> Self {
        self.in_class = in_class;
        self
    }
}

/// Token classification for PCRE pattern lexing.
///
/// The set mirrors the micro-syntaxes of the pattern language: ordinary
/// literals, the escape families, class-interior constructs, group
/// punctuation, and the lexer-mode sentinels for quote and comment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // ===== Atoms =====
    /// Ordinary literal character
    Literal,
    /// Escaped meta-character: `\.`, `\*`, `\[`
    LiteralEscaped,
    /// `.`
    Dot,
    /// `^` or `$`
    Anchor,
    /// `\A`, `\z`, `\Z`, `\G`, `\b`, `\B`, `\b{g}`, `\B{g}`
    Assertion,
    /// `\d`, `\D`, `\s`, `\S`, `\w`, `\W`, `\h`, `\H`, `\v`, `\V`, `\R`
    CharType,
    /// `\p{L}`, `\pL`, `\P{L}`
    UnicodeProp,
    /// `\N{U+1F600}` or `\N{NAME}`
    UnicodeNamed,
    /// `\x{1F600}`, `\xFF`, `￿`
    Unicode,
    /// `\o{17}`
    Octal,
    /// `\017` legacy octal
    OctalLegacy,
    /// `\cX` control character
    ControlChar,
    /// `[:alpha:]` inside a class
    PosixClass,

    // ===== Structure =====
    /// `*`, `+`, `?`, `{n}`, `{n,}`, `{n,m}` with optional `?`/`+` mode
    Quantifier,
    /// `|`
    Alternation,
    /// `(`
    GroupOpen,
    /// `)`
    GroupClose,
    /// `(?` introducing a group modifier
    GroupModifierOpen,

    // ===== Character class interior =====
    /// `^` as the first token inside a class
    Negation,
    /// `-` between two class atoms
    Range,
    /// `[`
    CharClassOpen,
    /// `]`
    CharClassClose,
    /// `&&`
    ClassIntersection,
    /// `--`
    ClassSubtraction,

    // ===== References =====
    /// `\1`, `\g1`, `\g{name}`, `\k<name>`
    Backref,
    /// `\G` style continuation reference `\g<name>` used as a subroutine call
    GReference,

    // ===== Control =====
    /// `(*SKIP)`, `(*FAIL)`, `(*MARK:x)` …
    PcreVerb,
    /// `(?C)`, `(?C1)`, `(?C'tag')`
    Callout,
    /// `(?#`
    CommentOpen,
    /// `)` closing a comment
    CommentClose,
    /// Comment body text
    CommentBody,
    /// `\Q`
    QuoteModeStart,
    /// `\E`
    QuoteModeEnd,
    /// `\K`
    Keep,

    /// End of pattern
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Buffered cursor over the lexer's token vector.
///
/// The parser needs up to two tokens of lookahead (quantifier mode suffixes,
/// conditional heads). EOF is sticky: once reached, `peek` and `next` keep
/// returning the EOF token instead of running out.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    cursor: usize,
}

impl TokenStream {
    /// Create a stream over lexed tokens. An EOF token is appended when the
    /// lexer did not provide one so the stream is never empty.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        let at_end = tokens.last().map(|t| t.kind) != Some(TokenKind::Eof);
        if at_end {
            let pos = tokens.last().map(|t| t.end).unwrap_or(0);
            tokens.push(Token::new(TokenKind::Eof, "", pos));
        }
        TokenStream { tokens, cursor: 0 }
    }

    /// Peek at the next token without consuming it.
    pub fn peek(&self) -> &Token {
        &self.tokens[self.cursor.min(self.tokens.len() - 1)]
    }

    /// Peek two tokens ahead.
    pub fn peek_second(&self) -> &Token {
        &self.tokens[(self.cursor + 1).min(self.tokens.len() - 1)]
    }

    /// Consume and return the next token. EOF is sticky.
    pub fn next(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.cursor += 1;
        }
        token
    }

    /// Whether the cursor is at EOF.
    pub fn is_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    /// Byte position of the next token.
    pub fn position(&self) -> usize {
        self.peek().start
    }

    /// All tokens, in source order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(kinds: &[(TokenKind, &str)]) -> TokenStream {
        let mut pos = 0;
        let tokens = kinds
            .iter()
            .map(|&(kind, text)| {
                let t = Token::new(kind, text, pos);
                pos = t.end;
                t
            })
            .collect();
        TokenStream::new(tokens)
    }

    #[test]
    fn appends_eof_when_missing() {
        let s = stream(&[(TokenKind::Literal, "a")]);
        assert_eq!(s.tokens().len(), 2);
        assert_eq!(s.tokens()[1].kind, TokenKind::Eof);
        assert_eq!(s.tokens()[1].start, 1);
    }

    #[test]
    fn eof_is_sticky() {
        let mut s = stream(&[(TokenKind::Literal, "a")]);
        assert_eq!(s.next().kind, TokenKind::Literal);
        assert_eq!(s.next().kind, TokenKind::Eof);
        assert_eq!(s.next().kind, TokenKind::Eof);
        assert!(s.is_eof());
    }

    #[test]
    fn peek_does_not_advance() {
        let mut s = stream(&[(TokenKind::Literal, "a"), (TokenKind::Dot, ".")]);
        assert_eq!(s.peek().kind, TokenKind::Literal);
        assert_eq!(s.peek_second().kind, TokenKind::Dot);
        assert_eq!(s.next().kind, TokenKind::Literal);
        assert_eq!(s.peek().kind, TokenKind::Dot);
    }

    #[test]
    fn token_value_defaults_to_text() {
        let t = Token::new(TokenKind::Literal, "a", 3);
        assert_eq!(&*t.value, "a");
        assert_eq!((t.start, t.end), (3, 4));
    }

    #[test]
    fn with_value_keeps_lexeme_span() {
        let t = Token::with_value(TokenKind::Literal, "\\t", "\t", 0);
        assert_eq!(&*t.text, "\\t");
        assert_eq!(&*t.value, "\t");
        assert_eq!(t.end, 2);
    }

    #[test]
    fn empty_stream_has_eof_at_zero() {
        let s = TokenStream::new(Vec::new());
        assert!(s.is_eof());
        assert_eq!(s.position(), 0);
    }
}
