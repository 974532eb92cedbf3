//! Context-sensitive lexer for PCRE2 patterns.
//!
//! The pattern language is a bundle of micro-syntaxes: the meaning of `-`,
//! `^`, `]` and most escapes depends on whether the cursor is inside a
//! character class, inside `\Q…\E` quote mode, or inside a `(?#…)` comment.
//! The lexer tracks these modes explicitly (see [`LexerMode`]) and emits
//! [`Token`]s carrying both the raw lexeme and a canonicalized value, with
//! byte-accurate positions.
//!
//! # Usage
//!
//! ```
//! use pcre_lexer::Lexer;
//! use pcre_token::TokenKind;
//!
//! let stream = Lexer::new("a|b").tokenize().unwrap();
//! let kinds: Vec<TokenKind> = stream.tokens().iter().map(|t| t.kind).collect();
//! assert_eq!(
//!     kinds,
//!     vec![
//!         TokenKind::Literal,
//!         TokenKind::Alternation,
//!         TokenKind::Literal,
//!         TokenKind::Eof
//!     ]
//! );
//! ```
//!
//! # Canonicalization
//!
//! - `\t`, `\n`, `\r`, `\f`, `\e`, `\a` carry the control byte in `value`
//! - `\P{L}` carries `^L`; `\P{^L}` collapses the double negation to `L`
//! - numeric escapes carry their digit payload (`\x{1F600}` carries `1F600`)
//! - quantifiers carry the bare quantifier without the `?`/`+` mode suffix
//!
//! The lexer never panics on malformed input; every failure path returns a
//! typed [`LexerError`] with an offset.

pub mod error;
pub mod mode;
mod tables;

use std::sync::Arc;

pub use error::{LexerError, Result};
pub use mode::LexerMode;
use pcre_token::{Token, TokenKind, TokenStream};
use tables::{CONTROL_VERBS, LIMIT_VERBS, OPTION_VERBS, POSIX_CLASSES, SCRIPT_RUN_VERBS};

/// Lexer configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexerOptions {
    /// `/u` mode: input must be valid UTF-8, code points run to U+10FFFF
    pub unicode: bool,
    /// `/x` mode: unescaped whitespace and `#` comments outside classes are
    /// ignored
    pub extended: bool,
}

/// Mode-aware pattern lexer.
///
/// Operates on the pattern body (delimiters and flags already stripped by
/// the caller); `base_offset` shifts token positions back into the original
/// source coordinates.
pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    base: usize,
    options: LexerOptions,
    mode: LexerMode,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    /// Create a lexer with default options.
    pub fn new(input: &'a str) -> Self {
        Self::with_options(input, LexerOptions::default())
    }

    /// Create a lexer with explicit options.
    pub fn with_options(input: &'a str, options: LexerOptions) -> Self {
        Lexer {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            base: 0,
            options,
            mode: LexerMode::Outside,
            tokens: Vec::new(),
        }
    }

    /// Shift token positions by `base` bytes (position of the pattern body
    /// within the delimited source).
    pub fn at_offset(mut self, base: usize) -> Self {
        self.base = base;
        self
    }

    /// Tokenize raw bytes. Under `/u` the bytes must be valid UTF-8;
    /// otherwise they are decoded as Latin-1 so every byte is addressable.
    pub fn tokenize_bytes(bytes: &[u8], options: LexerOptions) -> Result<TokenStream> {
        match std::str::from_utf8(bytes) {
            Ok(s) => Lexer::with_options(s, options).tokenize(),
            Err(e) if options.unicode => {
                Err(LexerError::InvalidUtf8 { offset: e.valid_up_to() })
            }
            Err(_) => {
                let decoded: String = bytes.iter().map(|&b| b as char).collect();
                Lexer::with_options(&decoded, options).tokenize()
            }
        }
    }

    /// Run the lexer to completion.
    pub fn tokenize(mut self) -> Result<TokenStream> {
        while self.pos < self.bytes.len() {
            if self.options.extended && self.skip_extended_trivia() {
                continue;
            }
            match self.bytes[self.pos] {
                b'\\' => self.lex_escape()?,
                b'[' => self.lex_char_class()?,
                b'(' => self.lex_open()?,
                b')' => self.push_one(TokenKind::GroupClose),
                b'|' => self.push_one(TokenKind::Alternation),
                b'.' => self.push_one(TokenKind::Dot),
                b'^' | b'$' => self.push_one(TokenKind::Anchor),
                b'*' | b'+' | b'?' => self.lex_quantifier(),
                b'{' => self.lex_brace(),
                _ => self.lex_literal(),
            }
        }
        let end = self.base + self.bytes.len();
        self.tokens.push(Token::new(TokenKind::Eof, "", end));
        Ok(TokenStream::new(self.tokens))
    }

    // ===== low-level helpers =====

    fn byte_at(&self, at: usize) -> Option<u8> {
        self.bytes.get(at).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.bytes[self.pos..].starts_with(s.as_bytes())
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.input[start..end]
    }

    /// Push a token covering `[start, self.pos)`.
    fn push(&mut self, kind: TokenKind, start: usize) {
        let text = self.slice(start, self.pos);
        let token = Token::new(kind, text, self.base + start).in_class(self.mode.in_class());
        self.tokens.push(token);
    }

    /// Push a token covering `[start, self.pos)` with a canonical value.
    fn push_value(&mut self, kind: TokenKind, start: usize, value: impl Into<Arc<str>>) {
        let text = self.slice(start, self.pos);
        let token =
            Token::with_value(kind, text, value, self.base + start).in_class(self.mode.in_class());
        self.tokens.push(token);
    }

    /// Push a single-byte token at the cursor.
    fn push_one(&mut self, kind: TokenKind) {
        let start = self.pos;
        self.pos += 1;
        self.push(kind, start);
    }

    fn last_kind(&self) -> Option<TokenKind> {
        self.tokens.last().map(|t| t.kind)
    }

    /// Skip `/x` whitespace and `#` comments. Returns true when anything was
    /// consumed.
    fn skip_extended_trivia(&mut self) -> bool {
        let start = self.pos;
        while let Some(b) = self.byte_at(self.pos) {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C => self.pos += 1,
                b'#' => {
                    match memchr::memchr(b'\n', &self.bytes[self.pos..]) {
                        Some(nl) => self.pos += nl + 1,
                        None => self.pos = self.bytes.len(),
                    }
                }
                _ => break,
            }
        }
        self.pos > start
    }

    fn lex_literal(&mut self) {
        let start = self.pos;
        // One token per character; runs are reassembled by consumers that
        // care about adjacency.
        let ch_len = self.input[self.pos..]
            .chars()
            .next()
            .map(char::len_utf8)
            .unwrap_or(1);
        self.pos += ch_len;
        self.push(TokenKind::Literal, start);
    }

    // ===== quantifiers =====

    fn lex_quantifier(&mut self) {
        let start = self.pos;
        self.pos += 1;
        let bare_end = self.pos;
        // `?` = lazy, `+` = possessive; part of the same token
        if matches!(self.byte_at(self.pos), Some(b'?') | Some(b'+')) {
            self.pos += 1;
        }
        let value = self.slice(start, bare_end).to_string();
        self.push_value(TokenKind::Quantifier, start, value);
    }

    /// `{` starts a quantifier only when it matches `{n}`, `{n,}` or
    /// `{n,m}`; anything else is a literal brace.
    fn lex_brace(&mut self) {
        let start = self.pos;
        let mut at = self.pos + 1;
        let digits = |bytes: &[u8], mut i: usize| {
            let s = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            (i, i > s)
        };
        let (after_min, has_min) = digits(self.bytes, at);
        at = after_min;
        if !has_min {
            self.lex_literal();
            return;
        }
        if self.byte_at(at) == Some(b',') {
            at += 1;
            let (after_max, _) = digits(self.bytes, at);
            at = after_max;
        }
        if self.byte_at(at) != Some(b'}') {
            self.lex_literal();
            return;
        }
        self.pos = at + 1;
        let bare_end = self.pos;
        if matches!(self.byte_at(self.pos), Some(b'?') | Some(b'+')) {
            self.pos += 1;
        }
        let value = self.slice(start, bare_end).to_string();
        self.push_value(TokenKind::Quantifier, start, value);
    }

    // ===== groups, verbs, comments, callouts =====

    fn lex_open(&mut self) -> Result<()> {
        if self.starts_with("(?#") {
            return self.lex_comment();
        }
        if self.starts_with("(*") {
            return self.lex_verb();
        }
        if self.starts_with("(?C") {
            return self.lex_callout();
        }
        if self.starts_with("(?") {
            return self.lex_group_modifier();
        }
        self.push_one(TokenKind::GroupOpen);
        Ok(())
    }

    fn lex_comment(&mut self) -> Result<()> {
        let open = self.pos;
        self.pos += 3;
        self.push(TokenKind::CommentOpen, open);
        self.mode = LexerMode::Comment;
        let body_start = self.pos;
        // Comment bodies have no escapes; the first `)` terminates.
        let Some(close) = memchr::memchr(b')', &self.bytes[self.pos..]) else {
            self.mode = LexerMode::Outside;
            return Err(LexerError::UnclosedComment { offset: self.base + open });
        };
        self.pos += close;
        if self.pos > body_start {
            self.push(TokenKind::CommentBody, body_start);
        }
        self.mode = LexerMode::Outside;
        self.push_one(TokenKind::CommentClose);
        Ok(())
    }

    fn lex_verb(&mut self) -> Result<()> {
        let open = self.pos;
        let mut at = self.pos + 2;
        let name_start = at;
        while self
            .byte_at(at)
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            at += 1;
        }
        let name = self.slice(name_start, at);

        // Script runs open a pattern body; the token covers only `(*name:`.
        if self.byte_at(at) == Some(b':') {
            if let Some(canonical) = SCRIPT_RUN_VERBS.get(name) {
                self.pos = at + 1;
                self.push_value(TokenKind::PcreVerb, open, *canonical);
                return Ok(());
            }
        }

        // Everything else runs to the closing paren: (*SKIP), (*MARK:x),
        // (*LIMIT_MATCH=n), (*UTF8) …
        let close = memchr::memchr(b')', &self.bytes[at..])
            .ok_or(LexerError::Unrecognized { offset: self.base + open })?;
        let content_end = at + close;
        let content = self.slice(name_start, content_end);
        let bare_name = content.split([':', '=']).next().unwrap_or(content);
        let known = CONTROL_VERBS.contains(bare_name)
            || OPTION_VERBS.contains(bare_name)
            || LIMIT_VERBS.contains(bare_name);
        if !known {
            return Err(LexerError::Unrecognized { offset: self.base + open });
        }
        self.pos = content_end + 1;
        self.push_value(TokenKind::PcreVerb, open, content.to_string());
        Ok(())
    }

    fn lex_callout(&mut self) -> Result<()> {
        let open = self.pos;
        let mut at = self.pos + 3;
        let payload_start = at;
        match self.byte_at(at) {
            Some(b')') => {}
            Some(b) if b.is_ascii_digit() => {
                while self.byte_at(at).is_some_and(|b| b.is_ascii_digit()) {
                    at += 1;
                }
            }
            Some(q @ (b'\'' | b'"' | b'{')) => {
                let closing = if q == b'{' { b'}' } else { q };
                at += 1;
                let end = memchr::memchr(closing, &self.bytes[at..])
                    .ok_or(LexerError::Unrecognized { offset: self.base + open })?;
                at += end + 1;
            }
            _ => return Err(LexerError::Unrecognized { offset: self.base + open }),
        }
        if self.byte_at(at) != Some(b')') {
            return Err(LexerError::Unrecognized { offset: self.base + open });
        }
        let value = self.slice(payload_start, at).to_string();
        self.pos = at + 1;
        self.push_value(TokenKind::Callout, open, value);
        Ok(())
    }

    /// Everything that starts `(?` except comments and callouts. The token
    /// carries the modifier payload in `value` so the parser never has to
    /// re-scan source text.
    fn lex_group_modifier(&mut self) -> Result<()> {
        let open = self.pos;
        let after = self.pos + 2;
        match self.byte_at(after) {
            Some(b':') | Some(b'>') | Some(b'=') | Some(b'!') | Some(b'|') => {
                self.pos = after + 1;
                let value = self.slice(after, self.pos).to_string();
                self.push_value(TokenKind::GroupModifierOpen, open, value);
                Ok(())
            }
            Some(b'<') => match self.byte_at(after + 1) {
                Some(b'=') | Some(b'!') => {
                    self.pos = after + 2;
                    let value = self.slice(after, self.pos).to_string();
                    self.push_value(TokenKind::GroupModifierOpen, open, value);
                    Ok(())
                }
                _ => self.lex_group_name(open, after, b'>'),
            },
            Some(b'\'') => self.lex_group_name(open, after, b'\''),
            Some(b'P') => match self.byte_at(after + 1) {
                Some(b'<') => self.lex_group_name(open, after, b'>'),
                Some(b'=') => self.lex_p_reference(open, after + 2, TokenKind::Backref),
                Some(b'>') => self.lex_p_reference(open, after + 2, TokenKind::GReference),
                _ => Err(LexerError::Unrecognized { offset: self.base + open }),
            },
            Some(b'(') => self.lex_conditional_open(open, after),
            Some(b'R') if self.byte_at(after + 1) == Some(b')') => {
                self.pos = after + 2;
                self.push_value(TokenKind::GReference, open, "R");
                Ok(())
            }
            Some(b'&') => {
                let (name, end) = self.scan_name(after + 1);
                if name.is_empty() || self.byte_at(end) != Some(b')') {
                    return Err(LexerError::Unrecognized { offset: self.base + open });
                }
                let value = format!("&{name}");
                self.pos = end + 1;
                self.push_value(TokenKind::GReference, open, value);
                Ok(())
            }
            Some(b) if b.is_ascii_digit() => {
                let mut at = after;
                while self.byte_at(at).is_some_and(|b| b.is_ascii_digit()) {
                    at += 1;
                }
                if self.byte_at(at) != Some(b')') {
                    return Err(LexerError::Unrecognized { offset: self.base + open });
                }
                let value = self.slice(after, at).to_string();
                self.pos = at + 1;
                self.push_value(TokenKind::GReference, open, value);
                Ok(())
            }
            Some(b'+') | Some(b'-')
                if self.byte_at(after + 1).is_some_and(|b| b.is_ascii_digit()) =>
            {
                let mut at = after + 1;
                while self.byte_at(at).is_some_and(|b| b.is_ascii_digit()) {
                    at += 1;
                }
                if self.byte_at(at) != Some(b')') {
                    return Err(LexerError::Unrecognized { offset: self.base + open });
                }
                let value = self.slice(after, at).to_string();
                self.pos = at + 1;
                self.push_value(TokenKind::GReference, open, value);
                Ok(())
            }
            _ => self.lex_inline_flags(open, after),
        }
    }

    fn scan_name(&self, from: usize) -> (&'a str, usize) {
        let mut at = from;
        while self
            .byte_at(at)
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            at += 1;
        }
        (self.slice(from, at), at)
    }

    /// `(?<name>`, `(?P<name>`, `(?'name'`. A missing name is left for the
    /// parser to reject with a positioned error.
    fn lex_group_name(&mut self, open: usize, after: usize, close_ch: u8) -> Result<()> {
        // `after` points at `<`, `'` or `P`
        let name_from = match self.byte_at(after) {
            Some(b'P') => after + 2,
            _ => after + 1,
        };
        let (_, end) = self.scan_name(name_from);
        if self.byte_at(end) != Some(close_ch) {
            return Err(LexerError::Unrecognized { offset: self.base + open });
        }
        self.pos = end + 1;
        let value = self.slice(after, self.pos).to_string();
        self.push_value(TokenKind::GroupModifierOpen, open, value);
        Ok(())
    }

    /// `(?P=name)` backreference and `(?P>name)` subroutine call.
    fn lex_p_reference(&mut self, open: usize, name_from: usize, kind: TokenKind) -> Result<()> {
        let (name, end) = self.scan_name(name_from);
        if name.is_empty() || self.byte_at(end) != Some(b')') {
            return Err(LexerError::Unrecognized { offset: self.base + open });
        }
        let value = if kind == TokenKind::GReference {
            format!("&{name}")
        } else {
            name.to_string()
        };
        self.pos = end + 1;
        self.push_value(kind, open, value);
        Ok(())
    }

    /// `(?(` — a conditional. Simple conditions are captured whole; a
    /// lookaround condition leaves the lookaround for normal lexing.
    fn lex_conditional_open(&mut self, open: usize, after: usize) -> Result<()> {
        let cond_start = after + 1;
        if self.byte_at(cond_start) == Some(b'?') {
            self.pos = cond_start;
            self.push_value(TokenKind::GroupModifierOpen, open, "(");
            return Ok(());
        }
        let close = memchr::memchr(b')', &self.bytes[cond_start..])
            .ok_or(LexerError::Unrecognized { offset: self.base + open })?;
        let cond = self.slice(cond_start, cond_start + close).to_string();
        self.pos = cond_start + close + 1;
        self.push_value(TokenKind::GroupModifierOpen, open, format!("({cond})"));
        Ok(())
    }

    /// `(?imsx-imsx:` scoped or `(?imsx)` directive. The closing paren of
    /// the directive form is left for the parser.
    fn lex_inline_flags(&mut self, open: usize, after: usize) -> Result<()> {
        let mut at = after;
        while self.byte_at(at).is_some_and(|b| {
            b.is_ascii_alphabetic() || b == b'-' || b == b'^'
        }) {
            at += 1;
        }
        match self.byte_at(at) {
            Some(b':') => {
                self.pos = at + 1;
                let value = self.slice(after, self.pos).to_string();
                self.push_value(TokenKind::GroupModifierOpen, open, value);
                Ok(())
            }
            Some(b')') if at > after => {
                self.pos = at;
                let value = self.slice(after, at).to_string();
                self.push_value(TokenKind::GroupModifierOpen, open, value);
                Ok(())
            }
            _ => Err(LexerError::Unrecognized { offset: self.base + open }),
        }
    }

    // ===== character classes =====

    fn lex_char_class(&mut self) -> Result<()> {
        let open = self.pos;
        self.push_one(TokenKind::CharClassOpen);
        self.mode = LexerMode::InClass;
        let mut at_start = true;
        let mut prev_atom = false;
        let mut range_pending = false;

        let result = loop {
            let Some(b) = self.byte_at(self.pos) else {
                break Err(LexerError::UnclosedCharClass { offset: self.base + open });
            };
            match b {
                b'^' if at_start => {
                    self.push_one(TokenKind::Negation);
                    at_start = false;
                    // `]` directly after the negation is still a literal
                    continue;
                }
                b']' => {
                    let after_open = self.last_kind()
                        .is_some_and(|k| matches!(k, TokenKind::CharClassOpen | TokenKind::Negation));
                    if after_open {
                        self.push_one(TokenKind::Literal);
                    } else {
                        self.push_one(TokenKind::CharClassClose);
                        break Ok(());
                    }
                }
                b'[' if self.starts_with("[:") => {
                    if !self.lex_posix_class() {
                        self.push_one(TokenKind::Literal);
                    }
                }
                b'&' if self.starts_with("&&") => {
                    let start = self.pos;
                    self.pos += 2;
                    self.push(TokenKind::ClassIntersection, start);
                }
                b'-' if self.starts_with("--") && prev_atom && !range_pending => {
                    let start = self.pos;
                    self.pos += 2;
                    self.push(TokenKind::ClassSubtraction, start);
                }
                b'-' => {
                    let can_range = prev_atom
                        && !range_pending
                        && self.byte_at(self.pos + 1).is_some_and(|n| n != b']');
                    if can_range {
                        self.push_one(TokenKind::Range);
                    } else {
                        self.push_one(TokenKind::Literal);
                    }
                }
                b'\\' => self.lex_escape()?,
                _ => self.lex_literal(),
            }
            at_start = false;
            match self.last_kind() {
                Some(TokenKind::Range) => {
                    range_pending = true;
                    prev_atom = false;
                }
                Some(
                    TokenKind::Literal
                    | TokenKind::LiteralEscaped
                    | TokenKind::Unicode
                    | TokenKind::Octal
                    | TokenKind::OctalLegacy
                    | TokenKind::ControlChar
                    | TokenKind::UnicodeNamed,
                ) => {
                    // An atom that just closed a range cannot start another.
                    prev_atom = !range_pending;
                    range_pending = false;
                }
                _ => {
                    prev_atom = false;
                    range_pending = false;
                }
            }
        };
        self.mode = LexerMode::Outside;
        result
    }

    /// `[:alpha:]` / `[:^alpha:]`. Returns false when the text is not a
    /// POSIX class, leaving the cursor untouched.
    fn lex_posix_class(&mut self) -> bool {
        let start = self.pos;
        let mut at = self.pos + 2;
        let negated = self.byte_at(at) == Some(b'^');
        if negated {
            at += 1;
        }
        let (name, end) = self.scan_name(at);
        if !POSIX_CLASSES.contains(name)
            || self.byte_at(end) != Some(b':')
            || self.byte_at(end + 1) != Some(b']')
        {
            return false;
        }
        self.pos = end + 2;
        let value = if negated { format!("^{name}") } else { name.to_string() };
        self.push_value(TokenKind::PosixClass, start, value);
        true
    }

    // ===== escapes =====

    fn lex_escape(&mut self) -> Result<()> {
        let start = self.pos;
        let Some(next) = self.byte_at(self.pos + 1) else {
            return Err(LexerError::TrailingBackslash { offset: self.base + self.bytes.len() });
        };
        match next {
            b'Q' => return self.lex_quote_mode(),
            // Stray \E without \Q is ignored, matching the engine.
            b'E' => {
                self.pos += 2;
                return Ok(());
            }
            _ => {}
        }
        self.pos += 2;
        match next {
            b't' => self.push_value(TokenKind::LiteralEscaped, start, "\t"),
            b'n' => self.push_value(TokenKind::LiteralEscaped, start, "\n"),
            b'r' => self.push_value(TokenKind::LiteralEscaped, start, "\r"),
            b'f' => self.push_value(TokenKind::LiteralEscaped, start, "\x0C"),
            b'e' => self.push_value(TokenKind::LiteralEscaped, start, "\x1B"),
            b'a' => self.push_value(TokenKind::LiteralEscaped, start, "\x07"),
            b'd' | b'D' | b's' | b'S' | b'w' | b'W' | b'h' | b'H' | b'v' | b'V' => {
                let value = self.slice(start + 1, start + 2).to_string();
                self.push_value(TokenKind::CharType, start, value);
            }
            b'R' => {
                if self.mode.in_class() {
                    // Inside a class \R loses its meaning and matches `R`.
                    self.push_value(TokenKind::LiteralEscaped, start, "R");
                } else {
                    self.push_value(TokenKind::CharType, start, "R");
                }
            }
            b'A' | b'z' | b'Z' | b'G' if !self.mode.in_class() => {
                let value = self.slice(start + 1, start + 2).to_string();
                self.push_value(TokenKind::Assertion, start, value);
            }
            b'b' | b'B' if !self.mode.in_class() => {
                let letter = next as char;
                if self.starts_with("{g}") {
                    self.pos += 3;
                    self.push_value(TokenKind::Assertion, start, format!("{letter}{{g}}"));
                } else {
                    self.push_value(TokenKind::Assertion, start, letter.to_string());
                }
            }
            b'b' => self.push_value(TokenKind::LiteralEscaped, start, "\x08"),
            b'K' if !self.mode.in_class() => self.push(TokenKind::Keep, start),
            b'p' | b'P' => self.lex_unicode_prop(start, next == b'P'),
            b'x' => self.lex_hex(start),
            b'u' => self.lex_u_escape(start),
            b'o' => self.lex_braced_octal(start),
            b'0' => self.lex_legacy_octal(start),
            b'1'..=b'9' => {
                if self.mode.in_class() {
                    if (b'1'..=b'7').contains(&next) {
                        self.pos = start + 1;
                        self.lex_legacy_octal(start);
                    } else {
                        // \8 and \9 have no octal reading; they match the digit
                        self.push_value(TokenKind::LiteralEscaped, start, (next as char).to_string());
                    }
                } else {
                    let (digits, end) = self.scan_digits(start + 1);
                    self.pos = end;
                    self.push_value(TokenKind::Backref, start, digits.to_string());
                }
            }
            b'g' if !self.mode.in_class() => self.lex_g_reference(start)?,
            b'k' if !self.mode.in_class() => self.lex_k_reference(start)?,
            b'c' => {
                let Some(ctl) = self.byte_at(self.pos) else {
                    return Err(LexerError::Unrecognized { offset: self.base + start });
                };
                self.pos += 1;
                self.push_value(TokenKind::ControlChar, start, (ctl as char).to_string());
            }
            b'N' => {
                if self.byte_at(self.pos) == Some(b'{') {
                    let close = memchr::memchr(b'}', &self.bytes[self.pos..])
                        .ok_or(LexerError::Unrecognized { offset: self.base + start })?;
                    let inner = self.slice(self.pos + 1, self.pos + close).to_string();
                    self.pos += close + 1;
                    self.push_value(TokenKind::UnicodeNamed, start, inner);
                } else if self.mode.in_class() {
                    self.push_value(TokenKind::LiteralEscaped, start, "N");
                } else {
                    // Bare \N is any-char-but-newline; normalized to a dot.
                    self.push(TokenKind::Dot, start);
                }
            }
            _ => {
                // Escaped meta-characters and unknown letter escapes both
                // resolve to the bare character.
                let ch_len = self.input[start + 1..]
                    .chars()
                    .next()
                    .map(char::len_utf8)
                    .unwrap_or(1);
                self.pos = start + 1 + ch_len;
                let value = self.slice(start + 1, self.pos).to_string();
                self.push_value(TokenKind::LiteralEscaped, start, value);
            }
        }
        Ok(())
    }

    fn scan_digits(&self, from: usize) -> (&'a str, usize) {
        let mut at = from;
        while self.byte_at(at).is_some_and(|b| b.is_ascii_digit()) {
            at += 1;
        }
        (self.slice(from, at), at)
    }

    /// `\Q … \E`. One literal token for the verbatim span; the end marker
    /// token is emitted only when `\E` was actually consumed.
    fn lex_quote_mode(&mut self) -> Result<()> {
        let start = self.pos;
        self.pos += 2;
        self.push(TokenKind::QuoteModeStart, start);
        // Inside a class the quoted span still belongs to the class, so the
        // mode (and with it the token tagging) only switches from Outside.
        let outer = self.mode;
        if !outer.in_class() {
            self.mode = LexerMode::Quote;
        }
        let body_start = self.pos;
        match memchr::memmem::find(&self.bytes[self.pos..], b"\\E") {
            Some(rel) => {
                self.pos += rel;
                if self.pos > body_start {
                    self.push(TokenKind::Literal, body_start);
                }
                let end_start = self.pos;
                self.pos += 2;
                self.push(TokenKind::QuoteModeEnd, end_start);
            }
            None => {
                self.pos = self.bytes.len();
                if self.pos > body_start {
                    self.push(TokenKind::Literal, body_start);
                }
            }
        }
        self.mode = outer;
        Ok(())
    }

    /// `\p{Prop}`, `\P{Prop}`, `\pL`. A `^` inside braces negates; `\P{^L}`
    /// collapses back to `L`.
    fn lex_unicode_prop(&mut self, start: usize, mut negated: bool) {
        if self.byte_at(self.pos) == Some(b'{') {
            let Some(close) = memchr::memchr(b'}', &self.bytes[self.pos..]) else {
                // Unclosed property brace: the `p` is an ordinary escape.
                self.push_value(TokenKind::LiteralEscaped, start, self.slice(start + 1, start + 2).to_string());
                return;
            };
            let mut inner = self.slice(self.pos + 1, self.pos + close);
            if let Some(stripped) = inner.strip_prefix('^') {
                negated = !negated;
                inner = stripped;
            }
            self.pos += close + 1;
            let value = if negated { format!("^{inner}") } else { inner.to_string() };
            self.push_value(TokenKind::UnicodeProp, start, value);
        } else if self
            .byte_at(self.pos)
            .is_some_and(|b| b.is_ascii_alphabetic())
        {
            let letter = self.slice(self.pos, self.pos + 1);
            self.pos += 1;
            let value = if negated { format!("^{letter}") } else { letter.to_string() };
            self.push_value(TokenKind::UnicodeProp, start, value);
        } else {
            self.push_value(TokenKind::LiteralEscaped, start, self.slice(start + 1, start + 2).to_string());
        }
    }

    /// `\x{…}` or `\xHH` (zero to two hex digits).
    fn lex_hex(&mut self, start: usize) {
        if self.byte_at(self.pos) == Some(b'{') {
            if let Some(close) = memchr::memchr(b'}', &self.bytes[self.pos..]) {
                let inner = self.slice(self.pos + 1, self.pos + close);
                if !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_hexdigit()) {
                    let value = inner.to_string();
                    self.pos += close + 1;
                    self.push_value(TokenKind::Unicode, start, value);
                    return;
                }
            }
            // Malformed braces fall back to `\x` = NUL.
        }
        let mut at = self.pos;
        while at < self.pos + 2 && self.byte_at(at).is_some_and(|b| b.is_ascii_hexdigit()) {
            at += 1;
        }
        let value = if at == self.pos { "0".to_string() } else { self.slice(self.pos, at).to_string() };
        self.pos = at;
        self.push_value(TokenKind::Unicode, start, value);
    }

    /// `\u{…}` / `\uHHHH` alternative syntax; a bare `\u` is a literal `u`.
    fn lex_u_escape(&mut self, start: usize) {
        if self.byte_at(self.pos) == Some(b'{') {
            if let Some(close) = memchr::memchr(b'}', &self.bytes[self.pos..]) {
                let inner = self.slice(self.pos + 1, self.pos + close);
                if !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_hexdigit()) {
                    let value = inner.to_string();
                    self.pos += close + 1;
                    self.push_value(TokenKind::Unicode, start, value);
                    return;
                }
            }
        }
        let mut at = self.pos;
        while at < self.pos + 4 && self.byte_at(at).is_some_and(|b| b.is_ascii_hexdigit()) {
            at += 1;
        }
        if at == self.pos + 4 {
            let value = self.slice(self.pos, at).to_string();
            self.pos = at;
            self.push_value(TokenKind::Unicode, start, value);
        } else {
            self.push_value(TokenKind::LiteralEscaped, start, "u");
        }
    }

    /// `\o{17}`.
    fn lex_braced_octal(&mut self, start: usize) {
        if self.byte_at(self.pos) == Some(b'{') {
            if let Some(close) = memchr::memchr(b'}', &self.bytes[self.pos..]) {
                let inner = self.slice(self.pos + 1, self.pos + close);
                if !inner.is_empty() && inner.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
                    let value = inner.to_string();
                    self.pos += close + 1;
                    self.push_value(TokenKind::Octal, start, value);
                    return;
                }
            }
        }
        self.push_value(TokenKind::LiteralEscaped, start, "o");
    }

    /// `\0`, `\017`, and in-class `\123`: up to three octal digits.
    fn lex_legacy_octal(&mut self, start: usize) {
        let mut at = start + 1;
        while at < start + 4 && self.byte_at(at).is_some_and(|b| (b'0'..=b'7').contains(&b)) {
            at += 1;
        }
        let value = self.slice(start + 1, at).to_string();
        self.pos = at;
        self.push_value(TokenKind::OctalLegacy, start, value);
    }

    /// `\g…` family: `\g1`/`\g{-1}`/`\g{name}` are backreferences,
    /// `\g<name>`/`\g'name'` are subroutine calls.
    fn lex_g_reference(&mut self, start: usize) -> Result<()> {
        match self.byte_at(self.pos) {
            Some(b'{') => {
                let close = memchr::memchr(b'}', &self.bytes[self.pos..])
                    .ok_or(LexerError::Unrecognized { offset: self.base + start })?;
                let inner = self.slice(self.pos + 1, self.pos + close).to_string();
                if inner.is_empty() {
                    return Err(LexerError::Unrecognized { offset: self.base + start });
                }
                self.pos += close + 1;
                self.push_value(TokenKind::Backref, start, inner);
                Ok(())
            }
            Some(q @ (b'<' | b'\'')) => {
                let closing = if q == b'<' { b'>' } else { b'\'' };
                let from = self.pos + 1;
                let close = memchr::memchr(closing, &self.bytes[from..])
                    .ok_or(LexerError::Unrecognized { offset: self.base + start })?;
                let inner = self.slice(from, from + close);
                if inner.is_empty() {
                    return Err(LexerError::Unrecognized { offset: self.base + start });
                }
                let value = if inner.bytes().next().is_some_and(|b| b.is_ascii_digit() || b == b'+' || b == b'-') {
                    inner.to_string()
                } else {
                    format!("&{inner}")
                };
                self.pos = from + close + 1;
                self.push_value(TokenKind::GReference, start, value);
                Ok(())
            }
            Some(b) if b.is_ascii_digit() || b == b'-' || b == b'+' => {
                let mut at = self.pos + 1;
                while self.byte_at(at).is_some_and(|d| d.is_ascii_digit()) {
                    at += 1;
                }
                let value = self.slice(self.pos, at).to_string();
                self.pos = at;
                self.push_value(TokenKind::Backref, start, value);
                Ok(())
            }
            _ => Err(LexerError::Unrecognized { offset: self.base + start }),
        }
    }

    /// `\k<name>`, `\k'name'`, `\k{name}`.
    fn lex_k_reference(&mut self, start: usize) -> Result<()> {
        let Some(q @ (b'<' | b'\'' | b'{')) = self.byte_at(self.pos) else {
            return Err(LexerError::Unrecognized { offset: self.base + start });
        };
        let closing = match q {
            b'<' => b'>',
            b'{' => b'}',
            _ => b'\'',
        };
        let from = self.pos + 1;
        let close = memchr::memchr(closing, &self.bytes[from..])
            .ok_or(LexerError::Unrecognized { offset: self.base + start })?;
        let inner = self.slice(from, from + close).to_string();
        if inner.is_empty() {
            return Err(LexerError::Unrecognized { offset: self.base + start });
        }
        self.pos = from + close + 1;
        self.push_value(TokenKind::Backref, start, inner);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(pattern: &str) -> Vec<TokenKind> {
        Lexer::new(pattern)
            .tokenize()
            .unwrap()
            .tokens()
            .iter()
            .map(|t| t.kind)
            .collect()
    }

    fn values(pattern: &str) -> Vec<String> {
        Lexer::new(pattern)
            .tokenize()
            .unwrap()
            .tokens()
            .iter()
            .map(|t| t.value.to_string())
            .collect()
    }

    #[test]
    fn lexes_simple_alternation() {
        assert_eq!(
            kinds("a|b"),
            vec![
                TokenKind::Literal,
                TokenKind::Alternation,
                TokenKind::Literal,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn escaped_tab_carries_control_byte() {
        let stream = Lexer::new(r"\t").tokenize().unwrap();
        let t = &stream.tokens()[0];
        assert_eq!(t.kind, TokenKind::LiteralEscaped);
        assert_eq!(&*t.text, r"\t");
        assert_eq!(&*t.value, "\t");
    }

    #[test]
    fn double_negated_property_collapses() {
        assert_eq!(values(r"\P{^L}")[0], "L");
        assert_eq!(values(r"\P{L}")[0], "^L");
        assert_eq!(values(r"\p{^L}")[0], "^L");
        assert_eq!(values(r"\pL")[0], "L");
    }

    #[test]
    fn quantifier_value_strips_mode_suffix() {
        let stream = Lexer::new("a{2,3}?").tokenize().unwrap();
        let q = &stream.tokens()[1];
        assert_eq!(q.kind, TokenKind::Quantifier);
        assert_eq!(&*q.text, "{2,3}?");
        assert_eq!(&*q.value, "{2,3}");
    }

    #[test]
    fn brace_without_digits_is_literal() {
        assert_eq!(
            kinds("{a}"),
            vec![TokenKind::Literal, TokenKind::Literal, TokenKind::Literal, TokenKind::Eof]
        );
    }

    #[test]
    fn quote_mode_emits_end_only_when_closed() {
        assert_eq!(
            kinds(r"\Qa.b\E"),
            vec![
                TokenKind::QuoteModeStart,
                TokenKind::Literal,
                TokenKind::QuoteModeEnd,
                TokenKind::Eof
            ]
        );
        assert_eq!(
            kinds(r"\Qa.b"),
            vec![TokenKind::QuoteModeStart, TokenKind::Literal, TokenKind::Eof]
        );
    }

    #[test]
    fn comment_mode_produces_three_tokens() {
        assert_eq!(
            kinds("(?#note)"),
            vec![
                TokenKind::CommentOpen,
                TokenKind::CommentBody,
                TokenKind::CommentClose,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unclosed_comment_errors() {
        let err = Lexer::new("(?#note").tokenize().unwrap_err();
        assert_eq!(err, LexerError::UnclosedComment { offset: 0 });
        assert_eq!(err.to_string(), "Unclosed comment");
    }

    #[test]
    fn trailing_backslash_errors_at_eof() {
        let err = Lexer::new(r"ab\").tokenize().unwrap_err();
        assert_eq!(err, LexerError::TrailingBackslash { offset: 3 });
        assert_eq!(err.to_string(), "Unable to tokenize");
    }

    #[test]
    fn unclosed_class_errors() {
        let err = Lexer::new("[ab").tokenize().unwrap_err();
        assert_eq!(err.to_string(), "Unclosed character class \"]\" at end of input.");
    }

    #[test]
    fn class_dash_positions() {
        // leading and trailing dashes are literals, the middle one a range
        assert_eq!(
            kinds("[-a-z-]"),
            vec![
                TokenKind::CharClassOpen,
                TokenKind::Literal,
                TokenKind::Literal,
                TokenKind::Range,
                TokenKind::Literal,
                TokenKind::Literal,
                TokenKind::CharClassClose,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn range_end_does_not_start_new_range() {
        // `z` closes the range, so `-0` is literal dash, literal zero
        assert_eq!(
            kinds("[a-z-0]"),
            vec![
                TokenKind::CharClassOpen,
                TokenKind::Literal,
                TokenKind::Range,
                TokenKind::Literal,
                TokenKind::Literal,
                TokenKind::Literal,
                TokenKind::CharClassClose,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn negated_class_with_leading_bracket_literal() {
        assert_eq!(
            kinds("[^]a]"),
            vec![
                TokenKind::CharClassOpen,
                TokenKind::Negation,
                TokenKind::Literal,
                TokenKind::Literal,
                TokenKind::CharClassClose,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn posix_class_recognized() {
        let stream = Lexer::new("[[:alpha:]]").tokenize().unwrap();
        let t = &stream.tokens()[1];
        assert_eq!(t.kind, TokenKind::PosixClass);
        assert_eq!(&*t.value, "alpha");
        assert!(t.in_class);
    }

    #[test]
    fn unknown_posix_name_falls_back_to_literal_bracket() {
        assert_eq!(
            kinds("[[:nope:]]")[1],
            TokenKind::Literal
        );
    }

    #[test]
    fn class_operations() {
        assert_eq!(kinds("[a&&b]")[2], TokenKind::ClassIntersection);
        assert_eq!(kinds("[a--b]")[2], TokenKind::ClassSubtraction);
    }

    #[test]
    fn backref_vs_octal_in_class() {
        assert_eq!(kinds(r"\1")[0], TokenKind::Backref);
        assert_eq!(kinds(r"[\1]")[1], TokenKind::OctalLegacy);
    }

    #[test]
    fn g_reference_forms() {
        assert_eq!(values(r"\g{name}")[0], "name");
        assert_eq!(kinds(r"\g{name}")[0], TokenKind::Backref);
        assert_eq!(values(r"\g{-1}")[0], "-1");
        assert_eq!(values(r"\g<sub>")[0], "&sub");
        assert_eq!(kinds(r"\g<sub>")[0], TokenKind::GReference);
    }

    #[test]
    fn group_modifier_payloads() {
        assert_eq!(values("(?:a)")[0], ":");
        assert_eq!(values("(?<name>a)")[0], "<name>");
        assert_eq!(values("(?P<name>a)")[0], "P<name>");
        assert_eq!(values("(?'name'a)")[0], "'name'");
        assert_eq!(values("(?i-s:a)")[0], "i-s:");
        assert_eq!(values("(?i)a")[0], "i");
        assert_eq!(values("(?|a|b)")[0], "|");
    }

    #[test]
    fn subroutine_references() {
        assert_eq!(kinds("(?R)")[0], TokenKind::GReference);
        assert_eq!(values("(?1)")[0], "1");
        assert_eq!(values("(?+1)")[0], "+1");
        assert_eq!(values("(?&word)")[0], "&word");
        assert_eq!(values("(?P>word)")[0], "&word");
    }

    #[test]
    fn conditional_head_is_captured_whole() {
        let stream = Lexer::new("(?(1)a|b)").tokenize().unwrap();
        let t = &stream.tokens()[0];
        assert_eq!(t.kind, TokenKind::GroupModifierOpen);
        assert_eq!(&*t.value, "(1)");
    }

    #[test]
    fn lookaround_conditional_defers_condition() {
        let stream = Lexer::new("(?(?=a)b)").tokenize().unwrap();
        assert_eq!(&*stream.tokens()[0].value, "(");
        assert_eq!(&*stream.tokens()[1].value, "=");
    }

    #[test]
    fn verbs_and_callouts() {
        assert_eq!(values("(*SKIP)")[0], "SKIP");
        assert_eq!(values("(*MARK:here)")[0], "MARK:here");
        assert_eq!(kinds("(?C5)")[0], TokenKind::Callout);
        assert_eq!(values("(?C'tag')")[0], "'tag'");
        assert_eq!(values("(*sr:a)")[0], "script_run");
    }

    #[test]
    fn unknown_verb_is_rejected() {
        assert!(Lexer::new("(*NOPE)").tokenize().is_err());
    }

    #[test]
    fn extended_mode_skips_whitespace_and_comments() {
        let options = LexerOptions { extended: true, ..Default::default() };
        let stream = Lexer::with_options("a b # trailing\nc", options).tokenize().unwrap();
        let kinds: Vec<TokenKind> = stream.tokens().iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Literal, TokenKind::Literal, TokenKind::Literal, TokenKind::Eof]
        );
    }

    #[test]
    fn invalid_utf8_rejected_in_unicode_mode() {
        let err = Lexer::tokenize_bytes(b"a\xFFb", LexerOptions { unicode: true, ..Default::default() })
            .unwrap_err();
        assert_eq!(err.to_string(), "Input string is not valid UTF-8.");
    }

    #[test]
    fn invalid_utf8_decodes_as_latin1_otherwise() {
        let stream = Lexer::tokenize_bytes(b"a\xFF", LexerOptions::default()).unwrap();
        assert_eq!(stream.tokens()[1].kind, TokenKind::Literal);
    }

    #[test]
    fn base_offset_shifts_positions() {
        let stream = Lexer::new("ab").at_offset(1).tokenize().unwrap();
        assert_eq!(stream.tokens()[0].start, 1);
        assert_eq!(stream.tokens()[1].start, 2);
    }

    #[test]
    fn multibyte_literals_keep_byte_positions() {
        let stream = Lexer::new("é.").tokenize().unwrap();
        assert_eq!(&*stream.tokens()[0].text, "é");
        assert_eq!(stream.tokens()[1].start, 2);
    }
}
