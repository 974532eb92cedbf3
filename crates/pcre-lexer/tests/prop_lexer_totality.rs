//! Totality properties for the pattern lexer.
//!
//! The lexer must be a total function: for any input it either produces a
//! token stream covering the source in order, or returns a typed error. It
//! must never panic, never loop, and never emit more than O(len) tokens.

use pcre_lexer::{Lexer, LexerOptions};
use pcre_token::TokenKind;
use proptest::prelude::*;

proptest! {
    #[test]
    fn lexer_terminates_on_arbitrary_input(input in ".{0,64}") {
        // Ok or Err both fine; what matters is that we got here.
        let _ = Lexer::new(&input).tokenize();
    }

    #[test]
    fn lexer_terminates_on_metacharacter_soup(
        input in proptest::collection::vec(
            prop::sample::select(vec![
                'a', '\\', '[', ']', '(', ')', '{', '}', '*', '+', '?',
                '|', '^', '$', '.', '-', ':', '<', '>', '#', 'Q', 'E',
            ]),
            0..48,
        )
    ) {
        let pattern: String = input.into_iter().collect();
        let _ = Lexer::new(&pattern).tokenize();
    }

    #[test]
    fn token_count_is_linear(input in "[a-z|().*+?^$]{0,64}") {
        if let Ok(stream) = Lexer::new(&input).tokenize() {
            prop_assert!(stream.tokens().len() <= input.len() + 1);
        }
    }

    #[test]
    fn positions_are_monotone_and_bounded(input in ".{0,64}") {
        if let Ok(stream) = Lexer::new(&input).tokenize() {
            let mut last_start = 0;
            for token in stream.tokens() {
                prop_assert!(token.start >= last_start);
                prop_assert!(token.end <= input.len());
                prop_assert!(token.start <= token.end);
                last_start = token.start;
            }
            prop_assert_eq!(stream.tokens().last().map(|t| t.kind), Some(TokenKind::Eof));
        }
    }

    #[test]
    fn quote_mode_literal_runs_to_eof_without_terminator(body in "[a-z.*+]{1,16}") {
        let pattern = format!("\\Q{body}");
        let stream = Lexer::new(&pattern).tokenize().unwrap();
        let kinds: Vec<TokenKind> = stream.tokens().iter().map(|t| t.kind).collect();
        prop_assert_eq!(
            kinds,
            vec![TokenKind::QuoteModeStart, TokenKind::Literal, TokenKind::Eof]
        );
        prop_assert_eq!(&*stream.tokens()[1].text, body.as_str());
    }

    #[test]
    fn unicode_mode_accepts_all_valid_utf8(input in "\\PC{0,24}") {
        let options = LexerOptions { unicode: true, ..Default::default() };
        let _ = Lexer::tokenize_bytes(input.as_bytes(), options);
    }
}
