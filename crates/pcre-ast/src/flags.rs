//! Pattern modifier flags.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The accepted flag alphabet, in canonical output order.
pub const FLAG_ALPHABET: &str = "imsxuUJADSX";

/// Raised when a flag string contains characters outside the alphabet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown regex flag(s) \"{unknown}\"")]
pub struct FlagError {
    /// The offending characters, in source order.
    pub unknown: String,
}

/// Parsed pattern modifiers.
///
/// Mirrors the PCRE flag letters; each field is one letter. Parsing rejects
/// anything outside [`FLAG_ALPHABET`], and `Display` re-emits the canonical
/// order so recompiled patterns normalize flag ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Flags {
    /// `i` — caseless matching
    pub ignore_case: bool,
    /// `m` — `^`/`$` match at newlines
    pub multiline: bool,
    /// `s` — dot matches newline
    pub dotall: bool,
    /// `x` — extended mode, whitespace ignored
    pub extended: bool,
    /// `u` — Unicode mode, pattern and subject are UTF
    pub unicode: bool,
    /// `U` — quantifiers ungreedy by default
    pub ungreedy: bool,
    /// `J` — duplicate group names allowed
    pub dup_names: bool,
    /// `A` — anchored at start
    pub anchored: bool,
    /// `D` — `$` matches only at end of subject
    pub dollar_end_only: bool,
    /// `S` — extra pattern study (accepted, no effect on analysis)
    pub study: bool,
    /// `X` — PCRE extras
    pub extra: bool,
}

impl Flags {
    /// Parse a flag string, rejecting unknown letters.
    pub fn parse(s: &str) -> Result<Flags, FlagError> {
        let mut flags = Flags::default();
        let mut unknown = String::new();
        for ch in s.chars() {
            match ch {
                'i' => flags.ignore_case = true,
                'm' => flags.multiline = true,
                's' => flags.dotall = true,
                'x' => flags.extended = true,
                'u' => flags.unicode = true,
                'U' => flags.ungreedy = true,
                'J' => flags.dup_names = true,
                'A' => flags.anchored = true,
                'D' => flags.dollar_end_only = true,
                'S' => flags.study = true,
                'X' => flags.extra = true,
                other => unknown.push(other),
            }
        }
        if unknown.is_empty() {
            Ok(flags)
        } else {
            Err(FlagError { unknown })
        }
    }

    /// Whether no flag is set.
    pub fn is_empty(&self) -> bool {
        *self == Flags::default()
    }

    /// Whether a given flag letter is set.
    pub fn has(&self, letter: char) -> bool {
        match letter {
            'i' => self.ignore_case,
            'm' => self.multiline,
            's' => self.dotall,
            'x' => self.extended,
            'u' => self.unicode,
            'U' => self.ungreedy,
            'J' => self.dup_names,
            'A' => self.anchored,
            'D' => self.dollar_end_only,
            'S' => self.study,
            'X' => self.extra,
            _ => false,
        }
    }

    /// Set or clear a flag by letter. Unknown letters are ignored; the
    /// parser validates the alphabet before this is reached.
    pub fn set(&mut self, letter: char, on: bool) {
        match letter {
            'i' => self.ignore_case = on,
            'm' => self.multiline = on,
            's' => self.dotall = on,
            'x' => self.extended = on,
            'u' => self.unicode = on,
            'U' => self.ungreedy = on,
            'J' => self.dup_names = on,
            'A' => self.anchored = on,
            'D' => self.dollar_end_only = on,
            'S' => self.study = on,
            'X' => self.extra = on,
            _ => {}
        }
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for letter in FLAG_ALPHABET.chars() {
            if self.has(letter) {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_alphabet() {
        let flags = Flags::parse("imsxuUJADSX").unwrap();
        for letter in FLAG_ALPHABET.chars() {
            assert!(flags.has(letter), "flag {letter} not set");
        }
    }

    #[test]
    fn rejects_unknown_letters() {
        let err = Flags::parse("igz").unwrap_err();
        assert_eq!(err.unknown, "gz");
        assert_eq!(err.to_string(), "Unknown regex flag(s) \"gz\"");
    }

    #[test]
    fn display_is_canonical_order() {
        let flags = Flags::parse("umi").unwrap();
        assert_eq!(flags.to_string(), "imu");
    }

    #[test]
    fn empty_string_is_default() {
        assert!(Flags::parse("").unwrap().is_empty());
    }
}
