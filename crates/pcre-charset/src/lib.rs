//! Code-point primitives shared across the PCRE analysis workspace.
//!
//! This crate provides [`CharSet`], a sorted list of disjoint inclusive
//! code-point ranges used as the alphabet representation everywhere a
//! character class has to be reasoned about: class merging in the optimizer,
//! overlap checks in the ReDoS analyzer, and edge labels in the automata
//! solver. It also carries small UTF-8 helpers and the predefined sets
//! behind `\d`, `\s`, `\w` and friends.
//!
//! # Representation
//!
//! A `CharSet` holds `(lo, hi)` pairs, sorted ascending, non-overlapping and
//! non-adjacent (adjacent ranges are merged on construction). Membership is
//! a binary search; union, intersection and subtraction are linear merges
//! over the two range lists.
//!
//! ```
//! use pcre_charset::CharSet;
//!
//! let lower = CharSet::from_range('a' as u32, 'z' as u32);
//! let vowels = CharSet::from_chars("aeiou".chars());
//! assert!(lower.contains('q' as u32));
//! assert_eq!(vowels.intersect(&lower), vowels);
//! ```

mod charset;
mod predefined;
mod utf8;

pub use charset::{CharSet, BYTE_MAX, UNICODE_MAX};
pub use predefined::{
    digit, horizontal_space, newline, space, vertical_space, word,
};
pub use utf8::{encode_code_point, is_valid_code_point};
