//! Predefined character-type sets.
//!
//! These back `\d`, `\s`, `\w`, `\h`, `\v` and `\R` wherever a visitor or
//! the automata solver needs the concrete code points. PCRE2 defaults (no
//! UCP) keep `\d` and `\w` ASCII; the space sets carry the PCRE2 extras.

use std::sync::OnceLock;

use crate::charset::CharSet;

/// `\d` — ASCII digits.
pub fn digit() -> &'static CharSet {
    static SET: OnceLock<CharSet> = OnceLock::new();
    SET.get_or_init(|| CharSet::from_range(0x30, 0x39))
}

/// `\w` — ASCII word characters.
pub fn word() -> &'static CharSet {
    static SET: OnceLock<CharSet> = OnceLock::new();
    SET.get_or_init(|| {
        CharSet::from_ranges([
            (0x30, 0x39), // 0-9
            (0x41, 0x5A), // A-Z
            (0x5F, 0x5F), // _
            (0x61, 0x7A), // a-z
        ])
    })
}

/// `\s` — HT, LF, VT, FF, CR, space.
pub fn space() -> &'static CharSet {
    static SET: OnceLock<CharSet> = OnceLock::new();
    SET.get_or_init(|| CharSet::from_ranges([(0x09, 0x0D), (0x20, 0x20)]))
}

/// `\h` — horizontal whitespace, including the Unicode space separators.
pub fn horizontal_space() -> &'static CharSet {
    static SET: OnceLock<CharSet> = OnceLock::new();
    SET.get_or_init(|| {
        CharSet::from_ranges([
            (0x09, 0x09),     // HT
            (0x20, 0x20),     // space
            (0xA0, 0xA0),     // NBSP
            (0x1680, 0x1680), // ogham space mark
            (0x2000, 0x200A), // en quad .. hair space
            (0x202F, 0x202F), // narrow no-break space
            (0x205F, 0x205F), // medium mathematical space
            (0x3000, 0x3000), // ideographic space
        ])
    })
}

/// `\v` — vertical whitespace.
pub fn vertical_space() -> &'static CharSet {
    static SET: OnceLock<CharSet> = OnceLock::new();
    SET.get_or_init(|| {
        CharSet::from_ranges([
            (0x0A, 0x0D),     // LF, VT, FF, CR
            (0x85, 0x85),     // NEL
            (0x2028, 0x2029), // line separator, paragraph separator
        ])
    })
}

/// The code points `\R` can start with. The CRLF pair itself is handled as
/// an alternation by consumers; as a set, `\R` covers the same points as
/// `\v`.
pub fn newline() -> &'static CharSet {
    vertical_space()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_is_ascii_only() {
        assert!(digit().contains('0' as u32));
        assert!(digit().contains('9' as u32));
        assert!(!digit().contains(0x0660)); // ARABIC-INDIC DIGIT ZERO
    }

    #[test]
    fn word_includes_underscore() {
        assert!(word().contains('_' as u32));
        assert!(word().contains('Z' as u32));
        assert!(!word().contains('-' as u32));
    }

    #[test]
    fn horizontal_and_vertical_are_disjoint() {
        assert!(!horizontal_space().intersects(vertical_space()));
    }

    #[test]
    fn space_is_union_fragment_of_h_and_v() {
        let hv = horizontal_space().union(vertical_space());
        assert!(space().is_subset_of(&hv));
    }
}
