//! Sorted disjoint code-point range sets.

use std::fmt;

/// Highest valid Unicode scalar value.
pub const UNICODE_MAX: u32 = 0x10FFFF;

/// Highest code point in byte (non-`/u`) mode.
pub const BYTE_MAX: u32 = 0xFF;

/// A set of Unicode code points stored as sorted, disjoint, inclusive
/// `(lo, hi)` ranges.
///
/// Invariants maintained by every constructor and operation:
/// - ranges are sorted ascending by `lo`
/// - no two ranges overlap
/// - no two ranges are adjacent (`hi + 1 < next.lo`)
///
/// The flat representation keeps membership tests at `O(log n)` and the
/// merge-based set operations at `O(n + m)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CharSet {
    ranges: Vec<(u32, u32)>,
}

impl CharSet {
    /// The empty set.
    pub fn empty() -> Self {
        CharSet { ranges: Vec::new() }
    }

    /// The full set `[0, max]`.
    pub fn full(max: u32) -> Self {
        CharSet { ranges: vec![(0, max)] }
    }

    /// A single code point.
    pub fn from_char(cp: u32) -> Self {
        CharSet { ranges: vec![(cp, cp)] }
    }

    /// A single inclusive range. An inverted range (`lo > hi`) yields the
    /// empty set; range validity is the caller's concern.
    pub fn from_range(lo: u32, hi: u32) -> Self {
        if lo > hi {
            return CharSet::empty();
        }
        CharSet { ranges: vec![(lo, hi)] }
    }

    /// Build a set from arbitrary (possibly unsorted, overlapping) ranges.
    pub fn from_ranges<I: IntoIterator<Item = (u32, u32)>>(ranges: I) -> Self {
        let mut list: Vec<(u32, u32)> = ranges.into_iter().filter(|(lo, hi)| lo <= hi).collect();
        list.sort_unstable();
        let mut normalized: Vec<(u32, u32)> = Vec::with_capacity(list.len());
        for (lo, hi) in list {
            match normalized.last_mut() {
                Some((_, prev_hi)) if lo <= prev_hi.saturating_add(1) => {
                    *prev_hi = (*prev_hi).max(hi);
                }
                _ => normalized.push((lo, hi)),
            }
        }
        CharSet { ranges: normalized }
    }

    /// Build a set from individual characters.
    pub fn from_chars<I: IntoIterator<Item = char>>(chars: I) -> Self {
        Self::from_ranges(chars.into_iter().map(|c| (c as u32, c as u32)))
    }

    /// Whether the set contains no code points.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of code points in the set.
    pub fn len(&self) -> u64 {
        self.ranges.iter().map(|(lo, hi)| u64::from(hi - lo) + 1).sum()
    }

    /// Smallest code point in the set, if any.
    pub fn min(&self) -> Option<u32> {
        self.ranges.first().map(|&(lo, _)| lo)
    }

    /// Largest code point in the set, if any.
    pub fn max(&self) -> Option<u32> {
        self.ranges.last().map(|&(_, hi)| hi)
    }

    /// Membership test by binary search over the range list.
    pub fn contains(&self, cp: u32) -> bool {
        self.ranges
            .binary_search_by(|&(lo, hi)| {
                if cp < lo {
                    std::cmp::Ordering::Greater
                } else if cp > hi {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// The sorted disjoint ranges backing this set.
    pub fn ranges(&self) -> &[(u32, u32)] {
        &self.ranges
    }

    /// Union of two sets.
    pub fn union(&self, other: &CharSet) -> CharSet {
        CharSet::from_ranges(self.ranges.iter().chain(other.ranges.iter()).copied())
    }

    /// Intersection of two sets via a linear two-pointer sweep.
    pub fn intersect(&self, other: &CharSet) -> CharSet {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let (a_lo, a_hi) = self.ranges[i];
            let (b_lo, b_hi) = other.ranges[j];
            let lo = a_lo.max(b_lo);
            let hi = a_hi.min(b_hi);
            if lo <= hi {
                out.push((lo, hi));
            }
            if a_hi < b_hi {
                i += 1;
            } else {
                j += 1;
            }
        }
        // Output of the sweep is already sorted and disjoint but may contain
        // adjacent ranges when the inputs did; normalize once.
        CharSet::from_ranges(out)
    }

    /// Set difference `self \ other`.
    pub fn subtract(&self, other: &CharSet) -> CharSet {
        let mut out = Vec::new();
        let mut j = 0;
        for &(lo, hi) in &self.ranges {
            let mut cur = lo;
            while j < other.ranges.len() && other.ranges[j].1 < cur {
                j += 1;
            }
            let mut k = j;
            while k < other.ranges.len() && other.ranges[k].0 <= hi {
                let (b_lo, b_hi) = other.ranges[k];
                if b_lo > cur {
                    out.push((cur, b_lo - 1));
                }
                cur = b_hi.saturating_add(1);
                if cur > hi {
                    break;
                }
                k += 1;
            }
            if cur <= hi {
                out.push((cur, hi));
            }
        }
        CharSet::from_ranges(out)
    }

    /// Complement within `[0, max]`.
    pub fn complement(&self, max: u32) -> CharSet {
        CharSet::full(max).subtract(self)
    }

    /// Whether the two sets share at least one code point.
    pub fn intersects(&self, other: &CharSet) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let (a_lo, a_hi) = self.ranges[i];
            let (b_lo, b_hi) = other.ranges[j];
            if a_lo.max(b_lo) <= a_hi.min(b_hi) {
                return true;
            }
            if a_hi < b_hi {
                i += 1;
            } else {
                j += 1;
            }
        }
        false
    }

    /// Whether every code point of `self` is in `other`.
    pub fn is_subset_of(&self, other: &CharSet) -> bool {
        self.subtract(other).is_empty()
    }
}

impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (lo, hi)) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if lo == hi {
                write!(f, "{lo:#x}")?;
            } else {
                write!(f, "{lo:#x}-{hi:#x}")?;
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_ranges_merges_overlap_and_adjacency() {
        let set = CharSet::from_ranges([(10, 20), (15, 25), (26, 30), (40, 41)]);
        assert_eq!(set.ranges(), &[(10, 30), (40, 41)]);
    }

    #[test]
    fn contains_uses_inclusive_bounds() {
        let set = CharSet::from_range(0x61, 0x7A);
        assert!(set.contains(0x61));
        assert!(set.contains(0x7A));
        assert!(!set.contains(0x60));
        assert!(!set.contains(0x7B));
    }

    #[test]
    fn subtract_splits_ranges() {
        let set = CharSet::from_range(0, 99);
        let hole = CharSet::from_range(10, 19);
        let out = set.subtract(&hole);
        assert_eq!(out.ranges(), &[(0, 9), (20, 99)]);
    }

    #[test]
    fn complement_round_trips() {
        let set = CharSet::from_ranges([(5, 10), (20, 30)]);
        assert_eq!(set.complement(UNICODE_MAX).complement(UNICODE_MAX), set);
    }

    #[test]
    fn complement_of_empty_is_full() {
        assert_eq!(CharSet::empty().complement(BYTE_MAX), CharSet::full(BYTE_MAX));
    }

    #[test]
    fn len_counts_code_points() {
        let set = CharSet::from_ranges([(0, 9), (20, 20)]);
        assert_eq!(set.len(), 11);
    }

    #[test]
    fn intersects_detects_single_point_overlap() {
        let a = CharSet::from_range(0, 10);
        let b = CharSet::from_range(10, 20);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&CharSet::from_range(11, 20)));
    }

    #[test]
    fn inverted_range_is_empty() {
        assert!(CharSet::from_range(10, 5).is_empty());
    }
}
