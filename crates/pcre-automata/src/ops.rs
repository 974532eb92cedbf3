//! Language operations over range-transition DFAs.
//!
//! Because transitions are code-point ranges, two DFAs need no shared
//! alphabet object: the product walks both range lists with a two-pointer
//! sweep, and the complement fills the gaps with an explicit trap.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::dfa::{Dfa, DfaState};

/// Complement within `[0, max_code_point]`: complete, then flip acceptance.
pub fn complement(dfa: &Dfa) -> Dfa {
    let trap = dfa.states.len();
    let mut states = dfa.states.clone();
    for state in &mut states {
        let mut filled: Vec<(u32, u32, usize)> = Vec::new();
        let mut next = 0u32;
        for &(lo, hi, t) in &state.transitions {
            if lo > next {
                filled.push((next, lo - 1, trap));
            }
            filled.push((lo, hi, t));
            next = hi.saturating_add(1);
        }
        if next <= dfa.max_code_point {
            filled.push((next, dfa.max_code_point, trap));
        }
        state.transitions = filled;
        state.accepting = !state.accepting;
    }
    states.push(DfaState {
        transitions: vec![(0, dfa.max_code_point, trap)],
        accepting: true,
    });
    Dfa { states, start: dfa.start, max_code_point: dfa.max_code_point }
}

/// Range-wise pairing of two states' transitions.
fn pair_transitions(
    a: &DfaState,
    b: &DfaState,
) -> Vec<(u32, u32, (usize, usize))> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.transitions.len() && j < b.transitions.len() {
        let (alo, ahi, at) = a.transitions[i];
        let (blo, bhi, bt) = b.transitions[j];
        let lo = alo.max(blo);
        let hi = ahi.min(bhi);
        if lo <= hi {
            out.push((lo, hi, (at, bt)));
        }
        if ahi < bhi {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

/// Product automaton accepting iff both inputs accept.
///
/// Missing transitions prune the pair (neither side can recover), so the
/// result stays small for disjoint languages.
pub fn intersect(left: &Dfa, right: &Dfa) -> Dfa {
    let max_code_point = left.max_code_point.max(right.max_code_point);
    let mut ids: FxHashMap<(usize, usize), usize> = FxHashMap::default();
    let mut states: Vec<DfaState> = Vec::new();
    let mut pairs: Vec<(usize, usize)> = Vec::new();

    let start = (left.start, right.start);
    ids.insert(start, 0);
    pairs.push(start);
    states.push(DfaState { transitions: Vec::new(), accepting: false });

    let mut cursor = 0;
    while cursor < pairs.len() {
        let (l, r) = pairs[cursor];
        states[cursor].accepting =
            left.states[l].accepting && right.states[r].accepting;
        let mut transitions: Vec<(u32, u32, usize)> = Vec::new();
        for (lo, hi, pair) in pair_transitions(&left.states[l], &right.states[r]) {
            let id = match ids.get(&pair) {
                Some(&id) => id,
                None => {
                    let id = pairs.len();
                    ids.insert(pair, id);
                    pairs.push(pair);
                    states.push(DfaState { transitions: Vec::new(), accepting: false });
                    id
                }
            };
            match transitions.last_mut() {
                Some((_, prev_hi, prev_t))
                    if *prev_t == id && prev_hi.saturating_add(1) == lo =>
                {
                    *prev_hi = hi;
                }
                _ => transitions.push((lo, hi, id)),
            }
        }
        states[cursor].transitions = transitions;
        cursor += 1;
    }

    Dfa { states, start: 0, max_code_point }
}

/// Shortest accepted string; ties broken lexicographically by taking the
/// lowest code point of each range first.
pub fn shortest_example(dfa: &Dfa) -> Option<String> {
    if dfa.states.is_empty() {
        return None;
    }
    let mut prev: Vec<Option<(usize, u32)>> = vec![None; dfa.states.len()];
    let mut seen = vec![false; dfa.states.len()];
    let mut queue = VecDeque::from([dfa.start]);
    seen[dfa.start] = true;

    let mut accepting = None;
    if dfa.states[dfa.start].accepting {
        accepting = Some(dfa.start);
    }
    while accepting.is_none() {
        let Some(state) = queue.pop_front() else {
            return None;
        };
        for &(lo, _, target) in &dfa.states[state].transitions {
            if seen[target] {
                continue;
            }
            seen[target] = true;
            prev[target] = Some((state, lo));
            if dfa.states[target].accepting {
                accepting = Some(target);
                break;
            }
            queue.push_back(target);
        }
    }

    let mut out: Vec<char> = Vec::new();
    let mut state = accepting?;
    while let Some((parent, cp)) = prev[state] {
        out.push(char::from_u32(cp).unwrap_or('\u{FFFD}'));
        state = parent;
    }
    out.reverse();
    Some(out.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::{determinize_nfa, Determinizer};
    use crate::error::{Phase, WorkBudget};
    use crate::minimize::{minimize, MinimizerKind};
    use crate::nfa::{translate, TranslateOptions};
    use pcre_parser::Parser;

    fn dfa(source: &str) -> Dfa {
        let ast = Parser::new().parse(source).unwrap();
        let nfa = translate(&ast, &TranslateOptions::default()).unwrap();
        let mut budget = WorkBudget::new(Phase::Determinize, 1_000_000);
        let raw = determinize_nfa(&nfa, Determinizer::Subset, &mut budget).unwrap();
        let mut budget = WorkBudget::new(Phase::Minimize, 1_000_000);
        minimize(&raw, MinimizerKind::Moore, &mut budget).unwrap()
    }

    #[test]
    fn complement_flips_membership() {
        let d = complement(&dfa("/ab/"));
        assert!(!d.accepts_str("ab"));
        assert!(d.accepts_str(""));
        assert!(d.accepts_str("zz"));
    }

    #[test]
    fn intersection_accepts_common_strings_only() {
        let product = intersect(&dfa("/a[bc]/"), &dfa("/ab|xy/"));
        assert!(product.accepts_str("ab"));
        assert!(!product.accepts_str("ac"));
        assert!(!product.accepts_str("xy"));
    }

    #[test]
    fn disjoint_languages_have_empty_intersection() {
        let product = intersect(&dfa("/a+/"), &dfa("/b+/"));
        assert!(product.is_empty_language());
        assert_eq!(shortest_example(&product), None);
    }

    #[test]
    fn shortest_example_prefers_short_then_lexicographic() {
        assert_eq!(shortest_example(&dfa("/aa|b/")), Some("b".to_string()));
        assert_eq!(shortest_example(&dfa("/ba|ab/")), Some("ab".to_string()));
        assert_eq!(shortest_example(&dfa("/a*/")), Some(String::new()));
    }

    #[test]
    fn subset_via_complement() {
        let edit_not_lower = intersect(&dfa("/edit/"), &complement(&dfa("/[a-z]+/")));
        assert!(edit_not_lower.is_empty_language());

        let any_not_abc = intersect(&dfa("/.*/"), &complement(&dfa("/abc/")));
        assert!(!any_not_abc.is_empty_language());
        let witness = shortest_example(&any_not_abc).unwrap();
        assert_ne!(witness, "abc");
    }
}
