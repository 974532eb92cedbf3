//! Subset construction over the partitioned alphabet.
//!
//! Two interchangeable variants: [`Determinizer::Subset`] scans edge sets
//! per move, [`Determinizer::SubsetIndexed`] precomputes a per-state,
//! per-symbol target index. Both produce structurally identical DFAs.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::alphabet::Alphabet;
use crate::error::{ComplexityError, Phase, WorkBudget};
use crate::nfa::Nfa;

/// Subset-construction variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Determinizer {
    /// Classic: scan edge sets per (state, symbol) move
    #[default]
    Subset,
    /// Precomputed per-symbol adjacency index
    SubsetIndexed,
}

/// One DFA state: sorted range transitions plus the acceptance bit.
///
/// Missing ranges go to the implicit trap state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DfaState {
    /// `(lo, hi, target)` triples, sorted by `lo`, non-overlapping
    pub transitions: Vec<(u32, u32, usize)>,
    /// Whether this state accepts
    pub accepting: bool,
}

impl DfaState {
    /// Transition target for a code point, if any.
    pub fn target(&self, cp: u32) -> Option<usize> {
        self.transitions
            .binary_search_by(|&(lo, hi, _)| {
                if cp < lo {
                    std::cmp::Ordering::Greater
                } else if cp > hi {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .ok()
            .map(|i| self.transitions[i].2)
    }
}

/// A deterministic automaton with range transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dfa {
    /// States addressed by index; `start` is always 0 after construction
    pub states: Vec<DfaState>,
    /// Entry state
    pub start: usize,
    /// Highest code point of the alphabet
    pub max_code_point: u32,
}

impl Dfa {
    /// Whether the DFA accepts a string of code points.
    pub fn accepts<I: IntoIterator<Item = u32>>(&self, input: I) -> bool {
        let mut state = self.start;
        for cp in input {
            match self.states[state].target(cp) {
                Some(next) => state = next,
                None => return false,
            }
        }
        self.states[state].accepting
    }

    /// Whether the DFA accepts a UTF-8 string.
    pub fn accepts_str(&self, input: &str) -> bool {
        self.accepts(input.chars().map(|c| c as u32))
    }

    /// Whether any accepting state is reachable.
    pub fn is_empty_language(&self) -> bool {
        let mut seen = vec![false; self.states.len()];
        let mut stack = vec![self.start];
        while let Some(state) = stack.pop() {
            if seen[state] {
                continue;
            }
            seen[state] = true;
            if self.states[state].accepting {
                return false;
            }
            for &(_, _, target) in &self.states[state].transitions {
                stack.push(target);
            }
        }
        true
    }
}

/// ε-closure of a sorted state set, returned sorted and deduplicated.
fn closure(nfa: &Nfa, seed: &[usize]) -> Vec<usize> {
    let mut seen = vec![false; nfa.states.len()];
    let mut stack: Vec<usize> = seed.to_vec();
    for &s in seed {
        seen[s] = true;
    }
    while let Some(state) = stack.pop() {
        for (set, target) in &nfa.states[state].edges {
            if set.is_none() && !seen[*target] {
                seen[*target] = true;
                stack.push(*target);
            }
        }
    }
    let mut out: Vec<usize> = seen
        .iter()
        .enumerate()
        .filter_map(|(i, &v)| v.then_some(i))
        .collect();
    out.sort_unstable();
    out
}

/// Determinize an NFA over a partitioned alphabet.
pub fn determinize(
    nfa: &Nfa,
    alphabet: &Alphabet,
    variant: Determinizer,
    budget: &mut WorkBudget,
) -> Result<Dfa, ComplexityError> {
    let index = match variant {
        Determinizer::Subset => None,
        Determinizer::SubsetIndexed => Some(build_index(nfa, alphabet)),
    };

    let mut set_ids: FxHashMap<Vec<usize>, usize> = FxHashMap::default();
    let mut sets: Vec<Vec<usize>> = Vec::new();
    let mut states: Vec<DfaState> = Vec::new();

    let start_set = closure(nfa, &[nfa.start]);
    set_ids.insert(start_set.clone(), 0);
    sets.push(start_set);
    states.push(DfaState { transitions: Vec::new(), accepting: false });

    let mut cursor = 0;
    while cursor < sets.len() {
        let current = sets[cursor].clone();
        let accepting = current.binary_search(&nfa.accept).is_ok();
        let mut symbol_targets: Vec<Option<usize>> = Vec::with_capacity(alphabet.len());

        for (symbol, &(lo, _)) in alphabet.symbols().iter().enumerate() {
            budget.charge(1)?;
            let mut moved: Vec<usize> = Vec::new();
            match &index {
                Some(index) => {
                    for &state in &current {
                        moved.extend_from_slice(&index[state][symbol]);
                    }
                }
                None => {
                    for &state in &current {
                        for (set, target) in &nfa.states[state].edges {
                            if let Some(set) = set {
                                if set.contains(lo) {
                                    moved.push(*target);
                                }
                            }
                        }
                    }
                }
            }
            if moved.is_empty() {
                symbol_targets.push(None);
                continue;
            }
            moved.sort_unstable();
            moved.dedup();
            let next = closure(nfa, &moved);
            let id = match set_ids.get(&next) {
                Some(&id) => id,
                None => {
                    let id = sets.len();
                    set_ids.insert(next.clone(), id);
                    sets.push(next);
                    states.push(DfaState { transitions: Vec::new(), accepting: false });
                    id
                }
            };
            symbol_targets.push(Some(id));
        }

        states[cursor].accepting = accepting;
        states[cursor].transitions = compress(alphabet, &symbol_targets);
        cursor += 1;
    }

    Ok(Dfa { states, start: 0, max_code_point: nfa.max_code_point })
}

/// Per-state, per-symbol adjacency for the indexed variant.
fn build_index(nfa: &Nfa, alphabet: &Alphabet) -> Vec<Vec<Vec<usize>>> {
    let mut index = vec![vec![Vec::new(); alphabet.len()]; nfa.states.len()];
    for (state, node) in nfa.states.iter().enumerate() {
        for (set, target) in &node.edges {
            let Some(set) = set else { continue };
            for &(lo, hi) in set.ranges() {
                let Some(first) = alphabet.index_of(lo) else { continue };
                let last = alphabet.index_of(hi).unwrap_or(first);
                for symbol in first..=last {
                    index[state][symbol].push(*target);
                }
            }
        }
    }
    index
}

/// Merge adjacent symbols with the same target into range triples.
fn compress(alphabet: &Alphabet, symbol_targets: &[Option<usize>]) -> Vec<(u32, u32, usize)> {
    let mut out: Vec<(u32, u32, usize)> = Vec::new();
    for (symbol, target) in symbol_targets.iter().enumerate() {
        let Some(target) = target else { continue };
        let (lo, hi) = alphabet.symbols()[symbol];
        match out.last_mut() {
            Some((_, prev_hi, prev_target))
                if *prev_target == *target && prev_hi.saturating_add(1) == lo =>
            {
                *prev_hi = hi;
            }
            _ => out.push((lo, hi, *target)),
        }
    }
    out
}

/// Determinize with both variants sharing one helper, for callers that
/// parameterize over the enum.
pub fn determinize_nfa(
    nfa: &Nfa,
    variant: Determinizer,
    budget: &mut WorkBudget,
) -> Result<Dfa, ComplexityError> {
    let sets = nfa.edge_sets();
    let alphabet = Alphabet::partition(sets, nfa.max_code_point);
    determinize(nfa, &alphabet, variant, budget)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfa::{translate, TranslateOptions};
    use pcre_parser::Parser;

    fn dfa(source: &str, variant: Determinizer) -> Dfa {
        let ast = Parser::new().parse(source).unwrap();
        let nfa = translate(&ast, &TranslateOptions::default()).unwrap();
        let mut budget = WorkBudget::new(Phase::Determinize, 100_000);
        determinize_nfa(&nfa, variant, &mut budget).unwrap()
    }

    #[test]
    fn accepts_matches_simple_language() {
        let d = dfa("/ab|ac/", Determinizer::Subset);
        assert!(d.accepts_str("ab"));
        assert!(d.accepts_str("ac"));
        assert!(!d.accepts_str("a"));
        assert!(!d.accepts_str("abc"));
        assert!(!d.accepts_str(""));
    }

    #[test]
    fn star_accepts_empty() {
        let d = dfa("/a*/", Determinizer::Subset);
        assert!(d.accepts_str(""));
        assert!(d.accepts_str("aaaa"));
        assert!(!d.accepts_str("b"));
    }

    #[test]
    fn class_ranges_stay_ranges() {
        let d = dfa("/[a-z]+/", Determinizer::Subset);
        assert!(d.accepts_str("hello"));
        assert!(!d.accepts_str("Hello"));
        // transitions are compressed to a single range per state
        for state in &d.states {
            assert!(state.transitions.len() <= 1);
        }
    }

    #[test]
    fn variants_agree_structurally() {
        for source in ["/ab|ac/", "/[a-f]{2,3}x?/", "/(a|b)*c/", "/a|/"] {
            let plain = dfa(source, Determinizer::Subset);
            let indexed = dfa(source, Determinizer::SubsetIndexed);
            assert_eq!(plain, indexed, "variant mismatch for {source}");
        }
    }

    #[test]
    fn budget_trips_on_large_counted_repeats() {
        let ast = Parser::new().parse("/[ab]{1,200}/").unwrap();
        let nfa = translate(&ast, &TranslateOptions::default()).unwrap();
        let mut budget = WorkBudget::new(Phase::Determinize, 50);
        let err = determinize_nfa(&nfa, Determinizer::Subset, &mut budget).unwrap_err();
        assert!(matches!(
            err,
            ComplexityError::BudgetExceeded { phase: Phase::Determinize, .. }
        ));
    }

    #[test]
    fn empty_pattern_accepts_only_empty_string() {
        let d = dfa("//", Determinizer::Subset);
        assert!(d.accepts_str(""));
        assert!(!d.accepts_str("a"));
    }
}
