//! Pluggable DFA cache.
//!
//! Minimized DFAs are cached by a key covering everything that affects the
//! result: pattern, flags, match mode, both algorithm choices, and the
//! crate version (so upgrades invalidate). On a hit the solver skips the
//! work-budget bookkeeping entirely.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

use crate::dfa::{Determinizer, Dfa};
use crate::minimize::MinimizerKind;
use crate::nfa::MatchMode;

/// Build the cache key for one solve.
pub fn cache_key(
    pattern: &str,
    match_mode: MatchMode,
    determinizer: Determinizer,
    minimizer: MinimizerKind,
) -> String {
    let mode = match match_mode {
        MatchMode::Full => "full",
        MatchMode::Unanchored => "unanchored",
    };
    let det = match determinizer {
        Determinizer::Subset => "subset",
        Determinizer::SubsetIndexed => "subset-indexed",
    };
    let min = match minimizer {
        MinimizerKind::Moore => "moore",
        MinimizerKind::Hopcroft => "hopcroft",
    };
    format!("{}|{mode}|{det}|{min}|{pattern}", env!("CARGO_PKG_VERSION"))
}

/// Storage interface for minimized DFAs.
pub trait DfaCache: Send + Sync {
    /// Fetch a previously minimized DFA.
    fn load(&self, key: &str) -> Option<Dfa>;
    /// Store a minimized DFA; best effort.
    fn write(&self, key: &str, dfa: &Dfa);
    /// Drop everything.
    fn clear(&self);
}

/// A cache that never hits.
#[derive(Debug, Default)]
pub struct NoCache;

impl DfaCache for NoCache {
    fn load(&self, _key: &str) -> Option<Dfa> {
        None
    }
    fn write(&self, _key: &str, _dfa: &Dfa) {}
    fn clear(&self) {}
}

/// Bounded in-memory cache with FIFO eviction.
pub struct InMemoryDfaCache {
    inner: Mutex<CacheInner>,
}

struct CacheInner {
    entries: FxHashMap<String, Dfa>,
    order: VecDeque<String>,
    max_entries: usize,
}

impl InMemoryDfaCache {
    /// Cache holding up to `max_entries` DFAs.
    pub fn new(max_entries: usize) -> Self {
        InMemoryDfaCache {
            inner: Mutex::new(CacheInner {
                entries: FxHashMap::default(),
                order: VecDeque::new(),
                max_entries: max_entries.max(1),
            }),
        }
    }
}

impl Default for InMemoryDfaCache {
    fn default() -> Self {
        InMemoryDfaCache::new(128)
    }
}

impl DfaCache for InMemoryDfaCache {
    fn load(&self, key: &str) -> Option<Dfa> {
        self.inner.lock().entries.get(key).cloned()
    }

    fn write(&self, key: &str, dfa: &Dfa) {
        let mut inner = self.inner.lock();
        if inner.entries.contains_key(key) {
            return;
        }
        if inner.order.len() >= inner.max_entries {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
        inner.order.push_back(key.to_string());
        inner.entries.insert(key.to_string(), dfa.clone());
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::DfaState;

    fn dummy(accepting: bool) -> Dfa {
        Dfa {
            states: vec![DfaState { transitions: Vec::new(), accepting }],
            start: 0,
            max_code_point: 0xFF,
        }
    }

    #[test]
    fn key_covers_all_options() {
        let base = cache_key("/a/", MatchMode::Full, Determinizer::Subset, MinimizerKind::Moore);
        let other_mode =
            cache_key("/a/", MatchMode::Unanchored, Determinizer::Subset, MinimizerKind::Moore);
        let other_det =
            cache_key("/a/", MatchMode::Full, Determinizer::SubsetIndexed, MinimizerKind::Moore);
        let other_min =
            cache_key("/a/", MatchMode::Full, Determinizer::Subset, MinimizerKind::Hopcroft);
        assert_ne!(base, other_mode);
        assert_ne!(base, other_det);
        assert_ne!(base, other_min);
    }

    #[test]
    fn memory_cache_round_trips_and_evicts() {
        let cache = InMemoryDfaCache::new(1);
        cache.write("a", &dummy(true));
        assert!(cache.load("a").is_some());
        cache.write("b", &dummy(false));
        assert!(cache.load("a").is_none(), "fifo eviction expected");
        assert!(cache.load("b").is_some());
        cache.clear();
        assert!(cache.load("b").is_none());
    }

    #[test]
    fn no_cache_never_hits() {
        let cache = NoCache;
        cache.write("a", &dummy(true));
        assert!(cache.load("a").is_none());
    }
}
