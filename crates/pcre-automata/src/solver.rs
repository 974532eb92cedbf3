//! The solver facade: language relations between two patterns.

use std::sync::Arc;

use pcre_ast::Node;
use serde::Serialize;

use crate::cache::{cache_key, DfaCache, NoCache};
use crate::dfa::{determinize_nfa, Determinizer, Dfa};
use crate::error::{ComplexityError, Phase, WorkBudget};
use crate::minimize::{minimize, MinimizerKind};
use crate::nfa::{translate, MatchMode, TranslateOptions};
use crate::ops::{complement, intersect, shortest_example};

/// Solver configuration.
#[derive(Debug, Clone, Copy)]
pub struct SolverOptions {
    /// Work budget per phase (determinize, minimize)
    pub max_transitions_processed: usize,
    /// Whole-string or substring comparison
    pub match_mode: MatchMode,
    /// Subset-construction variant
    pub determinizer: Determinizer,
    /// Minimization algorithm
    pub minimizer: MinimizerKind,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            max_transitions_processed: 50_000,
            match_mode: MatchMode::Full,
            determinizer: Determinizer::Subset,
            minimizer: MinimizerKind::Moore,
        }
    }
}

/// Result of an intersection query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntersectionResult {
    /// Whether no string is matched by both patterns
    pub is_empty: bool,
    /// A shortest common string when non-empty
    pub example: Option<String>,
}

/// Result of a subset query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsetResult {
    /// Whether every string of the left language is in the right
    pub is_subset: bool,
    /// A string in `L \ R` when not a subset
    pub counter_example: Option<String>,
}

/// Result of an equivalence query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquivalenceResult {
    /// Whether both patterns match exactly the same strings
    pub is_equivalent: bool,
    /// A string only the left pattern matches
    pub left_only_example: Option<String>,
    /// A string only the right pattern matches
    pub right_only_example: Option<String>,
}

/// Finite-automata solver over parsed patterns.
pub struct Solver {
    options: SolverOptions,
    cache: Arc<dyn DfaCache>,
}

impl Default for Solver {
    fn default() -> Self {
        Solver { options: SolverOptions::default(), cache: Arc::new(NoCache) }
    }
}

impl Solver {
    /// Solver with default options and no cache.
    pub fn new() -> Self {
        Solver::default()
    }

    /// Solver with explicit options.
    pub fn with_options(options: SolverOptions) -> Self {
        Solver { options, cache: Arc::new(NoCache) }
    }

    /// Attach a DFA cache.
    pub fn with_cache(mut self, cache: Arc<dyn DfaCache>) -> Self {
        self.cache = cache;
        self
    }

    /// The minimal DFA for one pattern, cached when a cache is attached.
    pub fn minimal_dfa(&self, source: &str, ast: &Node) -> Result<Dfa, ComplexityError> {
        let key = cache_key(
            source,
            self.options.match_mode,
            self.options.determinizer,
            self.options.minimizer,
        );
        if let Some(hit) = self.cache.load(&key) {
            return Ok(hit);
        }
        let nfa = translate(ast, &TranslateOptions::for_mode(self.options.match_mode))?;
        let mut det_budget =
            WorkBudget::new(Phase::Determinize, self.options.max_transitions_processed);
        let raw = determinize_nfa(&nfa, self.options.determinizer, &mut det_budget)?;
        let mut min_budget =
            WorkBudget::new(Phase::Minimize, self.options.max_transitions_processed);
        let minimal = minimize(&raw, self.options.minimizer, &mut min_budget)?;
        self.cache.write(&key, &minimal);
        Ok(minimal)
    }

    /// Do the two languages share any string?
    pub fn intersection(
        &self,
        left_source: &str,
        left: &Node,
        right_source: &str,
        right: &Node,
    ) -> Result<IntersectionResult, ComplexityError> {
        let l = self.minimal_dfa(left_source, left)?;
        let r = self.minimal_dfa(right_source, right)?;
        let product = intersect(&l, &r);
        let example = shortest_example(&product);
        Ok(IntersectionResult { is_empty: example.is_none(), example })
    }

    /// Is the left language contained in the right?
    pub fn subset_of(
        &self,
        left_source: &str,
        left: &Node,
        right_source: &str,
        right: &Node,
    ) -> Result<SubsetResult, ComplexityError> {
        let l = self.minimal_dfa(left_source, left)?;
        let r = self.minimal_dfa(right_source, right)?;
        let difference = intersect(&l, &complement(&r));
        let counter_example = shortest_example(&difference);
        Ok(SubsetResult { is_subset: counter_example.is_none(), counter_example })
    }

    /// Do both patterns match exactly the same strings?
    pub fn equivalent(
        &self,
        left_source: &str,
        left: &Node,
        right_source: &str,
        right: &Node,
    ) -> Result<EquivalenceResult, ComplexityError> {
        let l = self.minimal_dfa(left_source, left)?;
        let r = self.minimal_dfa(right_source, right)?;
        let left_only = shortest_example(&intersect(&l, &complement(&r)));
        let right_only = shortest_example(&intersect(&r, &complement(&l)));
        Ok(EquivalenceResult {
            is_equivalent: left_only.is_none() && right_only.is_none(),
            left_only_example: left_only,
            right_only_example: right_only,
        })
    }
}
