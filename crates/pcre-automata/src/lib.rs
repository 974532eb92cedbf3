//! Finite-automata solver for PCRE patterns.
//!
//! Decides language-theoretic relations between two patterns: intersection
//! non-emptiness, subset, and equivalence, each with witness strings. The
//! pipeline is
//!
//! 1. AST → Thompson NFA with [`pcre_charset::CharSet`] edge labels
//! 2. alphabet partitioning into the coarsest ranges no edge set splits
//! 3. subset construction ([`Determinizer::Subset`] or
//!    [`Determinizer::SubsetIndexed`])
//! 4. minimization ([`MinimizerKind::Moore`] or [`MinimizerKind::Hopcroft`])
//!    with canonical renumbering
//! 5. product/complement operations with BFS witness extraction (shortest,
//!    then lexicographic)
//!
//! Constructs outside the regular languages (backreferences, lookarounds,
//! subroutines, possessive/atomic control) are rejected with
//! [`ComplexityError::UnsupportedConstruct`]; runaway state growth is cut
//! off by a per-phase work budget.
//!
//! ```
//! use pcre_automata::Solver;
//! use pcre_parser::Parser;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let parser = Parser::new();
//! let left = parser.parse("/(a|b)c/")?;
//! let right = parser.parse("/ac|bc/")?;
//! let result = Solver::new().equivalent("/(a|b)c/", &left, "/ac|bc/", &right)?;
//! assert!(result.is_equivalent);
//! # Ok(())
//! # }
//! ```

pub mod alphabet;
pub mod cache;
pub mod dfa;
pub mod error;
pub mod minimize;
pub mod nfa;
pub mod ops;
pub mod solver;

pub use alphabet::Alphabet;
pub use cache::{cache_key, DfaCache, InMemoryDfaCache, NoCache};
pub use dfa::{determinize, determinize_nfa, Determinizer, Dfa, DfaState};
pub use error::{ComplexityError, Phase, WorkBudget};
pub use minimize::{minimize, MinimizerKind};
pub use nfa::{translate, MatchMode, Nfa, NfaState, TranslateOptions};
pub use ops::{complement, intersect, shortest_example};
pub use solver::{
    EquivalenceResult, IntersectionResult, Solver, SolverOptions, SubsetResult,
};
