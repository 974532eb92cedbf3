//! The `Regex` facade.
//!
//! One entry point wiring the pipeline together: length guard → lexer →
//! parser → AST cache → analysis visitors or the automata solver. Nothing
//! downstream of the parser sees tokens; everything consumes the tree.
//!
//! ```
//! use pcre_engine::Regex;
//!
//! let engine = Regex::new();
//! let report = engine.validate("/(a|b)+c/");
//! assert!(report.validity.is_valid());
//!
//! let optimized = engine.optimize("/[0-9]+/").unwrap();
//! assert_eq!(optimized.pattern, r"/\d+/");
//! ```

mod snippet;

pub use snippet::caret_snippet;

use std::sync::Arc;

use pcre_analysis::{
    complexity, literals, metrics, Compiler, ComplexityScore, Dumper, Explainer, Highlighter,
    Literals, MermaidRenderer, Metrics, OptimizeResult, Optimizer, OptimizerOptions,
    SampleGenerator, ValidationIssue, Validator,
};
use pcre_ast::Node;
use pcre_automata::{
    ComplexityError, DfaCache, EquivalenceResult, IntersectionResult, Solver, SolverOptions,
    SubsetResult,
};
use pcre_cache::{AstCache, CacheError};
use pcre_lint::{LintIssue, LintSeverity, Linter};
use pcre_parser::{ParseError, Parser, ParserOptions};
use pcre_redos::{RedosAnalyzer, RedosOptions, RedosReport};
use pcre_transpile::{transpile, Target, TranspileError, TranspileResult};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Facade-level errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The pattern was rejected before lexing.
    #[error("Pattern length {length} exceeds the maximum of {limit}")]
    PatternTooLong {
        /// Actual length in bytes
        length: usize,
        /// Configured maximum
        limit: usize,
    },

    /// Lexer or parser failure.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Target cannot express the pattern.
    #[error(transparent)]
    Transpile(#[from] TranspileError),

    /// Solver rejected the pattern or ran out of budget.
    #[error(transparent)]
    Complexity(#[from] ComplexityError),

    /// Cache backend failure.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Three-way outcome for hosts mapping to exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Validity {
    /// Parses cleanly, no findings
    Valid,
    /// Parses, but findings of error severity exist
    ValidWithFindings,
    /// Does not parse
    Invalid,
}

impl Validity {
    /// Whether the pattern at least parses.
    pub fn is_valid(&self) -> bool {
        !matches!(self, Validity::Invalid)
    }

    /// Conventional process exit code: 0 clean, 1 findings, 2 invalid.
    pub fn exit_code(&self) -> i32 {
        match self {
            Validity::Valid => 0,
            Validity::ValidWithFindings => 1,
            Validity::Invalid => 2,
        }
    }
}

/// Outcome of [`Regex::validate`].
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// Overall classification
    pub validity: Validity,
    /// Parse error text for invalid patterns
    pub error: Option<String>,
    /// Caret snippet locating the parse error
    pub snippet: Option<String>,
    /// Structural findings for parsed patterns
    pub issues: Vec<ValidationIssue>,
}

/// Facade configuration.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Patterns longer than this are rejected before lexing
    pub max_pattern_length: usize,
    /// Parser limits
    pub parser: ParserOptions,
    /// Solver configuration
    pub solver: SolverOptions,
    /// Optimizer configuration
    pub optimizer: OptimizerOptions,
    /// ReDoS thresholds
    pub redos: RedosOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            max_pattern_length: 10_000,
            parser: ParserOptions::default(),
            solver: SolverOptions::default(),
            optimizer: OptimizerOptions::default(),
            redos: RedosOptions::default(),
        }
    }
}

/// The analysis facade.
///
/// One instance is cheap and reusable; the validator memo cache and any
/// attached AST/DFA caches are the only state.
pub struct Regex {
    options: EngineOptions,
    parser: Parser,
    validator: Validator,
    ast_cache: Option<Arc<dyn AstCache>>,
    dfa_cache: Option<Arc<dyn DfaCache>>,
}

impl Default for Regex {
    fn default() -> Self {
        Regex::with_options(EngineOptions::default())
    }
}

impl Regex {
    /// Facade with default options and no caches.
    pub fn new() -> Self {
        Regex::default()
    }

    /// Facade with explicit options.
    pub fn with_options(options: EngineOptions) -> Self {
        Regex {
            options,
            parser: Parser::with_options(options.parser),
            validator: Validator::new(),
            ast_cache: None,
            dfa_cache: None,
        }
    }

    /// Attach an AST cache backend.
    pub fn with_ast_cache(mut self, cache: Arc<dyn AstCache>) -> Self {
        self.ast_cache = Some(cache);
        self
    }

    /// Attach a DFA cache backend for the solver.
    pub fn with_dfa_cache(mut self, cache: Arc<dyn DfaCache>) -> Self {
        self.dfa_cache = Some(cache);
        self
    }

    /// Drop the validator memo cache (for long-running hosts).
    pub fn clear_caches(&self) -> Result<(), EngineError> {
        self.validator.clear();
        if let Some(cache) = &self.ast_cache {
            cache.clear()?;
        }
        if let Some(cache) = &self.dfa_cache {
            cache.clear();
        }
        Ok(())
    }

    /// Parse a pattern, consulting the AST cache.
    pub fn parse(&self, source: &str) -> Result<Node, EngineError> {
        if source.len() > self.options.max_pattern_length {
            return Err(EngineError::PatternTooLong {
                length: source.len(),
                limit: self.options.max_pattern_length,
            });
        }
        if let Some(cache) = &self.ast_cache {
            let key = cache.generate_key(source);
            if let Some(hit) = cache.load(&key) {
                trace!(%key, "ast cache hit");
                return Ok(hit);
            }
            let ast = self.parser.parse(source)?;
            if let Err(error) = cache.write(&key, &ast) {
                // best-effort: a failed write must not fail the parse
                warn!(%error, "ast cache write failed");
            }
            return Ok(ast);
        }
        debug!(len = source.len(), "parsing pattern");
        Ok(self.parser.parse(source)?)
    }

    /// Parse and validate; never fails.
    pub fn validate(&self, source: &str) -> ValidationReport {
        let ast = match self.parse(source) {
            Ok(ast) => ast,
            Err(error) => {
                let snippet = match &error {
                    EngineError::Parse(parse) => {
                        parse.offset().map(|at| caret_snippet(source, at))
                    }
                    _ => None,
                };
                return ValidationReport {
                    validity: Validity::Invalid,
                    error: Some(error.to_string()),
                    snippet,
                    issues: Vec::new(),
                };
            }
        };
        let issues = self.validator.validate(source, &ast);
        let validity = if issues.is_empty() {
            Validity::Valid
        } else {
            Validity::ValidWithFindings
        };
        ValidationReport { validity, error: None, snippet: None, issues }
    }

    /// Recompile a pattern from its tree.
    pub fn recompile(&self, source: &str) -> Result<String, EngineError> {
        let ast = self.parse(source)?;
        Ok(Compiler::new().compile(&ast))
    }

    /// Run the optimizer.
    pub fn optimize(&self, source: &str) -> Result<OptimizeResult, EngineError> {
        let ast = self.parse(source)?;
        Ok(Optimizer::with_options(self.options.optimizer).optimize(&ast))
    }

    /// Plain-language explanation.
    pub fn explain(&self, source: &str) -> Result<String, EngineError> {
        let ast = self.parse(source)?;
        Ok(Explainer::new().explain(&ast))
    }

    /// ANSI-highlighted pattern.
    pub fn highlight(&self, source: &str) -> Result<String, EngineError> {
        let ast = self.parse(source)?;
        Ok(Highlighter::new().highlight(&ast))
    }

    /// Diffable tree dump.
    pub fn dump(&self, source: &str) -> Result<String, EngineError> {
        let ast = self.parse(source)?;
        Ok(Dumper::new().dump(&ast))
    }

    /// Mermaid graph of the tree.
    pub fn mermaid(&self, source: &str) -> Result<String, EngineError> {
        let ast = self.parse(source)?;
        Ok(MermaidRenderer::new().render(&ast))
    }

    /// Lint findings, with the pattern text attached to each issue.
    pub fn lint(&self, source: &str) -> Result<Vec<LintIssue>, EngineError> {
        let ast = self.parse(source)?;
        let mut issues = Linter::new().lint(&ast);
        for issue in &mut issues {
            issue.pattern = Some(source.to_string());
        }
        Ok(issues)
    }

    /// Overall classification of a lint run, for exit-code mapping.
    pub fn lint_validity(&self, source: &str) -> Validity {
        match self.lint(source) {
            Err(_) => Validity::Invalid,
            Ok(issues) => {
                if issues.iter().any(|i| i.severity == LintSeverity::Error) {
                    Validity::ValidWithFindings
                } else {
                    Validity::Valid
                }
            }
        }
    }

    /// ReDoS analysis.
    pub fn redos(&self, source: &str) -> Result<RedosReport, EngineError> {
        let ast = self.parse(source)?;
        Ok(RedosAnalyzer::with_options(self.options.redos).analyze(&ast))
    }

    /// Convert for another dialect.
    pub fn transpile(&self, source: &str, target: Target) -> Result<TranspileResult, EngineError> {
        let ast = self.parse(source)?;
        Ok(transpile(&ast, target)?)
    }

    /// One string the pattern matches.
    pub fn generate(&self, source: &str) -> Result<String, EngineError> {
        let ast = self.parse(source)?;
        Ok(SampleGenerator::new().generate(&ast))
    }

    /// Required literal prefixes and substrings.
    pub fn literals(&self, source: &str) -> Result<Literals, EngineError> {
        let ast = self.parse(source)?;
        Ok(literals::extract(&ast))
    }

    /// Structural metrics.
    pub fn metrics(&self, source: &str) -> Result<Metrics, EngineError> {
        let ast = self.parse(source)?;
        Ok(metrics::measure(&ast))
    }

    /// Weighted complexity score.
    pub fn complexity(&self, source: &str) -> Result<ComplexityScore, EngineError> {
        let ast = self.parse(source)?;
        Ok(complexity::score(&ast))
    }

    fn solver(&self) -> Solver {
        let solver = Solver::with_options(self.options.solver);
        match &self.dfa_cache {
            Some(cache) => solver.with_cache(cache.clone()),
            None => solver,
        }
    }

    /// Do two patterns match any common string?
    pub fn intersection(
        &self,
        left: &str,
        right: &str,
    ) -> Result<IntersectionResult, EngineError> {
        let left_ast = self.parse(left)?;
        let right_ast = self.parse(right)?;
        Ok(self.solver().intersection(left, &left_ast, right, &right_ast)?)
    }

    /// Is every match of `left` also matched by `right`?
    pub fn subset_of(&self, left: &str, right: &str) -> Result<SubsetResult, EngineError> {
        let left_ast = self.parse(left)?;
        let right_ast = self.parse(right)?;
        Ok(self.solver().subset_of(left, &left_ast, right, &right_ast)?)
    }

    /// Do two patterns match exactly the same strings?
    pub fn equivalent(&self, left: &str, right: &str) -> Result<EquivalenceResult, EngineError> {
        let left_ast = self.parse(left)?;
        let right_ast = self.parse(right)?;
        Ok(self.solver().equivalent(left, &left_ast, right, &right_ast)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_guard_rejects_before_lexing() {
        let options = EngineOptions { max_pattern_length: 8, ..Default::default() };
        let engine = Regex::with_options(options);
        let err = engine.parse("/aaaaaaaaaa/").unwrap_err();
        assert!(matches!(err, EngineError::PatternTooLong { length: 12, limit: 8 }));
    }

    #[test]
    fn validate_distinguishes_invalid_from_findings() {
        let engine = Regex::new();
        assert_eq!(engine.validate("/a+/").validity.exit_code(), 0);
        assert_eq!(engine.validate(r"/(a)\2/").validity.exit_code(), 1);
        assert_eq!(engine.validate("/a{3,1}/").validity.exit_code(), 2);
    }

    #[test]
    fn invalid_patterns_get_a_caret_snippet() {
        let engine = Regex::new();
        let report = engine.validate("/a{3,1}/");
        assert_eq!(report.validity, Validity::Invalid);
        let snippet = report.snippet.unwrap();
        assert!(snippet.contains("/a{3,1}/"));
        assert!(snippet.contains('^'));
    }

    #[test]
    fn ast_cache_is_consulted() {
        let cache = Arc::new(pcre_cache::InMemoryAstCache::new(8));
        let engine = Regex::new().with_ast_cache(cache.clone());
        let first = engine.parse("/abc/").unwrap();
        let key = cache.generate_key("/abc/");
        assert!(cache.load(&key).is_some());
        let second = engine.parse("/abc/").unwrap();
        assert_eq!(first, second);
    }
}
