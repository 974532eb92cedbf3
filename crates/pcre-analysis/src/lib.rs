//! Core analysis visitors over the PCRE syntax tree.
//!
//! Every pass in this crate is an exhaustive `match` over
//! [`pcre_ast::NodeKind`] — the closed sum guarantees at compile time that
//! no construct is silently skipped. Passes are pure with respect to the
//! tree; traversal state (indent depth, color stacks, capture tables)
//! lives on the visitor instance.
//!
//! | Pass | Entry point | Output |
//! |------|-------------|--------|
//! | Recompiler | [`Compiler::compile`] | pattern source |
//! | Validator | [`Validator::validate`] | [`ValidationIssue`] list |
//! | Optimizer | [`Optimizer::optimize`] | rewritten pattern + notes |
//! | Explainer | [`Explainer::explain`] | indented outline |
//! | Highlighter | [`Highlighter::highlight`] | ANSI-styled pattern |
//! | Dumper | [`Dumper::dump`] | diffable tree text |
//! | Mermaid | [`MermaidRenderer::render`] | `graph TD` source |
//! | Samples | [`SampleGenerator::generate`] | one matching string |
//! | Complexity | [`complexity::score`] | weighted score |
//! | Literals | [`literals::extract`] | required literal runs |
//! | Metrics | [`metrics::measure`] | structural counts |

pub mod compiler;
pub mod complexity;
pub mod dump;
pub mod explain;
pub mod highlight;
pub mod literals;
pub mod metrics;
pub mod optimizer;
pub mod sample;
pub mod sets;
pub mod validator;

pub use compiler::Compiler;
pub use complexity::ComplexityScore;
pub use dump::{Dumper, MermaidRenderer};
pub use explain::Explainer;
pub use highlight::{HighlightTheme, Highlighter};
pub use literals::Literals;
pub use metrics::Metrics;
pub use optimizer::{is_optimization_safe, OptimizeResult, Optimizer, OptimizerOptions};
pub use sample::SampleGenerator;
pub use validator::{validate_tree, ValidationIssue, Validator};
