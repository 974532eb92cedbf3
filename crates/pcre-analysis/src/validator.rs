//! Structural validator.
//!
//! Enforces the tree invariants the parser does not: span sanity, reference
//! resolution, quantifiability, duplicate names. Issues carry stable dotted
//! codes so hosts can suppress or map them.

use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

use parking_lot::Mutex;
use pcre_ast::{GroupKind, Node, NodeKind, RefTarget};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Stable dotted identifier, e.g. `regex.ref.undefined`
    pub code: String,
    /// Human-readable description
    pub message: String,
    /// Byte offset of the offending construct
    pub offset: usize,
}

impl ValidationIssue {
    fn new(code: &str, message: impl Into<String>, offset: usize) -> Self {
        ValidationIssue { code: code.to_string(), message: message.into(), offset }
    }
}

/// Validator with a bounded memoization cache.
///
/// Validation is pure over the tree, so results are memoized by pattern
/// hash. The cache is instance-scoped and FIFO-bounded; long-running hosts
/// can drop it wholesale with [`Validator::clear`].
pub struct Validator {
    cache: Mutex<MemoCache>,
}

struct MemoCache {
    entries: FxHashMap<u64, Vec<ValidationIssue>>,
    order: VecDeque<u64>,
    max_entries: usize,
}

impl Default for Validator {
    fn default() -> Self {
        Validator::with_capacity(256)
    }
}

impl Validator {
    /// Create a validator with the default cache size.
    pub fn new() -> Self {
        Validator::default()
    }

    /// Create a validator with an explicit memo capacity.
    pub fn with_capacity(max_entries: usize) -> Self {
        Validator {
            cache: Mutex::new(MemoCache {
                entries: FxHashMap::default(),
                order: VecDeque::new(),
                max_entries: max_entries.max(1),
            }),
        }
    }

    /// Drop all memoized results.
    pub fn clear(&self) {
        let mut cache = self.cache.lock();
        cache.entries.clear();
        cache.order.clear();
    }

    /// Validate a parsed tree. `source` is the original pattern text used
    /// as the memo key.
    pub fn validate(&self, source: &str, ast: &Node) -> Vec<ValidationIssue> {
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        let key = hasher.finish();
        if let Some(found) = self.cache.lock().entries.get(&key) {
            return found.clone();
        }
        let issues = validate_tree(ast);
        let mut cache = self.cache.lock();
        if !cache.entries.contains_key(&key) {
            if cache.order.len() >= cache.max_entries {
                if let Some(oldest) = cache.order.pop_front() {
                    cache.entries.remove(&oldest);
                }
            }
            cache.order.push_back(key);
            cache.entries.insert(key, issues.clone());
        }
        issues
    }
}

/// Validate without memoization.
pub fn validate_tree(ast: &Node) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let dup_names_allowed = match &ast.kind {
        NodeKind::Regex { flags, .. } => flags.dup_names,
        _ => false,
    };

    let mut captures = CaptureTable::default();
    collect_captures(ast, &mut captures);
    for (name, count) in &captures.name_counts {
        if *count > 1 && !dup_names_allowed {
            issues.push(ValidationIssue::new(
                "regex.group.duplicate-name",
                format!("Duplicate group name \"{name}\" requires the J flag"),
                0,
            ));
        }
    }

    check_node(ast, ast.span.end, &captures, &mut issues);
    issues.sort_by_key(|i| i.offset);
    issues
}

#[derive(Default)]
struct CaptureTable {
    max_index: u32,
    names: FxHashSet<String>,
    name_counts: FxHashMap<String, u32>,
}

fn collect_captures(node: &Node, table: &mut CaptureTable) {
    if let NodeKind::Group { kind, .. } = &node.kind {
        match kind {
            GroupKind::Capturing { index } => table.max_index = table.max_index.max(*index),
            GroupKind::Named { name, index, .. } => {
                table.max_index = table.max_index.max(*index);
                table.names.insert(name.clone());
                *table.name_counts.entry(name.clone()).or_insert(0) += 1;
            }
            _ => {}
        }
    }
    for child in node.children() {
        collect_captures(child, table);
    }
}

fn check_node(
    node: &Node,
    source_len: usize,
    captures: &CaptureTable,
    issues: &mut Vec<ValidationIssue>,
) {
    if node.span.start > node.span.end || node.span.end > source_len {
        issues.push(ValidationIssue::new(
            "regex.parse.position",
            format!("Node span {:?} escapes the source", node.span),
            node.span.start,
        ));
    }

    match &node.kind {
        NodeKind::Sequence { children } => {
            let mut last_start = 0;
            for child in children {
                if child.span.start < last_start {
                    issues.push(ValidationIssue::new(
                        "regex.parse.position",
                        "Sequence children are not in source order",
                        child.span.start,
                    ));
                }
                last_start = child.span.start;
            }
        }
        NodeKind::Alternation { alternatives } => {
            if alternatives.len() < 2 {
                issues.push(ValidationIssue::new(
                    "regex.parse.alternation",
                    "Alternation with fewer than two branches",
                    node.span.start,
                ));
            }
        }
        NodeKind::Quantifier { node: inner, .. } => match &inner.kind {
            NodeKind::Quantifier { .. } => issues.push(ValidationIssue::new(
                "regex.lint.quantifier.nested",
                "Quantifier applied to another quantifier",
                node.span.start,
            )),
            NodeKind::Anchor { .. } | NodeKind::Keep | NodeKind::PcreVerb { .. } => {
                issues.push(ValidationIssue::new(
                    "regex.quantifier.unquantifiable",
                    "Quantifier applied to a non-quantifiable construct",
                    node.span.start,
                ))
            }
            _ => {}
        },
        NodeKind::Backref { target } => {
            check_reference(target, false, node, captures, issues);
        }
        NodeKind::Subroutine { target } => {
            check_reference(target, true, node, captures, issues);
        }
        _ => {}
    }

    for child in node.children() {
        check_node(child, source_len, captures, issues);
    }
}

fn check_reference(
    target: &RefTarget,
    is_subroutine: bool,
    node: &Node,
    captures: &CaptureTable,
    issues: &mut Vec<ValidationIssue>,
) {
    let defined = match target {
        RefTarget::Index(0) => is_subroutine,
        RefTarget::Index(n) => *n <= captures.max_index,
        RefTarget::Relative(n) => n.unsigned_abs() <= captures.max_index && *n != 0,
        RefTarget::Name(name) => captures.names.contains(name),
    };
    if !defined {
        let what = if is_subroutine { "subroutine" } else { "backreference" };
        issues.push(ValidationIssue::new(
            "regex.ref.undefined",
            format!("{what} to non-existent subpattern \"{target}\""),
            node.span.start,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcre_parser::Parser;

    fn validate(source: &str) -> Vec<ValidationIssue> {
        let ast = Parser::new().parse(source).unwrap();
        validate_tree(&ast)
    }

    #[test]
    fn clean_pattern_has_no_issues() {
        assert!(validate("/(a|b)c+[d-f]/").is_empty());
    }

    #[test]
    fn undefined_backref_is_flagged() {
        let issues = validate(r"/(a)\2/");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "regex.ref.undefined");
    }

    #[test]
    fn undefined_named_subroutine_is_flagged() {
        let issues = validate("/(?<x>a)(?&y)/");
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("subroutine"));
    }

    #[test]
    fn whole_pattern_recursion_is_defined() {
        assert!(validate("/a(?R)?/").is_empty());
    }

    #[test]
    fn forward_reference_into_define_is_accepted() {
        assert!(validate("/(?(DEFINE)(?<d>\\d))(?&d)/").is_empty());
    }

    #[test]
    fn branch_reset_backref_is_accepted() {
        assert!(validate(r"/(?|(a)|(b))\1/").is_empty());
    }

    #[test]
    fn nested_quantifier_is_flagged() {
        let issues = validate("/a**/");
        assert_eq!(issues[0].code, "regex.lint.quantifier.nested");
    }

    #[test]
    fn duplicate_names_need_j_flag() {
        let issues = validate("/(?<x>a)(?<x>b)/");
        assert_eq!(issues[0].code, "regex.group.duplicate-name");
        assert!(validate("/(?<x>a)(?<x>b)/J").is_empty());
    }

    #[test]
    fn memo_cache_round_trips_and_clears() {
        let validator = Validator::with_capacity(2);
        let ast = Parser::new().parse(r"/(a)\2/").unwrap();
        let first = validator.validate(r"/(a)\2/", &ast);
        let second = validator.validate(r"/(a)\2/", &ast);
        assert_eq!(first, second);
        validator.clear();
        let third = validator.validate(r"/(a)\2/", &ast);
        assert_eq!(first, third);
    }

    #[test]
    fn memo_cache_evicts_fifo() {
        let validator = Validator::with_capacity(1);
        let a = Parser::new().parse("/a/").unwrap();
        let b = Parser::new().parse("/b/").unwrap();
        validator.validate("/a/", &a);
        validator.validate("/b/", &b); // evicts /a/
        assert!(validator.validate("/a/", &a).is_empty());
    }
}
