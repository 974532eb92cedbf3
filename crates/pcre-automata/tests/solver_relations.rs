//! End-to-end language-relation scenarios.

use std::sync::Arc;

use pcre_automata::{
    Determinizer, InMemoryDfaCache, MatchMode, MinimizerKind, Solver, SolverOptions,
};
use pcre_ast::Node;
use pcre_parser::Parser;

fn parse(source: &str) -> Node {
    Parser::new().parse(source).unwrap()
}

fn solver() -> Solver {
    Solver::new()
}

#[test]
fn word_is_subset_of_lowercase_run() {
    let left = parse("/edit/");
    let right = parse("/[a-z]+/");
    let result = solver().subset_of("/edit/", &left, "/[a-z]+/", &right).unwrap();
    assert!(result.is_subset);
    assert_eq!(result.counter_example, None);
}

#[test]
fn anything_is_not_subset_of_one_word() {
    let left = parse("/.*/");
    let right = parse("/abc/");
    let result = solver().subset_of("/.*/", &left, "/abc/", &right).unwrap();
    assert!(!result.is_subset);
    let witness = result.counter_example.unwrap();
    assert_ne!(witness, "abc");
}

#[test]
fn distributed_alternation_is_equivalent() {
    let left = parse("/(a|b)c/");
    let right = parse("/ac|bc/");
    let result = solver().equivalent("/(a|b)c/", &left, "/ac|bc/", &right).unwrap();
    assert!(result.is_equivalent);
    assert_eq!(result.left_only_example, None);
    assert_eq!(result.right_only_example, None);
}

#[test]
fn star_differs_from_plus_by_the_empty_string() {
    let left = parse("/a*/");
    let right = parse("/a+/");
    let result = solver().equivalent("/a*/", &left, "/a+/", &right).unwrap();
    assert!(!result.is_equivalent);
    assert_eq!(result.left_only_example, Some(String::new()));
    assert_eq!(result.right_only_example, None);
}

#[test]
fn self_intersection_of_nonempty_language_is_nonempty() {
    let left = parse("/ab?c/");
    let result = solver().intersection("/ab?c/", &left, "/ab?c/", &left).unwrap();
    assert!(!result.is_empty);
    assert_eq!(result.example, Some("ac".to_string()));
}

#[test]
fn disjoint_literals_have_empty_intersection() {
    let left = parse("/cat/");
    let right = parse("/dog/");
    let result = solver().intersection("/cat/", &left, "/dog/", &right).unwrap();
    assert!(result.is_empty);
    assert_eq!(result.example, None);
}

#[test]
fn unanchored_mode_compares_substring_languages() {
    let options = SolverOptions { match_mode: MatchMode::Unanchored, ..Default::default() };
    let solver = Solver::with_options(options);
    let left = parse("/bc/");
    let right = parse("/b/");
    // every string containing "bc" also contains "b"
    let result = solver.subset_of("/bc/", &left, "/b/", &right).unwrap();
    assert!(result.is_subset);
    // the reverse does not hold
    let result = solver.subset_of("/b/", &right, "/bc/", &left).unwrap();
    assert!(!result.is_subset);
}

#[test]
fn anchors_are_ignored_in_full_mode() {
    let left = parse("/^abc$/");
    let right = parse("/abc/");
    let result = solver().equivalent("/^abc$/", &left, "/abc/", &right).unwrap();
    assert!(result.is_equivalent);
}

/// Bounded-alphabet fuzz oracle: DFA acceptance must agree with brute-force
/// enumeration over `{a,b}` strings up to length 4.
#[test]
fn bounded_repeat_agrees_with_brute_force() {
    let source = "/[ab]{0,4}/";
    let ast = parse(source);
    let dfa = solver().minimal_dfa(source, &ast).unwrap();

    let mut all: Vec<String> = vec![String::new()];
    let mut frontier = vec![String::new()];
    for _ in 0..5 {
        let mut next = Vec::new();
        for prefix in &frontier {
            for ch in ['a', 'b'] {
                let mut s = prefix.clone();
                s.push(ch);
                next.push(s.clone());
                all.push(s);
            }
        }
        frontier = next;
    }

    for s in &all {
        let expected = s.len() <= 4;
        assert_eq!(dfa.accepts_str(s), expected, "disagreement on {s:?}");
    }
}

#[test]
fn intersection_of_identical_bounded_languages_matches_oracle() {
    let source = "/[ab]{0,4}/";
    let ast = parse(source);
    let result = solver().intersection(source, &ast, source, &ast).unwrap();
    assert!(!result.is_empty);
    assert_eq!(result.example, Some(String::new()));
}

#[test]
fn algorithm_choices_agree_on_relations() {
    let combos = [
        (Determinizer::Subset, MinimizerKind::Moore),
        (Determinizer::Subset, MinimizerKind::Hopcroft),
        (Determinizer::SubsetIndexed, MinimizerKind::Moore),
        (Determinizer::SubsetIndexed, MinimizerKind::Hopcroft),
    ];
    let left = parse("/(ab)*a?/");
    let right = parse("/a(ba)*b?|/");
    for (determinizer, minimizer) in combos {
        let options = SolverOptions { determinizer, minimizer, ..Default::default() };
        let result = Solver::with_options(options)
            .equivalent("/(ab)*a?/", &left, "/a(ba)*b?|/", &right)
            .unwrap();
        assert!(result.is_equivalent, "disagreement for {determinizer:?}/{minimizer:?}");
    }
}

#[test]
fn cache_hits_return_the_same_dfa() {
    let cache = Arc::new(InMemoryDfaCache::new(16));
    let solver = Solver::new().with_cache(cache.clone());
    let ast = parse("/[a-c]+/");
    let first = solver.minimal_dfa("/[a-c]+/", &ast).unwrap();
    let second = solver.minimal_dfa("/[a-c]+/", &ast).unwrap();
    assert_eq!(first, second);
}

#[test]
fn budget_exceeded_is_typed_not_partial() {
    let options = SolverOptions { max_transitions_processed: 4, ..Default::default() };
    let solver = Solver::with_options(options);
    let ast = parse("/[ab]{0,12}c/");
    let err = solver.minimal_dfa("/[ab]{0,12}c/", &ast).unwrap_err();
    assert!(err.to_string().contains("Work budget exceeded"));
}
