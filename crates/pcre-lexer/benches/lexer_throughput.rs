//! Lexer throughput over representative pattern shapes.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use pcre_lexer::Lexer;

fn bench_lexer(c: &mut Criterion) {
    let patterns: Vec<(&str, String)> = vec![
        ("literal_run", "a".repeat(512)),
        ("alternation", vec!["abc"; 64].join("|")),
        (
            "classes",
            "[a-z0-9_][^\\d][[:alpha:]][\\w&&[:ascii:]]".repeat(16),
        ),
        ("groups", "(?:a(?<n>b)(?=c)){0,9}".repeat(16)),
        ("escapes", "\\x{1F600}\\p{L}\\Qlit.eral\\E\\k<n>".repeat(16)),
    ];

    let mut group = c.benchmark_group("lexer");
    for (name, pattern) in &patterns {
        group.bench_function(*name, |b| {
            b.iter(|| {
                let stream = Lexer::new(black_box(pattern)).tokenize();
                black_box(stream).ok()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_lexer);
criterion_main!(benches);
