use criterion::{Criterion, criterion_group, criterion_main};
use ragcmp::chunker::chunk_text;
use std::hint::black_box;

pub fn criterion_benchmark(c: &mut Criterion) {
    let text: String = "The quick brown fox jumps over the lazy dog. "
        .repeat(2000);
    c.bench_function("chunk_text", |b| {
        b.iter(|| chunk_text(black_box(&text), black_box(1200), black_box(200)))
    });

    let multibyte: String = "héllo wörld, größe Bücher überall. ".repeat(2000);
    c.bench_function("chunk_text_multibyte", |b| {
        b.iter(|| chunk_text(black_box(&multibyte), black_box(1200), black_box(200)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
