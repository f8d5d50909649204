//! Benchmarks for failure classification.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use digestflow::classify::classify;
use digestflow::errors::RemoteError;

fn classify_benchmark(c: &mut Criterion) {
    let status = RemoteError::http("Jina AI", 401, "Unauthorized");
    let text = RemoteError::new(
        "Gemini AI",
        "429 RESOURCE_EXHAUSTED: Resource has been exhausted (e.g. check quota).",
    );
    let unknown = RemoteError::new("Gemini AI", "something nobody has seen before ".repeat(20));

    c.bench_function("classify_status", |b| b.iter(|| classify(black_box(&status))));
    c.bench_function("classify_text", |b| b.iter(|| classify(black_box(&text))));
    c.bench_function("classify_unknown", |b| b.iter(|| classify(black_box(&unknown))));
}

criterion_group!(benches, classify_benchmark);
criterion_main!(benches);
