//! Sandbox evaluation benchmarks.

use criterion::{criterion_group, criterion_main, Criterion};

use devbot::sandbox::Sandbox;

fn bench_evaluate(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let sandbox = Sandbox::default();

    c.bench_function("eval_arithmetic", |b| {
        b.to_async(&rt)
            .iter(|| async { sandbox.evaluate("1 + 2 * 3 - 4 / 2").await })
    });

    c.bench_function("eval_loop_100", |b| {
        b.to_async(&rt).iter(|| async {
            sandbox
                .evaluate("let total = 0; let i = 0; while (i < 100) { total = total + i; i = i + 1 } total")
                .await
        })
    });

    c.bench_function("eval_syntax_error", |b| {
        b.to_async(&rt).iter(|| async { sandbox.evaluate("{").await })
    });
}

criterion_group!(benches, bench_evaluate);
criterion_main!(benches);
