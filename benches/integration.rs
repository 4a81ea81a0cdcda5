use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use decay_chain::prelude::*;

/// Every adaptive method on the 27-species reference problem.
fn bench_reference_problem(c: &mut Criterion) {
    let mut group = c.benchmark_group("reference_problem");
    for method in [0, 1, 2, 3, 4, 5] {
        let config = IntegrationConfig::builder().method(method).build();
        let name = Method::try_from(method).unwrap().to_string();
        group.bench_with_input(BenchmarkId::from_parameter(name), &config, |b, config| {
            b.iter(|| run::<f64>(black_box(config)).unwrap())
        });
    }
    group.finish();
}

/// Constant step of 1e-3 over the unit interval.
fn bench_fixed_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("fixed_step");
    for method in [6, 7, 8] {
        let config = IntegrationConfig::builder()
            .log10_dx0(-3)
            .method(method)
            .build();
        group.bench_with_input(BenchmarkId::from_parameter(method), &config, |b, config| {
            b.iter(|| run::<f64>(black_box(config)).unwrap())
        });
    }
    group.finish();
}

fn bench_single_precision(c: &mut Criterion) {
    let config = IntegrationConfig::builder()
        .log10_atol(-6)
        .log10_rtol(-6)
        .method(4)
        .build();
    c.bench_function("dopri5_f32", |b| {
        b.iter(|| run::<f32>(black_box(&config)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_reference_problem,
    bench_fixed_step,
    bench_single_precision
);
criterion_main!(benches);
