//! # Model Benchmarks
//!
//! Measures each reference base model in isolation on a scaled reading,
//! and the scaling step itself.
//!
//! Run: `cargo bench --bench model_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use enose_core::{demo, FeatureScaler};

/// Benchmark scaling one raw reading
fn bench_scaler(c: &mut Criterion) {
    let set = demo::build();
    let scaler = FeatureScaler::from_params(set.scaler).unwrap();
    let reading = demo::sample_reading(3).unwrap();

    c.bench_function("scale", |b| b.iter(|| black_box(scaler.scale(&reading).unwrap())));
}

/// Benchmark per-model score vectors
fn bench_models(c: &mut Criterion) {
    let set = demo::build();
    let scaler = FeatureScaler::from_params(set.scaler).unwrap();
    let x = scaler.scale(&demo::sample_reading(3).unwrap()).unwrap();

    let mut group = c.benchmark_group("score_vector");

    for (name, artifact) in set.base {
        let kind = artifact.kind();
        let handle = artifact.into_handle().unwrap();
        group.bench_with_input(BenchmarkId::new(name, kind), x.values(), |b, x| {
            b.iter(|| black_box(handle.score_vector(x).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_scaler, bench_models);

criterion_main!(benches);
