//! # Pipeline Benchmarks
//!
//! Measures end-to-end inference over the reference ensemble, sequential
//! against parallel fan-out, plus a cold artifact load.
//!
//! Run: `cargo bench --bench pipeline_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use enose_core::prelude::*;
use enose_core::demo;

fn pipeline(dir: &Path, parallel: bool) -> PredictionOrchestrator {
    let mut config = demo::write(dir).unwrap();
    config.parallel = parallel;
    ArtifactStore::new(config).load().unwrap()
}

/// Benchmark one reading through the whole pipeline
fn bench_run(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let reading = demo::sample_reading(3).unwrap();

    let mut group = c.benchmark_group("run");

    for parallel in [false, true] {
        let orch = pipeline(dir.path(), parallel);
        let label = if parallel { "parallel" } else { "sequential" };

        group.bench_with_input(BenchmarkId::new("bench_reading", label), &reading, |b, r| {
            b.iter(|| black_box(orch.run(r).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark every prototype in sequence
fn bench_batch(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let orch = pipeline(dir.path(), false);
    let readings: Vec<SensorReading> = (0..demo::LABELS.len())
        .filter_map(demo::sample_reading)
        .collect();

    c.bench_function("run_all_prototypes", |b| {
        b.iter(|| {
            for r in &readings {
                black_box(orch.run(r).unwrap());
            }
        })
    });
}

/// Benchmark loading and validating every artifact from disk
fn bench_load(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let config = demo::write(dir.path()).unwrap();

    c.bench_function("load_artifacts", |b| {
        b.iter(|| black_box(ArtifactStore::new(config.clone()).load().unwrap()))
    });
}

/// Benchmark response serialization
fn bench_serialize(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let orch = pipeline(dir.path(), false);
    let result = orch.run(&demo::sample_reading(0).unwrap()).unwrap();

    c.bench_function("serialize_result", |b| {
        b.iter(|| black_box(serde_json::to_vec(&result).unwrap()))
    });
}

criterion_group!(benches, bench_run, bench_batch, bench_load, bench_serialize);

criterion_main!(benches);
