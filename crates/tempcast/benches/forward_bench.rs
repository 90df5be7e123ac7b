//! Benchmarks for inference.
//!
//! Run with: cargo bench --bench forward_bench

use burn::prelude::*;
use burn::tensor::Distribution;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tempcast::prelude::*;

fn bench_model_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("model_forward");
    let device = Default::default();
    let model = TimeSeriesTransformerConfig::default()
        .init::<InferenceBackend>(&device)
        .unwrap();

    for batch_size in [1, 16, 64] {
        let x = Tensor::<InferenceBackend, 3>::random(
            [batch_size, 96, 4],
            Distribution::Normal(0.0, 1.0),
            &device,
        );
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &x, |b, x| {
            b.iter(|| black_box(model.forward(x.clone()).unwrap()));
        });
    }

    group.finish();
}

fn bench_predict_rows(c: &mut Criterion) {
    let device = Default::default();
    let config = TimeSeriesTransformerConfig::default();
    let model = config.init::<InferenceBackend>(&device).unwrap();
    let rows: Vec<[f32; 4]> = (0..96)
        .map(|i| [15.0 + (i as f32 / 4.0).sin(), 70.0, 5.0, 1013.0])
        .collect();
    let stats = NormalizationStats::from_rows(&rows).unwrap();
    let predictor =
        Predictor::new(model, CheckpointMetadata::new(config, WindowConfig::default(), stats), device)
            .unwrap();

    c.bench_function("predict_rows_96", |b| {
        b.iter(|| black_box(predictor.predict_rows(&rows).unwrap()));
    });
}

criterion_group!(benches, bench_model_forward, bench_predict_rows);
criterion_main!(benches);
