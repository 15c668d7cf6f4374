// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use recad_core::{FeatureMode, TrainableModel};
use recad_train::{
    DENSE_AE_TAG, DenseAutoencoder, Granularity, ModelSpec, SeriesMatrix, WindowDataset,
    score_series,
};

const N: usize = 50_000;
const D: usize = 25;
const SEQ_LEN: usize = 100;
const BATCH_SIZE: usize = 128;

fn benchmark_window_scoring(c: &mut Criterion) {
    let values: Vec<f64> = (0..N * D)
        .map(|idx| {
            let x = idx as f64;
            (x * 0.01).sin() + (x * 0.003).cos() * 0.1
        })
        .collect();
    let series = SeriesMatrix::new(values, N, D).expect("benchmark series should be valid");
    let dataset = WindowDataset::new(series, None, SEQ_LEN, SEQ_LEN)
        .expect("benchmark dataset should be valid");
    let spec = ModelSpec {
        seq_len: SEQ_LEN,
        features: D,
        d_model: 64,
        seed: 2021,
    };
    let model = DenseAutoencoder::new(DENSE_AE_TAG, Granularity::Timestep, &spec)
        .expect("benchmark model should be valid");
    let batch = dataset
        .gather(&(0..BATCH_SIZE).collect::<Vec<_>>())
        .expect("benchmark batch should gather");

    let mut group = c.benchmark_group("window_scoring");
    group.sample_size(10);

    group.bench_function("score_series_n5e4_d25", |b| {
        b.iter(|| {
            score_series(black_box(&model), black_box(&dataset), BATCH_SIZE)
                .expect("scoring should succeed")
        })
    });

    group.bench_function("loss_and_gradient_b128", |b| {
        b.iter(|| {
            model
                .loss_and_gradient(black_box(&batch.inputs), FeatureMode::M)
                .expect("gradient should succeed")
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_window_scoring);
criterion_main!(benches);
