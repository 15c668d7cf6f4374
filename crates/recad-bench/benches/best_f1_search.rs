// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use recad_core::Direction;
use recad_eval::{adjust, find_best_threshold};

const SIZES: [usize; 3] = [10_000, 100_000, 1_000_000];

fn lcg_next(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state
}

fn unit(state: &mut u64) -> f64 {
    (lcg_next(state) >> 11) as f64 / (1u64 << 53) as f64
}

/// Scores with ~1% anomalous points grouped into short segments that score
/// higher on average.
fn generate_scores_and_labels(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut state = 0xfeed_f00d_dead_beef_u64;
    let mut scores = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    let mut remaining_in_segment = 0usize;

    for _ in 0..n {
        if remaining_in_segment == 0 && lcg_next(&mut state) % 1_000 < 2 {
            remaining_in_segment = 1 + (lcg_next(&mut state) % 8) as usize;
        }
        let anomalous = remaining_in_segment > 0;
        remaining_in_segment = remaining_in_segment.saturating_sub(1);

        let noise = unit(&mut state);
        scores.push(if anomalous { 0.5 + noise } else { noise });
        labels.push(if anomalous { 1.0 } else { 0.0 });
    }

    (scores, labels)
}

fn benchmark_best_f1(c: &mut Criterion) {
    let mut group = c.benchmark_group("best_f1_search");
    group.sample_size(10);

    for n in SIZES {
        let (scores, labels) = generate_scores_and_labels(n);
        group.bench_with_input(BenchmarkId::new("upper", n), &n, |b, _| {
            b.iter(|| {
                find_best_threshold(black_box(&scores), black_box(&labels), Direction::Upper)
                    .expect("search should succeed")
            })
        });
    }

    group.finish();
}

fn benchmark_adjust(c: &mut Criterion) {
    let mut group = c.benchmark_group("point_adjust");

    for n in SIZES {
        let (scores, labels) = generate_scores_and_labels(n);
        let ground_truth = labels.iter().map(|&l| u8::from(l > 0.5)).collect::<Vec<_>>();
        let predictions = scores.iter().map(|&s| u8::from(s > 0.9)).collect::<Vec<_>>();
        group.bench_with_input(BenchmarkId::new("segments", n), &n, |b, _| {
            b.iter(|| {
                adjust(black_box(&ground_truth), black_box(&predictions))
                    .expect("adjust should succeed")
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_best_f1, benchmark_adjust);
criterion_main!(benches);
