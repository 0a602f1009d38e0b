//! Benchmarks for the Clover curation pipeline.
//!
//! Run with: cargo bench -p clover-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use clover_core::config::QualityConfig;
use clover_core::pipeline::{compute_metrics, rescale, tile, ImageClassifier};
use image::{DynamicImage, GrayImage, Luma};

/// Deterministic pseudo-terrain so benches don't depend on fixtures.
fn synthetic(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| {
        Luma([((x * 31 + y * 17 + (x ^ y)) % 256) as u8])
    }))
}

fn benchmark_metrics(c: &mut Criterion) {
    let img = synthetic(1024, 1024);

    c.bench_function("metrics_1024", |b| {
        b.iter(|| {
            let _ = compute_metrics(black_box(&img), 25);
        })
    });
}

fn benchmark_classify(c: &mut Criterion) {
    let img = synthetic(512, 2048);
    let classifier = ImageClassifier::new(QualityConfig::default());

    c.bench_function("classify_512x2048", |b| {
        b.iter(|| {
            let _ = classifier.classify(Ok(black_box(&img)));
        })
    });
}

fn benchmark_rescale(c: &mut Criterion) {
    let img = synthetic(2532, 5000);

    c.bench_function("rescale_to_256", |b| {
        b.iter(|| {
            let _ = rescale(black_box(&img), 256);
        })
    });
}

fn benchmark_tile(c: &mut Criterion) {
    let img = synthetic(256, 4096);

    c.bench_function("tile_256x4096", |b| {
        b.iter(|| {
            let count = tile(black_box(&img)).count();
            black_box(count);
        })
    });
}

criterion_group!(
    benches,
    benchmark_metrics,
    benchmark_classify,
    benchmark_rescale,
    benchmark_tile,
);
criterion_main!(benches);
