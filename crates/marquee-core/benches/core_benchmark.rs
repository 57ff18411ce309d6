//! Benchmark tests for marquee-core operations
//!
//! Run with: cargo bench -p marquee-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use marquee_core::buffered::{buffered_end, merge_ranges};
use marquee_core::sim::{SimulatedElement, SimulatedEngineFactory, SimulatedEnvironment};
use marquee_core::{
    classify, format_time, parse_time, PlaybackController, PlayerConfig, SourceHint, TimeRange,
};

// ============================================================================
// Helpers
// ============================================================================

/// Ranges with small gaps every few segments, like a stream with seeks
fn fragmented_ranges(count: usize) -> Vec<TimeRange> {
    (0..count)
        .map(|i| {
            let start = i as f64 * 4.0;
            let gap = if i % 5 == 4 { 0.5 } else { 0.05 };
            TimeRange::new(start, start + 4.0 - gap)
        })
        .collect()
}

// ============================================================================
// Classification Benchmarks
// ============================================================================

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("Source Classification");

    group.bench_function("segmented_absolute", |b| {
        let url = "https://test-streams.mux.dev/x36xhzz/x36xhzz.m3u8";
        b.iter(|| black_box(classify(black_box(url), SourceHint::Auto)));
    });

    group.bench_function("segmented_with_query", |b| {
        let url = "https://cdn.example.com/live/index.m3u8?token=abcdef&exp=1700000000";
        b.iter(|| black_box(classify(black_box(url), SourceHint::Auto)));
    });

    group.bench_function("progressive_relative", |b| {
        let url = "media/clips/BigBuckBunny.mp4";
        b.iter(|| black_box(classify(black_box(url), SourceHint::Auto)));
    });

    group.bench_function("explicit_hint", |b| {
        let url = "https://cdn.example.com/stream";
        b.iter(|| black_box(classify(black_box(url), SourceHint::Segmented)));
    });

    group.finish();
}

// ============================================================================
// Time Formatting Benchmarks
// ============================================================================

fn bench_time(c: &mut Criterion) {
    let mut group = c.benchmark_group("Time Formatting");

    for &seconds in &[42.0, 3599.9, 7322.0] {
        group.bench_with_input(BenchmarkId::new("format_time", seconds), &seconds, |b, &s| {
            b.iter(|| black_box(format_time(black_box(s))));
        });
    }

    group.bench_function("parse_time", |b| {
        b.iter(|| black_box(parse_time(black_box("2:02:02"))));
    });

    group.finish();
}

// ============================================================================
// Buffered Range Benchmarks
// ============================================================================

fn bench_buffered(c: &mut Criterion) {
    let mut group = c.benchmark_group("Buffered Ranges");

    for &count in &[1, 10, 100] {
        let ranges = fragmented_ranges(count);
        let position = count as f64 * 2.0;

        group.bench_with_input(BenchmarkId::new("merge_ranges", count), &ranges, |b, ranges| {
            b.iter(|| black_box(merge_ranges(black_box(ranges))));
        });

        group.bench_with_input(BenchmarkId::new("buffered_end", count), &ranges, |b, ranges| {
            b.iter(|| black_box(buffered_end(black_box(ranges), black_box(position))));
        });
    }

    group.finish();
}

// ============================================================================
// Signal Folding Benchmarks
// ============================================================================

fn bench_folding(c: &mut Criterion) {
    let mut group = c.benchmark_group("Signal Folding");

    for &batch in &[1, 10, 100] {
        group.bench_with_input(BenchmarkId::new("pump_time_updates", batch), &batch, |b, &batch| {
            let element = SimulatedElement::new();
            let handle = element.handle();
            let mut controller = PlaybackController::new(
                PlayerConfig::default(),
                Box::new(element),
                Arc::new(SimulatedEnvironment::new()),
                Box::new(SimulatedEngineFactory::new()),
            )
            .unwrap();
            controller.set_source("https://cdn.example.com/clip.mp4", SourceHint::Auto);
            handle.load_metadata(f64::INFINITY);
            controller.play_pause();
            controller.pump();

            b.iter(|| {
                for _ in 0..batch {
                    handle.advance(0.25);
                }
                black_box(controller.pump())
            });
        });
    }

    group.finish();
}

criterion_group!(classify_benches, bench_classify);

criterion_group!(time_benches, bench_time);

criterion_group!(buffered_benches, bench_buffered);

criterion_group!(folding_benches, bench_folding);

criterion_main!(
    classify_benches,
    time_benches,
    buffered_benches,
    folding_benches,
);
