//! Benchmarks for the consistent-snapshot read path
//!
//! Measures copying the latest row out of an in-memory image, both straight from a byte
//! slice and through the `MemoryPlatform` view a live connection uses.
//!
//! Platform: Cross-platform (synthetic image, CI-safe)

use criterion::{Criterion, criterion_group, criterion_main};
use irtelem::platform::{MemoryPlatform, Platform};
use irtelem::test_utils::{ImageBuilder, float_descriptor};
use irtelem::{ReadOutcome, SnapshotReader};
use std::hint::black_box;

const ROW_LEN: usize = 4096;

fn image() -> Vec<u8> {
    ImageBuilder::new(vec![float_descriptor("Speed", 0)], ROW_LEN).num_buf(3).build_live()
}

fn bench_read_latest(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_latest");

    let bytes = image();
    group.bench_function("slice_fresh", |b| {
        b.iter(|| {
            // a new reader has no last tick, so every read copies
            let mut reader = SnapshotReader::new();
            black_box(reader.read_latest(black_box(bytes.as_slice())))
        })
    });

    let mut stale_reader = SnapshotReader::new();
    let _ = stale_reader.read_latest(bytes.as_slice());
    group.bench_function("slice_stale", |b| {
        b.iter(|| {
            let outcome = stale_reader.read_latest(black_box(bytes.as_slice()));
            black_box(matches!(outcome, Ok(ReadOutcome::Stale)))
        })
    });

    let platform = MemoryPlatform::with_image(image());
    let region = platform.open_shared_region("bench").expect("image installed");
    let view = platform.map_region(&region, usize::MAX).expect("mapped");
    group.bench_function("memory_view_fresh", |b| {
        b.iter(|| {
            let mut reader = SnapshotReader::new();
            black_box(reader.read_latest(black_box(&view)))
        })
    });
    platform.close_region(region, Some(view));

    group.finish();
}

criterion_group!(benches, bench_read_latest);
criterion_main!(benches);
