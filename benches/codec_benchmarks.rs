//! Benchmarks for motion-vector serialization and persistence.
//!
//! Run with: cargo bench

use criterion::{Criterion, criterion_group, criterion_main};
use mvextract::{MotionVectorRecord, codec};

/// A frame's worth of synthetic records on a 16-pixel macroblock grid.
fn synthetic_records(count: usize) -> Vec<MotionVectorRecord> {
    (0..count)
        .map(|index| {
            let index = index as i32;
            MotionVectorRecord {
                source: -1,
                mb_w: 16,
                mb_h: 16,
                src_x: (index % 120) * 16 + 10,
                src_y: (index / 120) * 16 + 8,
                dst_x: (index % 120) * 16 + 8,
                dst_y: (index / 120) * 16 + 8,
                motion_x: (index % 17) - 8,
                motion_y: (index % 11) - 5,
                motion_scale: 4,
            }
        })
        .collect()
}

fn benchmark_json_serialization(criterion: &mut Criterion) {
    let records = synthetic_records(1_000);
    let json = codec::serialize(&records).unwrap();

    criterion.bench_function("serialize 1000 records to JSON", |bencher| {
        bencher.iter(|| codec::serialize(&records).unwrap());
    });

    criterion.bench_function("deserialize 1000 records from JSON", |bencher| {
        bencher.iter(|| codec::deserialize(&json).unwrap());
    });
}

fn benchmark_binary_persistence(criterion: &mut Criterion) {
    let records = synthetic_records(1_000);
    let blob = codec::persist_binary(&records);

    criterion.bench_function("persist 1000 records to binary", |bencher| {
        bencher.iter(|| codec::persist_binary(&records));
    });

    criterion.bench_function("load 1000 records from binary", |bencher| {
        bencher.iter(|| codec::load_binary(&blob).unwrap());
    });
}

criterion_group!(
    benches,
    benchmark_json_serialization,
    benchmark_binary_persistence
);
criterion_main!(benches);
