//! # Entity Indexer Benchmark
//!
//! Handle churn at steady state:
//! - create / destroy cycles reusing freed slots
//! - validity checks on mixed live and stale handles
//! - chunk remapping after a sort pass
//!
//! Run with: `cargo bench --package umbra_core --bench indexer_benchmark`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use umbra_core::{ArrayLocation, ChunkLocation, Entity, EntityIndexer};

/// Entities alive during steady-state benches.
const LIVE_COUNT: usize = 100_000;

/// Benchmark: create N handles into a fresh indexer.
fn bench_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("indexer_create");

    for count in [1_000, 10_000, LIVE_COUNT] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut indexer: EntityIndexer<ArrayLocation> = EntityIndexer::with_capacity(count);
                for row in 0..count as u32 {
                    black_box(indexer.create_at(0, row));
                }
                indexer.len()
            });
        });
    }

    group.finish();
}

/// Benchmark: destroy and recreate 10% of the live set (free-list reuse).
fn bench_churn(c: &mut Criterion) {
    let mut indexer: EntityIndexer<ArrayLocation> = EntityIndexer::with_capacity(LIVE_COUNT);
    let mut live: Vec<Entity> = (0..LIVE_COUNT as u32)
        .map(|row| indexer.create_at(0, row))
        .collect();

    c.bench_function("indexer_churn_10K_of_100K", |b| {
        b.iter(|| {
            for slot in live.iter_mut().step_by(10) {
                indexer.destroy(*slot);
                *slot = indexer.create_at(0, 0);
            }
            black_box(indexer.free_count())
        });
    });
}

/// Benchmark: validity of stale and live handles.
fn bench_is_valid(c: &mut Criterion) {
    let mut indexer: EntityIndexer<ChunkLocation> = EntityIndexer::new();
    let handles: Vec<Entity> = (0..LIVE_COUNT as u32)
        .map(|chunk| indexer.create_in_chunk(chunk))
        .collect();
    for entity in handles.iter().step_by(2) {
        indexer.destroy(*entity);
    }

    c.bench_function("indexer_is_valid_100K", |b| {
        b.iter(|| handles.iter().filter(|&&entity| indexer.is_valid(entity)).count());
    });
}

/// Benchmark: remap every live slot after a reversing sort.
fn bench_remap(c: &mut Criterion) {
    let mut indexer: EntityIndexer<ChunkLocation> = EntityIndexer::new();
    for chunk in 0..LIVE_COUNT as u32 {
        indexer.create_in_chunk(chunk);
    }
    let reverse: Vec<u32> = (0..LIVE_COUNT as u32).rev().collect();

    c.bench_function("indexer_remap_100K", |b| {
        b.iter(|| {
            indexer.remap_chunk_indices(black_box(&reverse));
        });
    });
}

criterion_group!(benches, bench_create, bench_churn, bench_is_valid, bench_remap);
criterion_main!(benches);
