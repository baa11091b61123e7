//! Benchmark suite for id mapping
//!
//! Covers the phases of an import run:
//! - Collection: put_batch for text and integer keys
//! - Build: finalize (parallel sort + collision scan) per storage policy
//! - Lookup: point lookups on a frozen mapper, hit and miss
//! - Pipeline: full IdImporter run with relationships
//!
//! Run: cargo bench --bench idmap_operations

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rfdb_idmap::{
    CollectedIds, DuplicatePolicy, GeneralMapper, IdImporter, IdMapper, ImportConfig, KeyBatch,
    KeyKind, LongArrayFactory, StoragePolicy, TypedKey,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_text_keys(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("FUNCTION:func_{}@src/file_{}.js", i, i % 100))
        .collect()
}

fn text_batch(keys: &[String]) -> KeyBatch {
    let mut batch = KeyBatch::new(0..keys.len() as u64);
    for (ordinal, key) in keys.iter().enumerate() {
        batch.push(ordinal as u64, TypedKey::from(key.as_str())).unwrap();
    }
    batch
}

fn collected_mapper(keys: &[String], storage: StoragePolicy, sort_threads: usize) -> GeneralMapper {
    let mut mapper = GeneralMapper::new(
        KeyKind::Text,
        LongArrayFactory::new(storage),
        keys.len() as u64,
    )
    .unwrap()
    .with_sort_threads(sort_threads);
    mapper.put_batch(text_batch(keys)).unwrap();
    mapper
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

fn bench_put_batch_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_batch_text");

    for size in [1_000, 10_000, 100_000] {
        let keys = make_text_keys(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || {
                    let mapper = GeneralMapper::new(
                        KeyKind::Text,
                        LongArrayFactory::new(StoragePolicy::Heap),
                        size as u64,
                    )
                    .unwrap();
                    (mapper, text_batch(&keys))
                },
                |(mut mapper, batch)| {
                    mapper.put_batch(black_box(batch)).unwrap();
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_put_integer(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_integer");

    for size in [1_000, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut mapper = GeneralMapper::new(
                    KeyKind::Integer,
                    LongArrayFactory::new(StoragePolicy::Heap),
                    size as u64,
                )
                .unwrap();
                for i in 0..size as u64 {
                    let key = TypedKey::Integer((i as i64).wrapping_mul(7_919));
                    mapper.put(i, black_box(&key)).unwrap();
                }
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

fn bench_finalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("finalize");
    group.sample_size(20);

    let keys = make_text_keys(200_000);
    for (name, storage, threads) in [
        ("heap_1t", StoragePolicy::Heap, 1),
        ("heap_4t", StoragePolicy::Heap, 4),
        ("chunked_4t", StoragePolicy::Chunked, 4),
    ] {
        group.bench_function(name, |b| {
            b.iter_batched(
                || collected_mapper(&keys, storage, threads),
                |mut mapper| {
                    black_box(mapper.finalize().unwrap());
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");

    for size in [10_000, 100_000, 1_000_000] {
        let keys = make_text_keys(size);
        let mut mapper = collected_mapper(&keys, StoragePolicy::Auto, 4);
        mapper.finalize().unwrap();
        let probes: Vec<TypedKey> = keys
            .iter()
            .step_by(size / 1_000)
            .map(|k| TypedKey::from(k.as_str()))
            .collect();

        group.bench_with_input(BenchmarkId::new("hit", size), &size, |b, _| {
            b.iter(|| {
                for key in &probes {
                    black_box(mapper.lookup(key).unwrap());
                }
            });
        });
        group.bench_with_input(BenchmarkId::new("miss", size), &size, |b, _| {
            let missing = TypedKey::from("FUNCTION:absent@nowhere.js");
            b.iter(|| black_box(mapper.lookup(&missing).is_err()));
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

fn bench_import_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("import_run");
    group.sample_size(10);

    for threads in [1, 4] {
        let nodes = make_text_keys(100_000);
        let rels: Vec<(String, String)> = (0..300_000)
            .map(|i| (nodes[i % nodes.len()].clone(), nodes[(i * 7 + 1) % nodes.len()].clone()))
            .collect();
        let config = ImportConfig {
            threads,
            sort_threads: threads,
            duplicates: DuplicatePolicy::Abort,
            ..ImportConfig::default()
        };
        let importer = IdImporter::new(config).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, _| {
            b.iter(|| {
                let mut ids = CollectedIds::new();
                black_box(importer.run(&nodes, &rels, &mut ids).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_put_batch_text,
    bench_put_integer,
    bench_finalize,
    bench_lookup,
    bench_import_run,
);
criterion_main!(benches);
