//! Hot path benchmarks for bucket storage.
//!
//! Run with: `cargo bench --bench hot_paths`
//! Compare baselines: `cargo bench --bench hot_paths -- --baseline main`
//!
//! Measures the two calls that dominate a metering node: recording a
//! changed key (registry scan + SADD) and draining a bucket (SMEMBERS +
//! chunked MGET).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stats_buckets::{BucketId, BucketStorage, InMemoryStore};
use std::num::NonZeroUsize;

fn populated(open_buckets: u64, keys: usize) -> (BucketStorage<InMemoryStore>, BucketId) {
    let storage = BucketStorage::new(InMemoryStore::new());
    for i in 0..open_buckets {
        let id = BucketId::new((20140729182500u64 + i * 10).to_string()).unwrap();
        storage.create_bucket(&id).unwrap();
    }
    let target = BucketId::new("20140729182500").unwrap();
    for i in 0..keys {
        let key = format!("stats/{{service:1000}}/cinstance:10/metric:{}/eternity", i);
        storage.put_in_bucket(&key, &target).unwrap();
        storage.store().set(&key, i.to_string()).unwrap();
    }
    (storage, target)
}

/// put_in_bucket reads the whole registry first, so cost grows with the
/// number of open buckets
fn bench_put_in_bucket(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_in_bucket");
    group.throughput(Throughput::Elements(1));

    for open_buckets in [1u64, 10, 100, 1000] {
        let (storage, target) = populated(open_buckets, 0);
        group.bench_with_input(
            BenchmarkId::from_parameter(open_buckets),
            &open_buckets,
            |b, _| b.iter(|| storage.put_in_bucket(black_box("stats/key"), &target)),
        );
    }

    group.finish();
}

fn bench_bucket_content_with_values(c: &mut Criterion) {
    let mut group = c.benchmark_group("bucket_content_with_values");

    for keys in [10usize, 200, 1000, 5000] {
        let (storage, target) = populated(1, keys);
        group.throughput(Throughput::Elements(keys as u64));
        group.bench_with_input(BenchmarkId::from_parameter(keys), &keys, |b, _| {
            b.iter(|| storage.bucket_content_with_values(black_box(&target)))
        });
    }

    group.finish();
}

/// Effect of the MGET chunk size on a 5000-key drain
fn bench_mget_batch_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("mget_batch_size");
    group.throughput(Throughput::Elements(5000));

    for batch in [50usize, 200, 1000] {
        let (storage, target) = populated(1, 5000);
        let storage = match NonZeroUsize::new(batch) {
            Some(size) => storage.with_mget_batch_size(size),
            None => storage,
        };
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, _| {
            b.iter(|| storage.bucket_content_with_values(black_box(&target)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_put_in_bucket,
    bench_bucket_content_with_values,
    bench_mget_batch_size
);
criterion_main!(benches);
