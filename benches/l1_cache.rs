// Copyright (c) 2024-present, helios-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! L1 cache put/get throughput, with and without compression.

use criterion::{criterion_group, criterion_main, Criterion};
use helios_engine::cache::{L1Cache, L1Config};
use helios_engine::hash::hash_blob;

fn bench_put_get_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("l1_cache");

    group.bench_function("put_get_small_entries_no_compression", |b| {
        let cache = L1Cache::new(L1Config::new().capacity_bytes(64_000_000).compression_threshold(i64::MAX));
        let payload = vec![0u8; 256];
        let digest = hash_blob(&payload);

        b.iter(|| {
            cache.put(digest, payload.clone());
            cache.get(digest)
        });
    });

    #[cfg(feature = "lz4")]
    group.bench_function("put_get_compressible_entries", |b| {
        let cache = L1Cache::new(L1Config::new().capacity_bytes(64_000_000).compression_threshold(0));
        let payload = vec![b'A'; 8192];
        let digest = hash_blob(&payload);

        b.iter(|| {
            cache.put(digest, payload.clone());
            cache.get(digest)
        });
    });

    group.finish();
}

fn bench_eviction_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("l1_cache");

    group.bench_function("sustained_eviction_churn", |b| {
        let cache = L1Cache::new(L1Config::new().capacity_bytes(100_000).compression_threshold(i64::MAX));
        let mut counter = 0u64;

        b.iter(|| {
            counter += 1;
            let payload = counter.to_le_bytes().repeat(128);
            let digest = hash_blob(&payload);
            cache.put(digest, payload);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_put_get_roundtrip, bench_eviction_churn);
criterion_main!(benches);
