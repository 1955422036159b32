// Copyright (c) 2024-present, helios-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The L1 compressed cache: a bounded, in-process acceleration layer in
//! front of the L2 object store, with deterministic FIFO eviction.
//!
//! # Examples
//!
//! ```
//! use helios_engine::cache::{L1Cache, L1Config};
//! use helios_engine::hash::hash_blob;
//!
//! let cache = L1Cache::new(L1Config::new().capacity_bytes(1_000_000));
//! let digest = hash_blob(b"hello world");
//!
//! cache.put(digest, b"hello world".to_vec());
//! assert_eq!(cache.get(digest), Some(b"hello world".to_vec()));
//! ```

use crate::compression;
use crate::digest::Digest;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::sync::Mutex;

#[cfg(feature = "lz4")]
const DEFAULT_COMPRESSION_THRESHOLD: i64 = 256;

/// Configuration for an [`L1Cache`].
#[derive(Clone, Copy, Debug)]
pub struct L1Config {
    capacity_bytes: i64,
    compression_threshold: i64,
}

impl Default for L1Config {
    fn default() -> Self {
        Self {
            capacity_bytes: 64 * 1_000 * 1_000,
            #[cfg(feature = "lz4")]
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            #[cfg(not(feature = "lz4"))]
            compression_threshold: 0,
        }
    }
}

impl L1Config {
    /// Creates a config with the default capacity and compression threshold.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cache capacity in bytes. A value `<= 0` disables the cache:
    /// every `put` and `get` becomes a no-op/miss.
    #[must_use]
    pub fn capacity_bytes(mut self, bytes: i64) -> Self {
        self.capacity_bytes = bytes;
        self
    }

    /// Sets the minimum raw size, in bytes, before compression is attempted.
    /// A value `<= 0` means always attempt compression.
    #[must_use]
    pub fn compression_threshold(mut self, threshold: i64) -> Self {
        self.compression_threshold = threshold;
        self
    }
}

/// Monotonically increasing counters plus the cache's current size, as of
/// the moment [`L1Cache::stats`] was called.
#[derive(Clone, Copy, Debug, Default, serde::Serialize)]
pub struct L1Stats {
    /// Number of `get` calls that returned bytes.
    pub hits: u64,
    /// Number of `get` calls that returned `None`.
    pub misses: u64,
    /// Number of entries evicted (FIFO) to make room for new ones.
    pub evictions: u64,
    /// Current total stored size, in bytes (post-compression where applied).
    pub size_bytes: u64,
    /// Current number of entries.
    pub items: u64,
}

struct Entry {
    digest: Digest,
    bytes: Vec<u8>,
    compressed: bool,
}

#[derive(Default)]
struct Inner {
    // FxHashMap would work as well, but std's default hasher is adequate
    // here: digests are already uniformly distributed.
    index: std::collections::HashMap<Digest, usize>,
    order: VecDeque<Entry>,
    size_bytes: u64,
}

/// A bounded, thread-safe, compressed cache keyed by content digest.
///
/// Eviction is strict FIFO over insertion order, not access order.
/// Replacing an existing key removes it from the order and re-appends it,
/// moving it to the tail.
pub struct L1Cache {
    config: L1Config,
    inner: Mutex<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl std::fmt::Debug for L1Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("L1Cache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl L1Cache {
    /// Creates a new cache with the given configuration.
    #[must_use]
    pub fn new(config: L1Config) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Returns `true` if the cache is disabled (`capacity_bytes <= 0`).
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.config.capacity_bytes <= 0
    }

    /// Stores `raw` under `digest`, compressing it first if that strictly
    /// reduces its size and the configured threshold permits it.
    ///
    /// Returns `(stored_bytes, compressed)`. If the cache is disabled, or
    /// the candidate stored form exceeds the cache's total capacity, the
    /// entry is not cached and `(0, false)` is returned.
    ///
    /// The lock is not held across (de)compression: candidate bytes are
    /// computed first, then the lock is taken only to splice the entry into
    /// the FIFO order.
    pub fn put(&self, digest: Digest, raw: Vec<u8>) -> (u64, bool) {
        if self.is_disabled() {
            return (0, false);
        }

        let (stored, compressed) = self.candidate_form(&raw);

        #[allow(clippy::cast_sign_loss)]
        let capacity = self.config.capacity_bytes as u64;

        if stored.len() as u64 > capacity {
            return (0, false);
        }

        let stored_len = stored.len() as u64;

        #[allow(clippy::expect_used)]
        let mut inner = self.inner.lock().expect("L1 cache lock poisoned");

        if let Some(&position) = inner.index.get(&digest) {
            remove_at(&mut inner, position);
        }

        while inner.size_bytes + stored_len > capacity {
            let Some(evicted) = inner.order.pop_front() else {
                break;
            };
            inner.size_bytes -= evicted.bytes.len() as u64;
            inner.index.remove(&evicted.digest);
            reindex(&mut inner);
            self.evictions.fetch_add(1, Relaxed);
        }

        inner.size_bytes += stored_len;
        inner.index.insert(digest, inner.order.len());
        inner.order.push_back(Entry {
            digest,
            bytes: stored,
            compressed,
        });

        (stored_len, compressed)
    }

    #[allow(unused_variables)]
    fn candidate_form(&self, raw: &[u8]) -> (Vec<u8>, bool) {
        #[cfg(feature = "lz4")]
        {
            let attempt_compression =
                self.config.compression_threshold <= 0 || {
                    #[allow(clippy::cast_possible_wrap)]
                    let len = raw.len() as i64;
                    len >= self.config.compression_threshold
                };

            if attempt_compression {
                let compressed = compression::compress(raw);
                if compressed.len() < raw.len() {
                    return (compressed, true);
                }
            }
        }

        (raw.to_vec(), false)
    }

    /// Returns a fresh copy of the bytes stored under `digest`, or `None` on
    /// a miss (disabled cache, absent key, or a corrupt compressed entry —
    /// which is evicted and counted as a miss).
    pub fn get(&self, digest: Digest) -> Option<Vec<u8>> {
        if self.is_disabled() {
            self.misses.fetch_add(1, Relaxed);
            return None;
        }

        #[allow(clippy::expect_used)]
        let mut inner = self.inner.lock().expect("L1 cache lock poisoned");

        let Some(&position) = inner.index.get(&digest) else {
            drop(inner);
            self.misses.fetch_add(1, Relaxed);
            return None;
        };

        let stored = inner.order[position].bytes.clone();
        let is_compressed = inner.order[position].compressed;
        drop(inner);

        if !is_compressed {
            self.hits.fetch_add(1, Relaxed);
            return Some(stored);
        }

        #[cfg(feature = "lz4")]
        {
            match compression::decompress(&stored) {
                Ok(raw) => {
                    self.hits.fetch_add(1, Relaxed);
                    Some(raw)
                }
                Err(_) => {
                    #[allow(clippy::expect_used)]
                    let mut inner = self.inner.lock().expect("L1 cache lock poisoned");
                    if let Some(&position) = inner.index.get(&digest) {
                        remove_at(&mut inner, position);
                    }
                    drop(inner);
                    self.misses.fetch_add(1, Relaxed);
                    None
                }
            }
        }

        #[cfg(not(feature = "lz4"))]
        {
            // A compressed=true entry with the lz4 feature disabled cannot
            // happen: `candidate_form` never sets it without the feature.
            unreachable!("compressed entry with lz4 feature disabled")
        }
    }

    /// Returns a snapshot of the cache's counters and current size.
    #[must_use]
    pub fn stats(&self) -> L1Stats {
        #[allow(clippy::expect_used)]
        let inner = self.inner.lock().expect("L1 cache lock poisoned");

        L1Stats {
            hits: self.hits.load(Relaxed),
            misses: self.misses.load(Relaxed),
            evictions: self.evictions.load(Relaxed),
            size_bytes: inner.size_bytes,
            items: inner.order.len() as u64,
        }
    }
}

/// Removes the entry at `position`, preserving FIFO order for the rest.
fn remove_at(inner: &mut Inner, position: usize) {
    if let Some(entry) = inner.order.remove(position) {
        inner.size_bytes -= entry.bytes.len() as u64;
        inner.index.remove(&entry.digest);
    }
    reindex(inner);
}

/// Rebuilds the digest→position index after a removal shifts later entries.
fn reindex(inner: &mut Inner) {
    inner.index.clear();
    for (i, entry) in inner.order.iter().enumerate() {
        inner.index.insert(entry.digest, i);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn digest_of(data: &[u8]) -> Digest {
        crate::hash::hash_blob(data)
    }

    #[test]
    fn disabled_cache_is_always_a_miss() {
        let cache = L1Cache::new(L1Config::new().capacity_bytes(0));
        let digest = digest_of(b"x");
        let (stored, _) = cache.put(digest, b"x".to_vec());
        assert_eq!(stored, 0);
        assert_eq!(cache.get(digest), None);
    }

    #[test]
    fn put_then_get_roundtrips() {
        let cache = L1Cache::new(L1Config::new().capacity_bytes(1_000));
        let digest = digest_of(b"payload");
        cache.put(digest, b"payload".to_vec());
        assert_eq!(cache.get(digest), Some(b"payload".to_vec()));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.items, 1);
    }

    #[test]
    fn miss_increments_miss_counter() {
        let cache = L1Cache::new(L1Config::new().capacity_bytes(1_000));
        assert_eq!(cache.get(digest_of(b"absent")), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn entry_exceeding_capacity_is_rejected() {
        let cache = L1Cache::new(L1Config::new().capacity_bytes(4));
        let digest = digest_of(b"this is way too big for the cache");
        let (stored, _) = cache.put(digest, b"this is way too big for the cache".to_vec());
        assert_eq!(stored, 0);
        assert_eq!(cache.get(digest), None);
    }

    #[test]
    fn fifo_eviction_evicts_oldest_first() {
        let cache = L1Cache::new(L1Config::new().capacity_bytes(20).compression_threshold(-1));
        let a = digest_of(b"a");
        let b = digest_of(b"b");
        let c = digest_of(b"c");

        cache.put(a, vec![0u8; 10]);
        cache.put(b, vec![0u8; 10]);
        // Inserting c should evict a (oldest) to make room.
        cache.put(c, vec![0u8; 10]);

        assert_eq!(cache.get(a), None);
        assert!(cache.get(b).is_some());
        assert!(cache.get(c).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn replacing_a_key_moves_it_to_the_tail() {
        let cache = L1Cache::new(L1Config::new().capacity_bytes(20).compression_threshold(-1));
        let a = digest_of(b"a");
        let b = digest_of(b"b");

        cache.put(a, vec![0u8; 10]);
        cache.put(b, vec![0u8; 10]);
        // Re-insert a: it should move to the tail, so the next eviction
        // removes b, not a.
        cache.put(a, vec![1u8; 10]);

        let c = digest_of(b"c");
        cache.put(c, vec![0u8; 10]);

        assert_eq!(cache.get(b), None);
        assert!(cache.get(a).is_some());
    }

    #[test]
    fn stats_track_current_size_and_items() {
        let cache = L1Cache::new(L1Config::new().capacity_bytes(1_000).compression_threshold(-1));
        cache.put(digest_of(b"one"), b"one".to_vec());
        cache.put(digest_of(b"two"), b"two".to_vec());

        let stats = cache.stats();
        assert_eq!(stats.items, 2);
        assert_eq!(stats.size_bytes, 6);
    }
}
