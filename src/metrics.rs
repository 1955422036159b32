// Copyright (c) 2024-present, helios-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Commit latency sampling and percentile reporting.
//!
//! A lock-protected append-only series of microsecond samples, plus two
//! monotonically increasing counters for newly staged objects and bytes.
//! [`Metrics::snapshot`] performs quickselect-based percentile selection on a
//! *copy* of the series, so it never mutates the recorded history.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::sync::Mutex;
use std::time::Duration;

/// A point-in-time read of the engine's commit-latency distribution and
/// object/byte counters.
#[derive(Clone, Copy, Debug, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    /// 50th percentile commit latency, in microseconds.
    pub p50: u64,
    /// 95th percentile commit latency, in microseconds.
    pub p95: u64,
    /// 99th percentile commit latency, in microseconds.
    pub p99: u64,
    /// Total number of newly staged objects across all commits.
    pub new_objects: u64,
    /// Total number of newly staged bytes across all commits.
    pub new_bytes: u64,
}

/// Commit latency histogram plus newly-staged-object counters.
#[derive(Debug, Default)]
pub struct Metrics {
    samples_us: Mutex<Vec<u64>>,
    new_objects: AtomicU64,
    new_bytes: AtomicU64,
}

impl Metrics {
    /// Creates an empty metrics collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a commit's wall-clock latency.
    #[allow(clippy::cast_possible_truncation)]
    pub fn observe(&self, duration: Duration) {
        let micros = duration.as_micros().min(u128::from(u64::MAX)) as u64;

        #[allow(clippy::expect_used)]
        let mut samples = self.samples_us.lock().expect("metrics lock poisoned");
        samples.push(micros);
    }

    /// Adds to the newly-staged-object counter. No-op on zero.
    pub fn add_new_objects(&self, n: u64) {
        if n != 0 {
            self.new_objects.fetch_add(n, Relaxed);
        }
    }

    /// Adds to the newly-staged-byte counter. No-op on zero.
    pub fn add_new_bytes(&self, n: u64) {
        if n != 0 {
            self.new_bytes.fetch_add(n, Relaxed);
        }
    }

    /// Computes p50/p95/p99 over the recorded samples, plus the current
    /// object/byte counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        #[allow(clippy::expect_used)]
        let samples = self.samples_us.lock().expect("metrics lock poisoned");

        let mut copy = samples.clone();
        drop(samples);

        MetricsSnapshot {
            p50: percentile(&mut copy, 0.50),
            p95: percentile(&mut copy, 0.95),
            p99: percentile(&mut copy, 0.99),
            new_objects: self.new_objects.load(Relaxed),
            new_bytes: self.new_bytes.load(Relaxed),
        }
    }
}

/// Quickselect-based percentile over `samples` (reordered in place).
///
/// `p` is a fraction in `[0.0, 1.0]`. Returns `0` for an empty series.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percentile(samples: &mut [u64], p: f64) -> u64 {
    if samples.is_empty() {
        return 0;
    }

    let rank = ((samples.len() - 1) as f64 * p).round() as usize;
    let rank = rank.min(samples.len() - 1);

    let (_, nth, _) = samples.select_nth_unstable(rank);
    *nth
}
