// Copyright (c) 2024-present, helios-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The single facade an embedder (CLI, test harness, agent orchestration
//! layer) drives: one working tree, backed by an optional L1 cache and an
//! optional durable L2 store.

use crate::cache::{L1Cache, L1Stats};
use crate::config::{resolve_store_dir, EngineConfig};
use crate::error::Result;
use crate::metrics::MetricsSnapshot;
use crate::store::{Store, StoreOptions, StoreStats};
use crate::vst::{DiffResult, MaterializeOptions, SnapshotId, Vst};
use std::path::Path;
use std::sync::Arc;

/// A snapshot of everything an embedder would want to report after an
/// operation: L1's counters and current size, plus the engine's
/// commit-latency percentiles and new-object counters.
#[derive(Clone, Copy, Debug, Default, serde::Serialize)]
pub struct EngineStats {
    /// L1 cache counters, or all-zero if no L1 is attached.
    pub l1: L1Stats,
    /// Commit-latency percentiles and new-object counters.
    pub engine: MetricsSnapshot,
}

/// The versioned-state engine: a working tree plus its acceleration and
/// durability tiers.
///
/// `Engine::open` always succeeds at building a usable in-memory engine. If
/// an L2 location cannot be opened (permissions, a non-directory in the
/// way), that failure surfaces as an [`Error`](crate::Error) rather than
/// silently degrading to an L1-only engine.
pub struct Engine {
    vst: Vst,
    l1: Option<Arc<L1Cache>>,
    l2: Option<Arc<Store>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("l1_attached", &self.l1.is_some())
            .field("l2_attached", &self.l2.is_some())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Opens an engine with the default configuration: an L1 cache with its
    /// default capacity, and an L2 store rooted at the path
    /// [`resolve_store_dir`] derives for `path`.
    ///
    /// `path` is used as the working directory for L2 resolution; it is not
    /// itself read by the engine (the working set starts empty — callers
    /// populate it via [`Self::write_file`] or [`Self::restore`]).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the L2 store directory
    /// cannot be created or opened.
    pub fn open(path: &Path) -> Result<Self> {
        let config = EngineConfig::new()
            .with_l1(crate::cache::L1Config::new())
            .with_l2(StoreOptions::new())
            .cwd(path);

        Self::with_config(&config)
    }

    /// Opens an engine with an explicit [`EngineConfig`]. Either tier may be
    /// omitted (`EngineConfig::new()` alone gives a VST-only engine with no
    /// acceleration or durability).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if an L2 store is configured
    /// and its directory cannot be created or opened.
    pub fn with_config(config: &EngineConfig) -> Result<Self> {
        let vst = Vst::new();

        let l1 = config.l1.map(|l1_config| Arc::new(L1Cache::new(l1_config)));

        let l2 = match &config.store {
            Some(options) => {
                let dir = resolve_store_dir(config)?;
                Some(Arc::new(Store::open(&dir, options.clone())?))
            }
            None => None,
        };

        vst.attach_stores(l1.clone(), l2.clone());

        Ok(Self { vst, l1, l2 })
    }

    /// Writes `bytes` to `path` in the working set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`](crate::Error::InvalidInput) for a
    /// malformed path.
    pub fn write_file(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        self.vst.write_file(path, bytes)
    }

    /// Like [`Self::write_file`], additionally recording whether `path`
    /// should be materialized with the executable bit set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`](crate::Error::InvalidInput) for a
    /// malformed path.
    pub fn write_file_with_mode(&self, path: &str, bytes: Vec<u8>, executable: bool) -> Result<()> {
        self.vst.write_file_with_mode(path, bytes, executable)
    }

    /// Reads `path` from the working set, falling back to L1/L2 for paths
    /// known only from a prior commit or restore.
    ///
    /// # Errors
    ///
    /// Propagates I/O or integrity errors from an attached L2 store.
    pub fn read_file(&self, path: &str) -> Result<Option<Vec<u8>>> {
        self.vst.read_file(path)
    }

    /// Removes `path` from the working set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`](crate::Error::InvalidInput) for a
    /// malformed path.
    pub fn delete_file(&self, path: &str) -> Result<()> {
        self.vst.delete_file(path)
    }

    /// Commits the current working set to a new snapshot.
    ///
    /// # Errors
    ///
    /// Propagates an attached L2 store's batch-write failure; on error no
    /// snapshot is published and the working set is unaffected.
    pub fn commit(&self, message: Option<&str>) -> Result<(SnapshotId, MetricsSnapshot)> {
        self.vst.commit(message)
    }

    /// Replaces the working set with the tree at `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if `id` is not
    /// resolvable via this process's object graph or the attached stores.
    pub fn restore(&self, id: &SnapshotId) -> Result<()> {
        self.vst.restore(*id)
    }

    /// Computes the path-level difference between two committed snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if either `id` is
    /// unresolvable.
    pub fn diff(&self, from: &SnapshotId, to: &SnapshotId) -> Result<DiffResult> {
        self.vst.diff(*from, *to)
    }

    /// Writes the tree at `id` out to `out_dir`, filtered by `options`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if `id` is
    /// unresolvable, or an I/O error from the filesystem.
    pub fn materialize(
        &self,
        id: &SnapshotId,
        out_dir: &Path,
        options: &MaterializeOptions,
    ) -> Result<()> {
        self.vst.materialize(*id, out_dir, options)
    }

    /// Every `SnapshotId` produced or recovered by this engine so far.
    #[must_use]
    pub fn snapshots(&self) -> Vec<SnapshotId> {
        self.vst.snapshots()
    }

    /// L1 cache counters, or the zero value if no L1 is attached.
    #[must_use]
    pub fn l1_stats(&self) -> L1Stats {
        self.l1.as_ref().map(|cache| cache.stats()).unwrap_or_default()
    }

    /// L2 store counters, or the zero value if no L2 is attached.
    #[must_use]
    pub fn l2_stats(&self) -> StoreStats {
        self.l2.as_ref().map(|store| store.stats()).unwrap_or_default()
    }

    /// A combined snapshot of L1 and commit-latency metrics, matching the
    /// shape an embedder would print as its `stats` output.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            l1: self.l1_stats(),
            engine: self.vst.metrics_snapshot(),
        }
    }

    /// Flushes and releases the attached L2 store, if any. Idempotent.
    /// After this call, operations touching L2 fail with
    /// [`Error::StoreClosed`](crate::Error::StoreClosed).
    pub fn close(&self) {
        if let Some(store) = &self.l2 {
            store.close();
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.close();
    }
}
