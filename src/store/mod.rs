// Copyright (c) 2024-present, helios-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The L2 object store: durable, content-addressed byte storage with
//! all-or-nothing batching.
//!
//! An object's visibility is gated entirely by the [`manifest`]: object
//! content files are written to disk (atomically, per file) before the
//! manifest is updated, so a crash between writing files and swapping the
//! manifest leaves those files as orphans, invisible to `get`/`exists` and
//! removed on the next [`Store::open`].
//!
//! # Examples
//!
//! ```
//! use helios_engine::store::{Store, StoreOptions};
//! use helios_engine::hash::hash_blob;
//! # let dir = tempfile::tempdir()?;
//!
//! let store = Store::open(dir.path(), StoreOptions::new())?;
//! let digest = hash_blob(b"hello");
//! store.put_batch(vec![(digest, Some(b"hello".to_vec()))])?;
//! assert_eq!(store.get(digest)?, Some(b"hello".to_vec()));
//! # Ok::<(), helios_engine::Error>(())
//! ```

mod manifest;

use crate::checksum::Checksum;
use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::fs::StdFileSystem;
use crate::stop_signal::StopSignal;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use manifest::Manifest;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

pub use crate::config::StoreOptions;

/// A snapshot of L2's size and object count.
#[derive(Clone, Copy, Debug, Default, serde::Serialize)]
pub struct StoreStats {
    /// Number of live objects.
    pub object_count: u64,
    /// Total on-disk bytes across all live objects (content only, excluding
    /// the checksum header).
    pub total_bytes: u64,
}

/// Durable, content-addressed object store with atomic multi-put.
pub struct Store {
    root_dir: PathBuf,
    manifest: Manifest,
    options: StoreOptions,
    stop: StopSignal,
    total_bytes: AtomicU64,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("root_dir", &self.root_dir)
            .field("closed", &self.stop.is_stopped())
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Opens (or initializes) a store rooted at `path`, creating directories
    /// as needed and cleaning up any orphaned object files left behind by an
    /// interrupted batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory cannot be created or read.
    pub fn open(path: &Path, options: StoreOptions) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        log::info!("Opening L2 store at {}", path.display());

        let manifest = Manifest::open(path)?;
        let live_keys = manifest.live_keys();

        remove_orphaned_objects(path, &live_keys)?;

        let total_bytes = sum_live_object_bytes(path, &live_keys)?;

        Ok(Self {
            root_dir: path.to_path_buf(),
            manifest,
            options,
            stop: StopSignal::default(),
            total_bytes: AtomicU64::new(total_bytes),
        })
    }

    /// Writes every entry atomically: either all are durably visible to
    /// subsequent reads, or none are.
    ///
    /// Each entry is `(digest, Some(bytes))` for data to store, or
    /// `(digest, None)` — the `nil` sentinel — which is always rejected
    /// during preflight, before any file is touched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if any entry is `None` (preflight).
    /// Returns [`Error::StoreClosed`] if the store has been closed.
    /// Returns [`Error::Io`] on underlying filesystem failure; in that case
    /// the store is left exactly as it was before the call.
    pub fn put_batch(&self, entries: Vec<(Digest, Option<Vec<u8>>)>) -> Result<()> {
        self.ensure_open()?;

        if entries.iter().any(|(_, bytes)| bytes.is_none()) {
            log::warn!("Rejecting L2 batch containing a nil value");
            return Err(Error::InvalidInput(
                "put_batch entry had a nil (absent) value".to_string(),
            ));
        }

        log::trace!("Writing L2 batch of {} entries", entries.len());

        let mut new_bytes = 0u64;

        for (digest, bytes) in &entries {
            #[allow(clippy::expect_used)]
            let bytes = bytes.as_ref().expect("checked for None above");
            self.write_object_file(*digest, bytes)?;
            // A digest already live before this batch is a repeated/idempotent
            // put: the file on disk is rewritten with identical bytes, but it
            // contributes no *new* live bytes to the store.
            if !self.manifest.contains(&digest.to_key_string()) {
                new_bytes += bytes.len() as u64;
            }
        }

        let digests: Vec<Digest> = entries.into_iter().map(|(digest, _)| digest).collect();
        self.manifest.register(digests)?;

        self.total_bytes.fetch_add(new_bytes, Relaxed);

        Ok(())
    }

    /// Returns the bytes stored under `digest`, or `None` if it is not live.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreClosed`] if the store has been closed.
    /// Returns [`Error::Integrity`] if the stored checksum does not match
    /// the bytes read from disk (only checked when
    /// [`StoreOptions::verify_checksums_on_read`] is enabled).
    /// Returns [`Error::Io`] on underlying filesystem damage.
    pub fn get(&self, digest: Digest) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;

        if !self.manifest.contains(&digest.to_key_string()) {
            return Ok(None);
        }

        let path = self.object_path(digest);
        let raw = std::fs::read(&path)?;

        if raw.len() < 16 {
            return Err(Error::Integrity(format!(
                "object file for {} is shorter than its checksum header",
                digest.to_key_string()
            )));
        }

        let (mut header, body) = (&raw[..16], &raw[16..]);
        let stored_checksum = Checksum::from_raw(header.read_u128::<LittleEndian>()?);

        if self.options.verify_checksums_on_read {
            stored_checksum.verify(body)?;
        }

        Ok(Some(body.to_vec()))
    }

    /// Fast membership test; does not read or return the value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreClosed`] if the store has been closed.
    pub fn exists(&self, digest: Digest) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.manifest.contains(&digest.to_key_string()))
    }

    /// Returns the current object count and on-disk byte total.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            object_count: self.manifest.len() as u64,
            total_bytes: self.total_bytes.load(Relaxed),
        }
    }

    /// Flushes and releases resources. Idempotent: safe to call any number
    /// of times, from any thread.
    pub fn close(&self) {
        if !self.stop.is_stopped() {
            log::info!("Closing L2 store at {}", self.root_dir.display());
        }
        self.stop.send();
    }

    fn ensure_open(&self) -> Result<()> {
        if self.stop.is_stopped() {
            return Err(Error::StoreClosed);
        }
        Ok(())
    }

    fn object_path(&self, digest: Digest) -> PathBuf {
        let hex = digest.to_hex();
        let (prefix, _) = hex.split_at(2);
        self.root_dir.join(prefix).join(format!("{hex}.obj"))
    }

    fn write_object_file(&self, digest: Digest, bytes: &[u8]) -> Result<()> {
        let path = self.object_path(digest);

        #[allow(clippy::expect_used)]
        let folder = path.parent().expect("object path always has a parent");
        std::fs::create_dir_all(folder)?;

        let checksum = Checksum::of(bytes);

        let mut content = Vec::with_capacity(16 + bytes.len());
        content.write_u128::<LittleEndian>(checksum.into_u128())?;
        content.write_all(bytes)?;

        crate::file::rewrite_atomic::<StdFileSystem>(&path, &content)?;

        Ok(())
    }
}

fn remove_orphaned_objects(
    root_dir: &Path,
    live_keys: &std::collections::BTreeSet<String>,
) -> std::io::Result<()> {
    let live_hexes: std::collections::HashSet<String> = live_keys
        .iter()
        .filter_map(|key| Digest::from_key_string(key))
        .map(Digest::to_hex)
        .collect();

    for prefix_entry in std::fs::read_dir(root_dir)? {
        let prefix_entry = prefix_entry?;
        if !prefix_entry.file_type()?.is_dir() {
            continue;
        }

        for file_entry in std::fs::read_dir(prefix_entry.path())? {
            let file_entry = file_entry?;
            let file_name = file_entry.file_name();
            let file_name = file_name.to_string_lossy();

            let Some(hex) = file_name.strip_suffix(".obj") else {
                continue;
            };

            if !live_hexes.contains(hex) {
                log::trace!("Deleting orphaned L2 object file {file_name}");
                std::fs::remove_file(file_entry.path())?;
            }
        }
    }

    Ok(())
}

fn sum_live_object_bytes(
    root_dir: &Path,
    live_keys: &std::collections::BTreeSet<String>,
) -> std::io::Result<u64> {
    let mut total = 0u64;

    for key in live_keys {
        let Some(digest) = Digest::from_key_string(key) else {
            continue;
        };

        let hex = digest.to_hex();
        let (prefix, _) = hex.split_at(2);
        let path = root_dir.join(prefix).join(format!("{hex}.obj"));

        if let Ok(metadata) = std::fs::metadata(&path) {
            total += metadata.len().saturating_sub(16);
        }
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_blob;
    use test_log::test;

    #[test]
    fn put_then_get_roundtrips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::open(dir.path(), StoreOptions::new()).expect("open");

        let digest = hash_blob(b"alpha");
        store
            .put_batch(vec![(digest, Some(b"alpha".to_vec()))])
            .expect("put_batch");

        assert_eq!(store.get(digest).expect("get"), Some(b"alpha".to_vec()));
        assert!(store.exists(digest).expect("exists"));
    }

    #[test]
    fn nil_entry_rejects_whole_batch_without_side_effects() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::open(dir.path(), StoreOptions::new()).expect("open");

        let h1 = hash_blob(b"alpha");
        let h2 = hash_blob(b"beta");

        let result = store.put_batch(vec![(h1, Some(b"alpha".to_vec())), (h2, None)]);
        assert!(result.is_err());

        assert_eq!(store.get(h1).expect("get"), None);
        assert_eq!(store.get(h2).expect("get"), None);
    }

    #[test]
    fn repeated_put_of_same_digest_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::open(dir.path(), StoreOptions::new()).expect("open");

        let digest = hash_blob(b"stable");
        store
            .put_batch(vec![(digest, Some(b"stable".to_vec()))])
            .expect("first put");
        store
            .put_batch(vec![(digest, Some(b"stable".to_vec()))])
            .expect("second put");

        assert_eq!(store.get(digest).expect("get"), Some(b"stable".to_vec()));
    }

    #[test]
    fn repeated_put_does_not_double_count_total_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::open(dir.path(), StoreOptions::new()).expect("open");

        let digest = hash_blob(b"stable");
        store
            .put_batch(vec![(digest, Some(b"stable".to_vec()))])
            .expect("first put");

        let after_first = store.stats();
        assert_eq!(after_first.object_count, 1);
        assert_eq!(after_first.total_bytes, 6);

        // An idempotent re-put of an already-live digest (as happens when a
        // second process recommits identical content) must not inflate
        // total_bytes, even though the object file is rewritten to disk.
        store
            .put_batch(vec![(digest, Some(b"stable".to_vec()))])
            .expect("second put");

        let after_second = store.stats();
        assert_eq!(after_second.object_count, 1);
        assert_eq!(after_second.total_bytes, 6);
    }

    #[test]
    fn close_is_idempotent_and_rejects_subsequent_ops() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::open(dir.path(), StoreOptions::new()).expect("open");

        store.close();
        store.close();
        store.close();

        let digest = hash_blob(b"after close");
        assert!(matches!(
            store.put_batch(vec![(digest, Some(b"x".to_vec()))]),
            Err(Error::StoreClosed)
        ));
        assert!(matches!(store.get(digest), Err(Error::StoreClosed)));
    }

    #[test]
    fn store_survives_reopen_across_processes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let digest = hash_blob(b"durable");

        {
            let store = Store::open(dir.path(), StoreOptions::new()).expect("open");
            store
                .put_batch(vec![(digest, Some(b"durable".to_vec()))])
                .expect("put_batch");
        }

        let reopened = Store::open(dir.path(), StoreOptions::new()).expect("reopen");
        assert_eq!(
            reopened.get(digest).expect("get"),
            Some(b"durable".to_vec())
        );
        assert_eq!(reopened.stats().object_count, 1);
    }

    #[test]
    fn corrupted_object_bytes_surface_as_integrity_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let digest = hash_blob(b"original");

        let store = Store::open(dir.path(), StoreOptions::new()).expect("open");
        store
            .put_batch(vec![(digest, Some(b"original".to_vec()))])
            .expect("put_batch");

        let hex = digest.to_hex();
        let (prefix, _) = hex.split_at(2);
        let path = dir.path().join(prefix).join(format!("{hex}.obj"));

        let mut bytes = std::fs::read(&path).expect("read object file");
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, bytes).expect("corrupt object file");

        assert!(matches!(store.get(digest), Err(Error::Integrity(_))));
    }
}
