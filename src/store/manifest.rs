// Copyright (c) 2024-present, helios-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The L2 manifest: the single source of truth for which digests are live.
//!
//! Mirrors the segment-manifest pattern used elsewhere in this codebase: an
//! in-memory copy guarded by a lock, atomically rewritten to disk via
//! [`crate::file::rewrite_atomic`] on every mutation. A digest is "live" iff
//! it is listed here; an object file present on disk but absent from the
//! manifest is an orphan from an interrupted batch and is discarded on the
//! next [`recover`](Manifest::recover).

use crate::digest::Digest;
use crate::fs::StdFileSystem;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub const MANIFEST_FILE: &str = "manifest";

/// The live-digest set backing an L2 [`Store`](super::Store).
pub struct Manifest {
    path: PathBuf,
    keys: RwLock<BTreeSet<String>>,
}

impl Manifest {
    /// Loads an existing manifest file, or creates an empty one if absent.
    pub(super) fn open(dir: &Path) -> std::io::Result<Self> {
        let path = dir.join(MANIFEST_FILE);

        let keys = if path.exists() {
            load_from_disk(&path)?
        } else {
            write_to_disk(&path, &BTreeSet::new())?;
            BTreeSet::new()
        };

        Ok(Self {
            path,
            keys: RwLock::new(keys),
        })
    }

    /// Returns `true` if `key` is currently live.
    #[allow(clippy::expect_used)]
    pub(super) fn contains(&self, key: &str) -> bool {
        self.keys.read().expect("manifest lock poisoned").contains(key)
    }

    /// Returns a snapshot of all live keys.
    #[allow(clippy::expect_used)]
    pub(super) fn live_keys(&self) -> BTreeSet<String> {
        self.keys.read().expect("manifest lock poisoned").clone()
    }

    /// Number of live keys.
    #[allow(clippy::expect_used)]
    pub(super) fn len(&self) -> usize {
        self.keys.read().expect("manifest lock poisoned").len()
    }

    /// Atomically adds `new_keys` to the live set and persists the result.
    ///
    /// On I/O failure the in-memory set is left unchanged: the working copy
    /// is only swapped in after a successful disk write.
    #[allow(clippy::expect_used)]
    pub(super) fn register(&self, new_keys: impl IntoIterator<Item = Digest>) -> std::io::Result<()> {
        let mut current = self.keys.write().expect("manifest lock poisoned");

        let mut working_copy = current.clone();
        for digest in new_keys {
            working_copy.insert(digest.to_key_string());
        }

        write_to_disk(&self.path, &working_copy)?;
        *current = working_copy;

        Ok(())
    }
}

fn write_to_disk(path: &Path, keys: &BTreeSet<String>) -> std::io::Result<()> {
    let mut bytes = Vec::new();
    bytes.write_u64::<BigEndian>(keys.len() as u64)?;

    for key in keys {
        let raw = key.as_bytes();
        bytes.write_u32::<BigEndian>(raw.len() as u32)?;
        bytes.extend_from_slice(raw);
    }

    crate::file::rewrite_atomic::<StdFileSystem>(path, &bytes)?;

    log::trace!("Swapped L2 manifest to {} live keys", keys.len());

    Ok(())
}

fn load_from_disk(path: &Path) -> std::io::Result<BTreeSet<String>> {
    log::debug!("Loading L2 manifest from {}", path.display());

    let bytes = std::fs::read(path)?;
    let mut cursor = Cursor::new(bytes);

    let count = cursor.read_u64::<BigEndian>()?;
    let mut keys = BTreeSet::new();

    for _ in 0..count {
        let len = cursor.read_u32::<BigEndian>()? as usize;
        let mut buf = vec![0u8; len];
        std::io::Read::read_exact(&mut cursor, &mut buf)?;

        let key = String::from_utf8(buf).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e)
        })?;
        keys.insert(key);
    }

    Ok(keys)
}
