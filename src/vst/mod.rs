// Copyright (c) 2024-present, helios-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The Versioned State Tree: the working set and all snapshot operations
//! (`commit`, `restore`, `diff`, `materialize`).
//!
//! A [`Vst`] always works standalone: without attached stores, `commit`
//! still produces a valid in-memory snapshot graph and `restore`/
//! `materialize` can recover anything committed in the same process. An
//! attached [`L1Cache`](crate::cache::L1Cache) and/or
//! [`Store`](crate::store::Store), set via [`Vst::attach_stores`], add
//! cross-process acceleration and durability on top of that.

pub mod glob;
pub mod tree;

use crate::cache::L1Cache;
use crate::coding::{Decode, Encode};
use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::hash::{hash_blob, hash_tree, EntryKind, TreeEntry};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::store::Store;
use crate::vst::tree::{TreeChild, TreeNode};
use crossbeam_skiplist::SkipMap;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

/// The stringified root digest of a committed tree. Identical
/// working-directory contents always produce the same `SnapshotId`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct SnapshotId(Digest);

impl SnapshotId {
    /// The digest this id wraps.
    #[must_use]
    pub fn digest(self) -> Digest {
        self.0
    }
}

impl std::fmt::Debug for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SnapshotId({})", self.0.to_key_string())
    }
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_key_string())
    }
}

impl std::str::FromStr for SnapshotId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Digest::from_key_string(s)
            .map(Self)
            .ok_or_else(|| Error::InvalidInput(format!("malformed snapshot id: {s}")))
    }
}

/// The result of [`Vst::diff`]: paths present only in `to`, present in both
/// with differing digests, and present only in `from`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DiffResult {
    /// Paths present in `to` but not `from`.
    pub added: Vec<String>,
    /// Paths present in both, with different digests.
    pub changed: Vec<String>,
    /// Paths present in `from` but not `to`.
    pub deleted: Vec<String>,
}

impl DiffResult {
    /// `(added, changed, deleted)` counts, matching the external `{0,0,0}`
    /// shape used by the CLI collaborator.
    #[must_use]
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.added.len(), self.changed.len(), self.deleted.len())
    }
}

/// Include/exclude glob filters for [`Vst::materialize`].
#[derive(Clone, Debug, Default)]
pub struct MaterializeOptions {
    /// Patterns a path must match at least one of (empty means "all").
    pub include: Vec<String>,
    /// Patterns that exclude a path even if it matched `include`.
    pub exclude: Vec<String>,
}

impl MaterializeOptions {
    /// An empty filter set: everything is materialized.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the include patterns.
    #[must_use]
    pub fn include(mut self, patterns: Vec<String>) -> Self {
        self.include = patterns;
        self
    }

    /// Sets the exclude patterns.
    #[must_use]
    pub fn exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }
}

/// The working tree and snapshot manager.
pub struct Vst {
    // A lock-free skiplist, same structure fjall's memtable uses for its
    // actively-written content: writes and commits can proceed without
    // contending on a single global lock.
    working_set: SkipMap<String, (Vec<u8>, bool)>,
    path_digest: RwLock<HashMap<String, Digest>>,
    local_objects: Mutex<HashMap<Digest, Vec<u8>>>,
    snapshot_ids: Mutex<HashSet<SnapshotId>>,
    l1: Mutex<Option<Arc<L1Cache>>>,
    l2: Mutex<Option<Arc<Store>>>,
    metrics: Metrics,
}

impl std::fmt::Debug for Vst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vst")
            .field("working_set_files", &self.working_set.len())
            .finish_non_exhaustive()
    }
}

impl Default for Vst {
    fn default() -> Self {
        Self::new()
    }
}

impl Vst {
    /// Creates an empty working set with no attached stores.
    #[must_use]
    pub fn new() -> Self {
        Self {
            working_set: SkipMap::new(),
            path_digest: RwLock::new(HashMap::new()),
            local_objects: Mutex::new(HashMap::new()),
            snapshot_ids: Mutex::new(HashSet::new()),
            l1: Mutex::new(None),
            l2: Mutex::new(None),
            metrics: Metrics::new(),
        }
    }

    /// Attaches (or detaches, by passing `None`) an L1 cache and/or L2
    /// store. Safe to call at any time; takes effect for subsequent
    /// operations.
    pub fn attach_stores(&self, l1: Option<Arc<L1Cache>>, l2: Option<Arc<Store>>) {
        #[allow(clippy::expect_used)]
        {
            *self.l1.lock().expect("l1 slot lock poisoned") = l1;
            *self.l2.lock().expect("l2 slot lock poisoned") = l2;
        }
    }

    /// Returns every `SnapshotId` produced (by `commit`) or recovered (by
    /// `restore`) in this process.
    #[must_use]
    pub fn snapshots(&self) -> Vec<SnapshotId> {
        #[allow(clippy::expect_used)]
        self.snapshot_ids
            .lock()
            .expect("snapshot table lock poisoned")
            .iter()
            .copied()
            .collect()
    }

    /// A read-only view of the engine's commit-latency metrics.
    #[must_use]
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Normalizes `path` to forward slashes, stores `bytes`, and
    /// invalidates any cached `path → digest` entry for it. The file is
    /// recorded as non-executable; use [`Self::write_file_with_mode`] to
    /// set the executable bit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `path` is empty, traverses
    /// upward (`..`), or enters the reserved metadata directory.
    pub fn write_file(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        self.write_file_with_mode(path, bytes, false)
    }

    /// Like [`Self::write_file`], additionally recording whether `path`
    /// should be materialized with the executable bit set. This is the
    /// only file permission the working set tracks; other POSIX metadata
    /// (ownership, arbitrary mode bits, xattrs) is intentionally not
    /// preserved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `path` is empty, traverses
    /// upward (`..`), or enters the reserved metadata directory.
    pub fn write_file_with_mode(&self, path: &str, bytes: Vec<u8>, executable: bool) -> Result<()> {
        let path = normalize_path(path)?;

        self.working_set.insert(path.clone(), (bytes, executable));

        #[allow(clippy::expect_used)]
        self.path_digest
            .write()
            .expect("path digest lock poisoned")
            .remove(&path);

        Ok(())
    }

    /// Returns a copy of the bytes at `path`.
    ///
    /// Checks the working set first, then the `path → digest` index
    /// (probing L1, then L2 — promoting into L1 on an L2 hit). Returns
    /// `None` if neither knows the path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`]/[`Error::Integrity`] if an attached store
    /// fails while resolving a known digest.
    pub fn read_file(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let path = normalize_path(path)?;

        if let Some(entry) = self.working_set.get(&path) {
            return Ok(Some(entry.value().0.clone()));
        }

        #[allow(clippy::expect_used)]
        let digest = self
            .path_digest
            .read()
            .expect("path digest lock poisoned")
            .get(&path)
            .copied();

        let Some(digest) = digest else {
            return Ok(None);
        };

        self.resolve_object(digest)
    }

    /// Removes `path` from the working set and the `path → digest` index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a malformed path.
    pub fn delete_file(&self, path: &str) -> Result<()> {
        let path = normalize_path(path)?;

        self.working_set.remove(&path);

        #[allow(clippy::expect_used)]
        self.path_digest.write().expect("path digest lock poisoned").remove(&path);

        Ok(())
    }

    /// Builds a Merkle tree from the current working set, stages every new
    /// blob/tree-node to the attached stores in one atomic batch, and
    /// publishes the new `SnapshotId`.
    ///
    /// `message` is accepted (matching the external `commit` operation's
    /// input) but is not persisted anywhere in this crate; it exists for
    /// the caller's own logging.
    ///
    /// # Errors
    ///
    /// Returns an error (propagated from the attached L2 store) if the
    /// batch write fails. On failure, no `SnapshotId` is returned and the
    /// working set is unaffected.
    pub fn commit(&self, message: Option<&str>) -> Result<(SnapshotId, MetricsSnapshot)> {
        if let Some(message) = message {
            log::debug!("Committing with message: {message}");
        }

        let start = Instant::now();

        let entries: Vec<(String, Vec<u8>, bool)> = self
            .working_set
            .iter()
            .map(|entry| {
                let (bytes, executable) = entry.value();
                (entry.key().clone(), bytes.clone(), *executable)
            })
            .collect();

        let mut staged: HashMap<Digest, (Vec<u8>, EntryKind)> = HashMap::new();
        let mut file_digests: HashMap<String, Digest> = HashMap::new();

        let root = build_tree(&entries, &mut staged, &mut file_digests)?;

        let (new_entries, new_bytes): (Vec<(Digest, Vec<u8>)>, u64) = {
            #[allow(clippy::expect_used)]
            let local = self.local_objects.lock().expect("local objects lock poisoned");

            let mut fresh = Vec::new();
            let mut total_bytes = 0u64;

            for (digest, (bytes, _kind)) in &staged {
                if !local.contains_key(digest) {
                    total_bytes += bytes.len() as u64;
                    fresh.push((*digest, bytes.clone()));
                }
            }

            (fresh, total_bytes)
        };

        #[allow(clippy::expect_used)]
        let l2 = self.l2.lock().expect("l2 slot lock poisoned").clone();
        if let Some(store) = &l2 {
            let batch = new_entries
                .iter()
                .map(|(digest, bytes)| (*digest, Some(bytes.clone())))
                .collect();
            store.put_batch(batch)?;
        }

        #[allow(clippy::expect_used)]
        {
            let mut local = self.local_objects.lock().expect("local objects lock poisoned");
            for (digest, bytes) in &new_entries {
                local.insert(*digest, bytes.clone());
            }
        }

        #[allow(clippy::expect_used)]
        let l1 = self.l1.lock().expect("l1 slot lock poisoned").clone();
        if let Some(cache) = &l1 {
            for (digest, bytes) in &new_entries {
                cache.put(*digest, bytes.clone());
            }
        }

        #[allow(clippy::expect_used)]
        {
            *self.path_digest.write().expect("path digest lock poisoned") = file_digests;
        }

        let snapshot_id = SnapshotId(root);

        #[allow(clippy::expect_used)]
        self.snapshot_ids
            .lock()
            .expect("snapshot table lock poisoned")
            .insert(snapshot_id);

        self.metrics.observe(start.elapsed());
        self.metrics.add_new_objects(new_entries.len() as u64);
        self.metrics.add_new_bytes(new_bytes);

        log::debug!(
            "Committed snapshot {snapshot_id} ({} objects, {} new, {:?} elapsed)",
            staged.len(),
            new_entries.len(),
            start.elapsed()
        );

        Ok((snapshot_id, self.metrics.snapshot()))
    }

    /// Loads the tree rooted at `id`, recursively expands it, and replaces
    /// the working set with its contents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the root (or any referenced child) is
    /// not resolvable via the in-process object graph or attached stores.
    pub fn restore(&self, id: SnapshotId) -> Result<()> {
        log::info!("Restoring snapshot {id}");

        let files = self.collect_files(id.digest())?;

        let mut path_digest = HashMap::with_capacity(files.len());

        self.working_set.clear();
        for (path, bytes, digest, executable) in files {
            self.working_set.insert(path.clone(), (bytes, executable));
            path_digest.insert(path, digest);
        }

        #[allow(clippy::expect_used)]
        {
            *self.path_digest.write().expect("path digest lock poisoned") = path_digest;
        }

        #[allow(clippy::expect_used)]
        self.snapshot_ids
            .lock()
            .expect("snapshot table lock poisoned")
            .insert(id);

        Ok(())
    }

    /// Compares two committed trees by path. Two entries at the same path
    /// are unchanged iff their digests match, changed iff both present
    /// with different digests, added iff only in `to`, deleted iff only in
    /// `from`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if either root is unresolvable.
    pub fn diff(&self, from: SnapshotId, to: SnapshotId) -> Result<DiffResult> {
        let from_digests = self.collect_digests(from.digest())?;
        let to_digests = self.collect_digests(to.digest())?;

        let mut result = DiffResult::default();

        for (path, to_digest) in &to_digests {
            match from_digests.get(path) {
                None => result.added.push(path.clone()),
                Some(from_digest) if from_digest != to_digest => result.changed.push(path.clone()),
                Some(_) => {}
            }
        }

        for path in from_digests.keys() {
            if !to_digests.contains_key(path) {
                result.deleted.push(path.clone());
            }
        }

        result.added.sort();
        result.changed.sort();
        result.deleted.sort();

        Ok(result)
    }

    /// Walks the tree for `id` and writes each file blob to `out_dir/path`,
    /// filtered by `options`. Creates intermediate directories. Never
    /// writes outside `out_dir`, regardless of path contents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `id` is unresolvable, or
    /// [`Error::Io`] on a filesystem failure.
    pub fn materialize(
        &self,
        id: SnapshotId,
        out_dir: &Path,
        options: &MaterializeOptions,
    ) -> Result<()> {
        log::info!("Materializing snapshot {id} to {}", out_dir.display());

        let files = self.collect_files(id.digest())?;

        std::fs::create_dir_all(out_dir)?;

        for (path, bytes, _digest, executable) in files {
            if !glob::is_selected(&path, &options.include, &options.exclude) {
                continue;
            }

            let target = safe_join(out_dir, &path)?;

            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }

            std::fs::write(&target, bytes)?;
            set_executable(&target, executable)?;
        }

        Ok(())
    }

    /// Resolves `digest` to bytes via the local object graph, then L1, then
    /// L2 (promoting an L2 hit into L1). Returns `Ok(None)` only when every
    /// tier misses.
    fn resolve_object(&self, digest: Digest) -> Result<Option<Vec<u8>>> {
        #[allow(clippy::expect_used)]
        if let Some(bytes) = self
            .local_objects
            .lock()
            .expect("local objects lock poisoned")
            .get(&digest)
        {
            return Ok(Some(bytes.clone()));
        }

        #[allow(clippy::expect_used)]
        let l1 = self.l1.lock().expect("l1 slot lock poisoned").clone();
        if let Some(cache) = &l1 {
            if let Some(bytes) = cache.get(digest) {
                return Ok(Some(bytes));
            }
        }

        #[allow(clippy::expect_used)]
        let l2 = self.l2.lock().expect("l2 slot lock poisoned").clone();
        if let Some(store) = &l2 {
            if let Some(bytes) = store.get(digest)? {
                if let Some(cache) = &l1 {
                    cache.put(digest, bytes.clone());
                }
                return Ok(Some(bytes));
            }
        }

        Ok(None)
    }

    /// Resolves and decodes the tree node at `digest`.
    fn resolve_tree_node(&self, digest: Digest) -> Result<TreeNode> {
        let Some(bytes) = self.resolve_object(digest)? else {
            return Err(Error::NotFound(format!(
                "tree node {} not resolvable",
                digest.to_key_string()
            )));
        };

        TreeNode::decode_from(&mut bytes.as_slice()).map_err(Error::from)
    }

    /// Recursively walks the tree at `digest`, returning every file's
    /// `(path, bytes, blob_digest, executable)`, without mutating any `Vst`
    /// state.
    fn collect_files(&self, root: Digest) -> Result<Vec<(String, Vec<u8>, Digest, bool)>> {
        let mut out = Vec::new();
        self.walk_files(root, String::new(), &mut out)?;
        Ok(out)
    }

    fn walk_files(
        &self,
        digest: Digest,
        prefix: String,
        out: &mut Vec<(String, Vec<u8>, Digest, bool)>,
    ) -> Result<()> {
        let node = self.resolve_tree_node(digest)?;

        for child in node.children {
            let path = if prefix.is_empty() {
                child.name.clone()
            } else {
                format!("{prefix}/{}", child.name)
            };

            match child.kind {
                EntryKind::Blob => {
                    let Some(bytes) = self.resolve_object(child.digest)? else {
                        return Err(Error::NotFound(format!(
                            "blob {} not resolvable",
                            child.digest.to_key_string()
                        )));
                    };
                    out.push((path, bytes, child.digest, child.executable));
                }
                EntryKind::Tree => {
                    self.walk_files(child.digest, path, out)?;
                }
            }
        }

        Ok(())
    }

    /// Like [`Self::collect_files`], but only resolves tree-node bytes
    /// (never leaf blobs), returning `path → digest`.
    fn collect_digests(&self, root: Digest) -> Result<BTreeMap<String, Digest>> {
        let mut out = BTreeMap::new();
        self.walk_digests(root, String::new(), &mut out)?;
        Ok(out)
    }

    fn walk_digests(
        &self,
        digest: Digest,
        prefix: String,
        out: &mut BTreeMap<String, Digest>,
    ) -> Result<()> {
        let node = self.resolve_tree_node(digest)?;

        for child in node.children {
            let path = if prefix.is_empty() {
                child.name.clone()
            } else {
                format!("{prefix}/{}", child.name)
            };

            match child.kind {
                EntryKind::Blob => {
                    out.insert(path, child.digest);
                }
                EntryKind::Tree => {
                    self.walk_digests(child.digest, path, out)?;
                }
            }
        }

        Ok(())
    }
}

/// Builds a Merkle tree bottom-up from `entries`, staging every blob and
/// tree node it creates into `staged`, and recording each file's blob
/// digest into `file_digests`. Returns the root digest.
fn build_tree(
    entries: &[(String, Vec<u8>, bool)],
    staged: &mut HashMap<Digest, (Vec<u8>, EntryKind)>,
    file_digests: &mut HashMap<String, Digest>,
) -> Result<Digest> {
    enum Node {
        File(Vec<u8>, bool),
        Dir(BTreeMap<String, Node>),
    }

    let mut root: BTreeMap<String, Node> = BTreeMap::new();

    for (path, bytes, executable) in entries {
        let mut cursor = &mut root;
        let segments: Vec<&str> = path.split('/').collect();

        for (i, segment) in segments.iter().enumerate() {
            if i == segments.len() - 1 {
                if matches!(cursor.get(*segment), Some(Node::Dir(_))) {
                    return Err(Error::InvalidInput(format!(
                        "path {path} conflicts with a directory of the same name"
                    )));
                }
                cursor.insert((*segment).to_string(), Node::File(bytes.clone(), *executable));
            } else {
                let entry = cursor
                    .entry((*segment).to_string())
                    .or_insert_with(|| Node::Dir(BTreeMap::new()));
                let Node::Dir(next) = entry else {
                    return Err(Error::InvalidInput(format!(
                        "path {path} conflicts with a file of the same name"
                    )));
                };
                cursor = next;
            }
        }
    }

    fn hash_node(
        name_path: &str,
        node: &BTreeMap<String, Node>,
        staged: &mut HashMap<Digest, (Vec<u8>, EntryKind)>,
        file_digests: &mut HashMap<String, Digest>,
    ) -> Digest {
        let mut entries = Vec::with_capacity(node.len());

        for (name, child) in node {
            let child_path = if name_path.is_empty() {
                name.clone()
            } else {
                format!("{name_path}/{name}")
            };

            match child {
                Node::File(bytes, executable) => {
                    let digest = hash_blob(bytes);
                    staged.insert(digest, (bytes.clone(), EntryKind::Blob));
                    file_digests.insert(child_path, digest);
                    entries.push((name.clone(), EntryKind::Blob, digest, *executable));
                }
                Node::Dir(children) => {
                    let digest = hash_node(&child_path, children, staged, file_digests);
                    entries.push((name.clone(), EntryKind::Tree, digest, false));
                }
            }
        }

        let tree_entries: Vec<TreeEntry<'_>> = entries
            .iter()
            .map(|(name, kind, digest, _executable)| TreeEntry {
                name,
                kind: *kind,
                child_digest: *digest,
            })
            .collect();

        let digest = hash_tree(&tree_entries);

        let node = TreeNode {
            children: entries
                .into_iter()
                .map(|(name, kind, digest, executable)| TreeChild {
                    name,
                    kind,
                    digest,
                    executable,
                })
                .collect(),
        };
        staged.insert(digest, (node.encode_into_vec(), EntryKind::Tree));

        digest
    }

    Ok(hash_node("", &root, staged, file_digests))
}

/// Normalizes a working-set path: forward slashes, relative, no `..`
/// traversal, not entering the reserved metadata directory.
fn normalize_path(path: &str) -> Result<String> {
    let normalized = path.replace('\\', "/");

    let mut segments = Vec::new();
    for segment in normalized.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment == ".." {
            return Err(Error::InvalidInput(format!(
                "path must not traverse upward: {path}"
            )));
        }
        segments.push(segment);
    }

    if segments.is_empty() {
        return Err(Error::InvalidInput("path must not be empty".to_string()));
    }

    if segments[0] == crate::config::RESERVED_DIR {
        return Err(Error::InvalidInput(format!(
            "path must not enter the reserved directory: {path}"
        )));
    }

    Ok(segments.join("/"))
}

/// Joins `out_dir` with a (trusted-but-verified) relative `path`, refusing
/// to produce anything outside `out_dir`.
fn safe_join(out_dir: &Path, path: &str) -> Result<std::path::PathBuf> {
    let normalized = normalize_path(path)?;
    Ok(out_dir.join(normalized))
}

/// Sets the owner-executable bit on a freshly materialized file.
///
/// A no-op on platforms without POSIX permission bits, and on
/// `executable == false`: the file was just created with the platform's
/// default mode, so there is nothing further to preserve or clear.
#[cfg(unix)]
fn set_executable(path: &Path, executable: bool) -> Result<()> {
    use std::os::unix::fs::PermissionsExt as _;

    if !executable {
        return Ok(());
    }

    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o111);
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path, _executable: bool) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn write_then_read_round_trips() {
        let vst = Vst::new();
        vst.write_file("hello.txt", b"hi".to_vec()).expect("write");
        assert_eq!(vst.read_file("hello.txt").expect("read"), Some(b"hi".to_vec()));
    }

    #[test]
    fn delete_removes_from_working_set() {
        let vst = Vst::new();
        vst.write_file("a.txt", b"a".to_vec()).expect("write");
        vst.delete_file("a.txt").expect("delete");
        assert_eq!(vst.read_file("a.txt").expect("read"), None);
    }

    #[test]
    fn rejects_traversal_and_reserved_root() {
        let vst = Vst::new();
        assert!(vst.write_file("../escape.txt", b"x".to_vec()).is_err());
        assert!(vst.write_file(".helios/secret", b"x".to_vec()).is_err());
        assert!(vst.write_file("", b"x".to_vec()).is_err());
    }

    #[test]
    fn commit_without_stores_still_supports_restore() {
        let vst = Vst::new();
        vst.write_file("hello.txt", b"hi".to_vec()).expect("write");
        vst.write_file("dir/a.txt", b"A".to_vec()).expect("write");

        let (id1, _) = vst.commit(None).expect("commit");

        vst.write_file("hello.txt", b"hello".to_vec()).expect("write");
        let (id2, _) = vst.commit(None).expect("commit");

        assert_ne!(id1, id2);

        vst.restore(id1).expect("restore");
        assert_eq!(vst.read_file("hello.txt").expect("read"), Some(b"hi".to_vec()));
        assert_eq!(vst.read_file("dir/a.txt").expect("read"), Some(b"A".to_vec()));
    }

    #[test]
    fn commit_is_deterministic_under_insertion_order() {
        let a = Vst::new();
        a.write_file("src/main.go", b"package main".to_vec()).expect("write");
        a.write_file("README.md", b"# Project".to_vec()).expect("write");
        a.write_file("config.yaml", b"key: value".to_vec()).expect("write");
        let (id1, _) = a.commit(None).expect("commit");

        let b = Vst::new();
        b.write_file("config.yaml", b"key: value".to_vec()).expect("write");
        b.write_file("src/main.go", b"package main".to_vec()).expect("write");
        b.write_file("README.md", b"# Project".to_vec()).expect("write");
        let (id2, _) = b.commit(None).expect("commit");

        assert_eq!(id1, id2);
    }

    #[test]
    fn diff_self_is_empty() {
        let vst = Vst::new();
        vst.write_file("a.txt", b"a".to_vec()).expect("write");
        let (id, _) = vst.commit(None).expect("commit");

        let diff = vst.diff(id, id).expect("diff");
        assert_eq!(diff.counts(), (0, 0, 0));
    }

    #[test]
    fn diff_detects_added_changed_deleted() {
        let vst = Vst::new();
        vst.write_file("keep.txt", b"same".to_vec()).expect("write");
        vst.write_file("change.txt", b"before".to_vec()).expect("write");
        vst.write_file("remove.txt", b"gone soon".to_vec()).expect("write");
        let (id1, _) = vst.commit(None).expect("commit");

        vst.write_file("change.txt", b"after".to_vec()).expect("write");
        vst.delete_file("remove.txt").expect("delete");
        vst.write_file("new.txt", b"fresh".to_vec()).expect("write");
        let (id2, _) = vst.commit(None).expect("commit");

        let diff = vst.diff(id1, id2).expect("diff");
        assert_eq!(diff.added, vec!["new.txt".to_string()]);
        assert_eq!(diff.changed, vec!["change.txt".to_string()]);
        assert_eq!(diff.deleted, vec!["remove.txt".to_string()]);
    }

    #[test]
    fn restore_then_recommit_reproduces_id() {
        let vst = Vst::new();
        vst.write_file("a.txt", b"a".to_vec()).expect("write");
        vst.write_file("b.txt", b"b".to_vec()).expect("write");
        let (id, _) = vst.commit(None).expect("commit");

        vst.write_file("a.txt", b"mutated".to_vec()).expect("write");
        vst.restore(id).expect("restore");

        let (id_again, _) = vst.commit(None).expect("commit");
        assert_eq!(id, id_again);
    }

    #[test]
    fn materialize_writes_files_respecting_filters() {
        let vst = Vst::new();
        vst.write_file("src/main.rs", b"fn main() {}".to_vec()).expect("write");
        vst.write_file("README.md", b"hi".to_vec()).expect("write");
        let (id, _) = vst.commit(None).expect("commit");

        let out = tempfile::tempdir().expect("tempdir");
        let options = MaterializeOptions::new().include(vec!["src/**".to_string()]);
        vst.materialize(id, out.path(), &options).expect("materialize");

        assert!(out.path().join("src/main.rs").exists());
        assert!(!out.path().join("README.md").exists());
    }

    #[test]
    fn commit_rejects_file_directory_name_collision() {
        let vst = Vst::new();
        vst.write_file("a", b"file".to_vec()).expect("write");
        vst.write_file("a/b", b"nested".to_vec()).expect("write");

        assert!(vst.commit(None).is_err());
    }

    #[test]
    fn materialize_never_escapes_out_dir() {
        let out_dir = Path::new("/tmp/helios-materialize-target");
        let result = safe_join(out_dir, "../../etc/passwd");
        assert!(result.is_err());
    }

    #[test]
    fn executable_bit_does_not_affect_snapshot_id() {
        let plain = Vst::new();
        plain.write_file("run.sh", b"#!/bin/sh\necho hi".to_vec()).expect("write");
        let (plain_id, _) = plain.commit(None).expect("commit");

        let executable = Vst::new();
        executable
            .write_file_with_mode("run.sh", b"#!/bin/sh\necho hi".to_vec(), true)
            .expect("write");
        let (executable_id, _) = executable.commit(None).expect("commit");

        assert_eq!(plain_id, executable_id);
    }

    #[cfg(unix)]
    #[test]
    fn materialize_preserves_executable_bit() {
        use std::os::unix::fs::PermissionsExt as _;

        let vst = Vst::new();
        vst.write_file_with_mode("run.sh", b"#!/bin/sh\necho hi".to_vec(), true)
            .expect("write");
        vst.write_file("README.md", b"not executable".to_vec()).expect("write");
        let (id, _) = vst.commit(None).expect("commit");

        let out = tempfile::tempdir().expect("tempdir");
        vst.materialize(id, out.path(), &MaterializeOptions::new())
            .expect("materialize");

        let script_mode = std::fs::metadata(out.path().join("run.sh"))
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(script_mode & 0o111, 0o111);

        let readme_mode = std::fs::metadata(out.path().join("README.md"))
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(readme_mode & 0o111, 0);
    }
}
