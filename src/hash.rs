// Copyright (c) 2024-present, helios-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Deterministic content hashing: bytes in, [`Digest`] out.
//!
//! Both functions are pure and thread-safe; BLAKE3 itself has no shared state.

use crate::digest::{Digest, HashAlgorithm};

/// The kind of a tree entry, used in the sorted tree-hash encoding.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EntryKind {
    /// A regular file blob.
    Blob,
    /// A subdirectory tree node.
    Tree,
}

impl EntryKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
        }
    }
}

/// One entry in a tree node's encoding, prior to hashing.
#[derive(Clone, Debug)]
pub struct TreeEntry<'a> {
    /// The entry's name within its parent directory (no separators).
    pub name: &'a str,
    /// Whether this entry names a blob or a subtree.
    pub kind: EntryKind,
    /// The content digest of the entry (blob digest or subtree root digest).
    pub child_digest: Digest,
}

/// Hashes a blob's raw bytes.
///
/// Zero-length input is valid and produces a well-defined digest (BLAKE3's
/// hash of the empty string).
#[must_use]
pub fn hash_blob(bytes: &[u8]) -> Digest {
    let hash = blake3::hash(bytes);
    Digest::new(HashAlgorithm::Blake3, *hash.as_bytes())
}

/// Hashes a tree node's entries.
///
/// `entries` is sorted lexicographically by name, each encoded as
/// `"name:kind:hex(child_digest)"`, joined with `"\n"`, then hashed as a
/// single byte string. Sorting is mandatory: two tree nodes with identical
/// entries in different insertion orders must hash identically.
#[must_use]
pub fn hash_tree(entries: &[TreeEntry<'_>]) -> Digest {
    let mut sorted: Vec<&TreeEntry<'_>> = entries.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(b.name));

    let encoded = sorted
        .iter()
        .map(|entry| {
            format!(
                "{}:{}:{}",
                entry.name,
                entry.kind.as_str(),
                entry.child_digest.to_hex()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    hash_blob(encoded.as_bytes())
}
