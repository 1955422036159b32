// Copyright (c) 2024-present, helios-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The in-memory tree node shape used while building and walking a commit,
//! plus its binary encoding for L1/L2 storage.

use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use crate::digest::{Digest, HashAlgorithm};
use crate::hash::EntryKind;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// One child of a [`TreeNode`]: a name plus the kind and digest of the
/// entry it names.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TreeChild {
    /// The entry's name within this node (no separators).
    pub name: String,
    /// Whether the child is a blob or a subtree.
    pub kind: EntryKind,
    /// The content digest of the child.
    pub digest: Digest,
    /// Whether a blob child's executable bit was set when it was written.
    /// Always `false` for a `Tree` child. This rides along in the encoded
    /// node but, per the tree-hash formula, never participates in
    /// `hash_tree`'s input: two trees differing only in this bit still
    /// hash identically.
    pub executable: bool,
}

/// An immutable, ordered collection of directory entries.
///
/// Always stored with children sorted by name: this is the same order the
/// digest was computed over, so re-deriving the digest from a decoded node
/// round-trips.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TreeNode {
    /// Children, sorted by name.
    pub children: Vec<TreeChild>,
}

impl TreeNode {
    /// Whether this is an empty directory.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Encode for TreeNode {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_u32::<BigEndian>(self.children.len() as u32)?;

        for child in &self.children {
            let name_bytes = child.name.as_bytes();
            writer.write_u16::<BigEndian>(name_bytes.len() as u16)?;
            writer.write_all(name_bytes)?;

            let kind_tag = match child.kind {
                EntryKind::Blob => 0u8,
                EntryKind::Tree => 1u8,
            };
            writer.write_u8(kind_tag)?;

            let algo_tag = match child.digest.algorithm() {
                HashAlgorithm::Blake3 => 0u8,
                HashAlgorithm::Sha256 => 1u8,
            };
            writer.write_u8(algo_tag)?;
            writer.write_all(child.digest.as_bytes())?;
            writer.write_u8(u8::from(child.executable))?;
        }

        Ok(())
    }
}

impl Decode for TreeNode {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let count = reader.read_u32::<BigEndian>()?;
        let mut children = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let name_len = reader.read_u16::<BigEndian>()? as usize;
            let mut name_buf = vec![0u8; name_len];
            reader.read_exact(&mut name_buf)?;
            let name = String::from_utf8(name_buf)
                .map_err(|_| DecodeError::InvalidHeader("TreeNode child name not utf-8"))?;

            let kind = match reader.read_u8()? {
                0 => EntryKind::Blob,
                1 => EntryKind::Tree,
                tag => return Err(DecodeError::InvalidTag("TreeNode child kind", tag)),
            };

            let algorithm = match reader.read_u8()? {
                0 => HashAlgorithm::Blake3,
                1 => HashAlgorithm::Sha256,
                tag => return Err(DecodeError::InvalidTag("TreeNode child algorithm", tag)),
            };

            let mut digest_bytes = [0u8; 32];
            reader.read_exact(&mut digest_bytes)?;

            let executable = reader.read_u8()? != 0;

            children.push(TreeChild {
                name,
                kind,
                digest: Digest::new(algorithm, digest_bytes),
                executable,
            });
        }

        Ok(Self { children })
    }
}
