// Copyright (c) 2024-present, helios-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! On-disk integrity checksums for L2 object bytes.
//!
//! This is independent of the BLAKE3 content digest that identifies an
//! object: the digest is identity, the checksum guards against bit rot or a
//! truncated write corrupting bytes that were already accepted under that
//! identity.

/// A 128-bit XXH3 checksum.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Checksum(u128);

impl Checksum {
    /// Computes the checksum of `bytes`.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        Self(xxhash_rust::xxh3::xxh3_128(bytes))
    }

    /// Wraps a raw checksum value (used when decoding from disk).
    #[must_use]
    pub fn from_raw(value: u128) -> Self {
        Self(value)
    }

    /// Returns the raw 128-bit integer.
    #[must_use]
    pub fn into_u128(self) -> u128 {
        self.0
    }

    /// Returns `Ok(())` if `bytes` hashes to this checksum, else an
    /// [`Error::Integrity`](crate::Error::Integrity).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Integrity`](crate::Error::Integrity) on mismatch.
    pub fn verify(self, bytes: &[u8]) -> crate::Result<()> {
        let actual = Self::of(bytes);
        if actual == self {
            Ok(())
        } else {
            Err(crate::Error::Integrity(format!(
                "checksum mismatch: expected {self:?}, computed {actual:?}"
            )))
        }
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}
