// Copyright (c) 2024-present, helios-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The content digest: a 32-byte value tagged with the algorithm that produced it.

use std::fmt;

/// Hash algorithm tag carried alongside a [`Digest`].
///
/// `Blake3` is the only algorithm this crate computes. `Sha256` is reserved so a
/// future migration can coexist with existing keys without changing the wire
/// format of [`Digest::to_key_string`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum HashAlgorithm {
    /// BLAKE3, the only algorithm this crate produces today.
    Blake3,
    /// Reserved for a future migration; not currently produced.
    Sha256,
}

impl HashAlgorithm {
    fn as_str(self) -> &'static str {
        match self {
            Self::Blake3 => "blake3",
            Self::Sha256 => "sha256",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "blake3" => Some(Self::Blake3),
            "sha256" => Some(Self::Sha256),
            _ => None,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An opaque 32-byte content digest, tagged with the algorithm that produced it.
///
/// Equality and hashing are byte-wise on the digest bytes; the algorithm tag
/// only participates in [`Digest::to_key_string`], the `"<algo>:<hex>"` form
/// used as the L2 storage key.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Digest {
    algorithm: HashAlgorithm,
    bytes: [u8; 32],
}

impl Digest {
    /// Wraps raw bytes produced by `algorithm`.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// The algorithm that produced this digest.
    #[must_use]
    pub fn algorithm(self) -> HashAlgorithm {
        self.algorithm
    }

    /// The raw 32 digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Lowercase hex encoding of the digest bytes, without the algorithm tag.
    #[must_use]
    pub fn to_hex(self) -> String {
        let mut s = String::with_capacity(64);
        for byte in self.bytes {
            use fmt::Write as _;
            // Writing to a String cannot fail.
            #[allow(clippy::expect_used)]
            write!(s, "{byte:02x}").expect("fmt::Write to String is infallible");
        }
        s
    }

    /// The `"<algo>:<hex>"` string used as the L2 storage key.
    #[must_use]
    pub fn to_key_string(self) -> String {
        format!("{}:{}", self.algorithm, self.to_hex())
    }

    /// Parses a `"<algo>:<hex>"` key string back into a digest.
    ///
    /// # Errors
    ///
    /// Returns `None` if the algorithm tag is unknown or the hex portion is
    /// malformed.
    #[must_use]
    pub fn from_key_string(s: &str) -> Option<Self> {
        let (algo, hex) = s.split_once(':')?;
        let algorithm = HashAlgorithm::from_str(algo)?;

        if hex.len() != 64 {
            return None;
        }

        let mut bytes = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let byte_str = std::str::from_utf8(chunk).ok()?;
            bytes[i] = u8::from_str_radix(byte_str, 16).ok()?;
        }

        Some(Self { algorithm, bytes })
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_key_string())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_key_string())
    }
}
