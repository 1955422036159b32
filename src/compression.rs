// Copyright (c) 2024-present, helios-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Compression algorithm used for an L1 cache entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CompressionType {
    /// No compression.
    None,

    /// LZ4 compression.
    ///
    /// Recommended for use cases with a focus on speed over compression
    /// ratio; this is the default used by the L1 cache.
    #[cfg(feature = "lz4")]
    Lz4,
}

impl Encode for CompressionType {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        match self {
            Self::None => writer.write_u8(0)?,

            #[cfg(feature = "lz4")]
            Self::Lz4 => writer.write_u8(1)?,
        }

        Ok(())
    }
}

impl Decode for CompressionType {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let tag = reader.read_u8()?;

        match tag {
            0 => Ok(Self::None),

            #[cfg(feature = "lz4")]
            1 => Ok(Self::Lz4),

            tag => Err(DecodeError::InvalidTag("CompressionType", tag)),
        }
    }
}

impl std::fmt::Display for CompressionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::None => "no compression",

                #[cfg(feature = "lz4")]
                Self::Lz4 => "lz4",
            }
        )
    }
}

/// Compresses `raw` with LZ4, prefixing the encoded length so decompression
/// needs no out-of-band size.
#[cfg(feature = "lz4")]
#[must_use]
pub fn compress(raw: &[u8]) -> Vec<u8> {
    lz4_flex::block::compress_prepend_size(raw)
}

/// Reverses [`compress`].
///
/// # Errors
///
/// Returns [`crate::Error::Integrity`] if `compressed` is not valid LZ4
/// framing (truncated write, bit rot, or a foreign byte sequence).
#[cfg(feature = "lz4")]
pub fn decompress(compressed: &[u8]) -> crate::Result<Vec<u8>> {
    lz4_flex::block::decompress_size_prepended(compressed)
        .map_err(|e| crate::Error::Integrity(format!("lz4 decompression failed: {e}")))
}
