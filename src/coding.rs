// Copyright (c) 2024-present, helios-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Binary encode/decode traits used by the store's on-disk manifest records.

use std::io::{Read, Write};

/// Error during serialization.
#[derive(Debug)]
pub enum EncodeError {
    /// I/O error.
    Io(std::io::Error),
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "EncodeError({})",
            match self {
                Self::Io(e) => e.to_string(),
            }
        )
    }
}

impl From<std::io::Error> for EncodeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
        }
    }
}

/// Error during deserialization.
#[derive(Debug)]
pub enum DecodeError {
    /// I/O error.
    Io(std::io::Error),
    /// The header magic bytes did not match.
    InvalidHeader(&'static str),
    /// An unrecognized tag byte was encountered for the named type.
    InvalidTag(&'static str, u8),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "DecodeError::Io({e})"),
            Self::InvalidHeader(what) => write!(f, "DecodeError::InvalidHeader({what})"),
            Self::InvalidTag(what, tag) => write!(f, "DecodeError::InvalidTag({what}, {tag})"),
        }
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Trait to serialize a value into a byte stream.
pub trait Encode {
    /// Serializes into a writer.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] on I/O failure.
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError>;

    /// Serializes into a fresh vector.
    fn encode_into_vec(&self) -> Vec<u8> {
        let mut v = vec![];
        // Writing into a `Vec<u8>` cannot fail.
        #[allow(clippy::expect_used)]
        self.encode_into(&mut v)
            .expect("encoding into a Vec cannot fail");
        v
    }
}

/// Trait to deserialize a value from a byte stream.
pub trait Decode: Sized {
    /// Deserializes from a reader.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the bytes are malformed or truncated.
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError>;
}
