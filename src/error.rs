// Copyright (c) 2024-present, helios-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::coding::{DecodeError, EncodeError};

/// Represents errors that can occur anywhere in the engine.
#[derive(Debug)]
pub enum Error {
    /// Missing/empty argument, path traversal, unknown hash algorithm, or a
    /// `nil` value rejected during batch preflight.
    InvalidInput(String),

    /// A `restore` or `materialize` targeted an unknown snapshot.
    NotFound(String),

    /// Decompression failed, or a retrieved object's checksum did not match
    /// what was stored alongside it.
    Integrity(String),

    /// The store was already closed when the operation was attempted.
    StoreClosed,

    /// I/O error from the underlying filesystem.
    Io(std::io::Error),

    /// Serialization failed.
    Encode(EncodeError),

    /// Deserialization failed.
    Decode(DecodeError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Integrity(msg) => write!(f, "integrity error: {msg}"),
            Self::StoreClosed => write!(f, "store is closed"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Encode(e) => write!(f, "encode error: {e}"),
            Self::Decode(e) => write!(f, "decode error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Encode(e) => Some(e),
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<EncodeError> for Error {
    fn from(value: EncodeError) -> Self {
        Self::Encode(value)
    }
}

impl From<DecodeError> for Error {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}

/// Engine-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
