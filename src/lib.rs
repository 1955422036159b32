// Copyright (c) 2024-present, helios-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A content-addressed, versioned state engine for rapidly-iterating AI code agents.
//!
//! ##### About
//!
//! Helios turns a working directory into immutable, deduplicated snapshots and
//! materializes them back onto a filesystem. The engine is a three-tier store:
//!
//! - The [`vst`] module is the in-memory mutable workspace ([`vst::Vst`]) that
//!   commits into a Merkle-DAG of [`TreeNode`](vst::tree::TreeNode)s.
//! - The [`cache`] module is a bounded, compressed, in-process acceleration
//!   layer ([`cache::L1Cache`]) with deterministic FIFO eviction.
//! - The [`store`] module is a durable, content-addressed object store
//!   ([`store::Store`]) with atomic multi-put batching.
//!
//! All three are tied together by BLAKE3 content hashing ([`hash`]) and wired
//! behind a single [`engine::Engine`] facade that an external caller (a CLI, a
//! test harness, an agent orchestration layer) drives.
//!
//! # Example usage
//!
//! ```
//! use helios_engine::Engine;
//! # let dir = tempfile::tempdir()?;
//!
//! let engine = Engine::open(dir.path())?;
//!
//! engine.write_file("hello.txt", b"hi".to_vec())?;
//! let (snapshot_id, _metrics) = engine.commit(None)?;
//!
//! engine.write_file("hello.txt", b"hello".to_vec())?;
//! let (snapshot_id_2, _metrics) = engine.commit(None)?;
//! assert_ne!(snapshot_id, snapshot_id_2);
//!
//! engine.restore(&snapshot_id)?;
//! assert_eq!(engine.read_file("hello.txt")?, Some(b"hi".to_vec()));
//! #
//! # Ok::<(), helios_engine::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod cache;
pub mod checksum;
pub mod coding;
pub mod compression;
pub mod config;
pub mod digest;
pub mod engine;
mod error;
pub mod file;
pub mod fs;
pub mod hash;
pub mod metrics;
pub mod stop_signal;
pub mod store;
pub mod vst;

pub use digest::{Digest, HashAlgorithm};
pub use engine::Engine;
pub use error::{Error, Result};
pub use vst::{DiffResult, MaterializeOptions, SnapshotId, Vst};
