// Copyright (c) 2024-present, helios-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Configuration surface: builder-style structs for the L2 store and the
//! engine facade, plus the L2 store-directory resolution policy.

use std::path::{Path, PathBuf};

pub use crate::cache::L1Config;

/// The reserved directory name the engine uses for its own bookkeeping.
///
/// Working-set paths may not traverse into this name, and it is the default
/// parent of the L2 object directory when no override is configured.
pub const RESERVED_DIR: &str = ".helios";

/// Environment variable that, if set and non-empty, overrides the L2
/// store location.
pub const STORE_DIR_ENV_VAR: &str = "HELIOS_STORE_DIR";

/// Environment variable that, when set to `"1"`, asks the CLI collaborator
/// to enable verbose progress logging. The engine itself only emits log
/// records at the appropriate levels; it is the embedder's job to read
/// this variable and configure a subscriber accordingly.
pub const DEBUG_ENV_VAR: &str = "HELIOS_DEBUG";

/// Configuration for opening an L2 [`Store`](crate::store::Store).
#[derive(Clone, Debug, Default)]
pub struct StoreOptions {
    pub(crate) verify_checksums_on_read: bool,
}

impl StoreOptions {
    /// Creates the default store configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            verify_checksums_on_read: true,
        }
    }

    /// Controls whether `get` verifies the on-disk XXH3 checksum before
    /// returning bytes. Enabled by default.
    #[must_use]
    pub fn verify_checksums_on_read(mut self, verify: bool) -> Self {
        self.verify_checksums_on_read = verify;
        self
    }
}

/// Composes the VST, an optional L1 cache, and an optional L2 store behind
/// one [`Engine`](crate::engine::Engine).
#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    pub(crate) l1: Option<L1Config>,
    pub(crate) store: Option<StoreOptions>,
    pub(crate) store_dir: Option<PathBuf>,
    pub(crate) cwd: Option<PathBuf>,
}

impl EngineConfig {
    /// Creates a config with no attached stores.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches an L1 cache with the given configuration.
    #[must_use]
    pub fn with_l1(mut self, config: L1Config) -> Self {
        self.l1 = Some(config);
        self
    }

    /// Attaches an L2 store with the given configuration.
    #[must_use]
    pub fn with_l2(mut self, options: StoreOptions) -> Self {
        self.store = Some(options);
        self
    }

    /// Overrides the L2 store directory, bypassing environment and `cwd`
    /// resolution entirely. Mainly useful for tests.
    #[must_use]
    pub fn store_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_dir = Some(path.into());
        self
    }

    /// Overrides the base directory used to derive the *default* L2
    /// location (`<cwd>/<reserved>/objects`), in place of the process's
    /// actual working directory. Unlike [`Self::store_dir`], this still
    /// defers to [`STORE_DIR_ENV_VAR`] if that is set — it only replaces
    /// what "cwd" means for the fallback case.
    ///
    /// [`Engine::open`](crate::engine::Engine::open) uses this so its
    /// `path` argument participates in the normal env-var-then-default
    /// precedence instead of short-circuiting it.
    #[must_use]
    pub fn cwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.cwd = Some(path.into());
        self
    }
}

/// Resolves where the L2 object store should live on disk.
///
/// Precedence:
/// 1. An explicit path set via [`EngineConfig::store_dir`].
/// 2. The [`STORE_DIR_ENV_VAR`] environment variable, if set and non-empty.
/// 3. `<cwd>/<reserved>/objects`, where `cwd` is [`EngineConfig::cwd`] if
///    set, else the process's actual working directory.
///
/// The returned directory is not created; callers create it on open.
pub fn resolve_store_dir(config: &EngineConfig) -> std::io::Result<PathBuf> {
    if let Some(path) = &config.store_dir {
        return Ok(path.clone());
    }

    if let Ok(value) = std::env::var(STORE_DIR_ENV_VAR) {
        if !value.is_empty() {
            return Ok(PathBuf::from(value));
        }
    }

    let cwd = match &config.cwd {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };
    Ok(default_store_dir(&cwd))
}

fn default_store_dir(cwd: &Path) -> PathBuf {
    cwd.join(RESERVED_DIR).join("objects")
}
