// Copyright (c) 2024-present, helios-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Atomic file rewrite primitives used by the L2 object store's manifest.

use crate::fs::FileSystem;
use std::{io::Write, path::Path};

/// Atomically rewrites the file at `path` with `content`.
///
/// Writes to a temporary file in the same directory, flushes and syncs it,
/// then persists it over `path` (a single rename on POSIX). On success, a
/// reader can never observe a partially-written file at `path`.
pub fn rewrite_atomic<F: FileSystem>(path: &Path, content: &[u8]) -> std::io::Result<()> {
    #[expect(
        clippy::expect_used,
        reason = "every file should have a parent directory"
    )]
    let folder = path.parent().expect("should have a parent");

    let mut temp_file = tempfile::NamedTempFile::new_in(folder)?;
    temp_file.write_all(content)?;
    temp_file.flush()?;
    temp_file.as_file_mut().sync_all()?;
    temp_file.persist(path)?;

    // TODO: not sure why it fails on Windows...
    #[cfg(not(target_os = "windows"))]
    {
        let file = F::open(path)?;
        file.sync_all()?;

        #[expect(
            clippy::expect_used,
            reason = "files should always have a parent directory"
        )]
        let folder = path.parent().expect("should have parent folder");
        fsync_directory::<F>(folder)?;
    }

    Ok(())
}

/// Fsyncs a directory so a prior rename/create within it is durable.
#[cfg(not(target_os = "windows"))]
pub fn fsync_directory<F: FileSystem>(path: &Path) -> std::io::Result<()> {
    let file = F::open(path)?;
    debug_assert!(file.metadata()?.is_dir());
    file.sync_all()
}

/// No-op on Windows: directories cannot be fsynced there.
#[cfg(target_os = "windows")]
pub fn fsync_directory<F: FileSystem>(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, StdFileSystem};
    use std::io::Write;
    use test_log::test;

    #[test]
    fn atomic_rewrite() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;

        let path = dir.path().join("test.txt");
        {
            let mut file = StdFileSystem::create(&path)?;
            write!(file, "asdasdasdasdasd")?;
        }

        rewrite_atomic::<StdFileSystem>(&path, b"newcontent")?;

        let content = StdFileSystem::read_to_string(&path)?;
        assert_eq!("newcontent", content);

        Ok(())
    }

    #[test]
    fn atomic_rewrite_creates_new_file() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("fresh.txt");

        rewrite_atomic::<StdFileSystem>(&path, b"hello")?;

        assert_eq!("hello", StdFileSystem::read_to_string(&path)?);

        Ok(())
    }
}
