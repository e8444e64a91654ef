//! Atomic filesystem writes.
//!
//! All atomic writes follow this pattern:
//! 1. Write content to a temporary file in the same directory
//! 2. Sync the file to disk (fsync)
//! 3. Rename it over the target
//!
//! Source and destination must be on the same filesystem for the rename to
//! be atomic, which holds because the temp file sits next to the target.
//! On crash, a temporary file may remain (named `.{filename}.XXXXXX.tmp`).

use crate::error::{Result, StorageError};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write bytes to a file.
///
/// The target is never in a partial state: readers see either the old
/// content or the new content.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    let mut temp = temp_file_for(path)?;
    temp.write_all(content)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| {
            StorageError::io(
                format!("failed to write temporary file '{}'", temp.path().display()),
                e,
            )
        })?;
    replace(temp, path)
}

/// Atomically write a string to a file.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Create a uniquely named temporary sibling of `target`.
///
/// Names look like `.{filename}.XXXXXX.tmp`; the random part keeps
/// concurrent writers in one process or across workers apart. The file is
/// deleted if it is dropped before [`replace`].
pub(crate) fn temp_file_for(target: &Path) -> Result<NamedTempFile> {
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    super::ensure_dir(parent)?;

    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            StorageError::UserError(format!("invalid file path '{}'", target.display()))
        })?;

    tempfile::Builder::new()
        .prefix(&format!(".{}.", filename))
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| {
            StorageError::io(
                format!("failed to create temporary file in '{}'", parent.display()),
                e,
            )
        })
}

/// Rename `temp` over `target`, then sync the parent directory so the
/// new directory entry survives a crash.
pub(crate) fn replace(temp: NamedTempFile, target: &Path) -> Result<()> {
    temp.persist(target).map_err(|e| {
        StorageError::io(
            format!("failed to atomically replace '{}'", target.display()),
            e.error,
        )
    })?;

    #[cfg(unix)]
    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}
