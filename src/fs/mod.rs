//! Filesystem utilities for invoke-storage.
//!
//! Shared-root artifacts (lock metadata, the database copy, the backend
//! config) are always replaced through a temp file and a rename, so a
//! reader on another worker never observes a torn file.

pub mod atomic;
mod copy;

pub use atomic::{atomic_write, atomic_write_file};
pub use copy::atomic_copy;

use crate::error::{Result, StorageError};
use std::fs;
use std::io;
use std::path::Path;

/// Remove a file, treating "already gone" as success.
///
/// Returns `true` when this call removed the file.
pub fn remove_if_exists<P: AsRef<Path>>(path: P) -> Result<bool> {
    let path = path.as_ref();
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::io(
            format!("failed to remove '{}'", path.display()),
            e,
        )),
    }
}

/// Create a directory and all of its parents.
pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    fs::create_dir_all(path).map_err(|e| {
        StorageError::io(
            format!("failed to create directory '{}'", path.display()),
            e,
        )
    })
}
