//! Atomic file copy used for database synchronization.

use super::atomic::{replace, temp_file_for};
use crate::error::{Result, StorageError};
use std::fs::File;
use std::io;
use std::path::Path;

/// Copy `source` over `destination` without exposing a partial file.
///
/// The bytes land in a temp file beside `destination`, are synced, and are
/// then renamed into place. Returns the number of bytes copied.
pub fn atomic_copy<P: AsRef<Path>, Q: AsRef<Path>>(source: P, destination: Q) -> Result<u64> {
    let source = source.as_ref();
    let destination = destination.as_ref();

    let mut input = File::open(source).map_err(|e| {
        StorageError::io(format!("failed to open '{}'", source.display()), e)
    })?;

    let mut temp = temp_file_for(destination)?;
    let bytes = io::copy(&mut input, temp.as_file_mut()).map_err(|e| {
        StorageError::io(
            format!(
                "failed to copy '{}' to '{}'",
                source.display(),
                temp.path().display()
            ),
            e,
        )
    })?;

    temp.as_file()
        .sync_all()
        .map_err(|e| StorageError::io(format!("failed to sync '{}'", temp.path().display()), e))?;

    replace(temp, destination)?;
    Ok(bytes)
}
