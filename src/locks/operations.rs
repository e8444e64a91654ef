//! Lock inspection and forced clearing.

use super::metadata::LockMetadata;
use super::stale_lock::{LOCK_DATA_FILE_NAME, LOCK_FILE_NAME, is_contended};
use super::types::LockInfo;
use crate::error::{Result, StorageError};
use crate::fs::remove_if_exists;
use fs2::FileExt;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::time::Duration;

/// Report the lock on `dir`, if it has a heartbeat or a locked handle.
///
/// A released lock leaves its handle behind with no heartbeat; that is
/// reported as no lock. A locked handle without a readable heartbeat has a
/// live holder and is never stale: only `clear_lock` removes it.
pub fn inspect_lock<P: AsRef<Path>>(dir: P, stale_threshold: Duration) -> Result<Option<LockInfo>> {
    let dir = dir.as_ref();
    let path = dir.join(LOCK_FILE_NAME);
    let data_path = dir.join(LOCK_DATA_FILE_NAME);

    let metadata = LockMetadata::read(&data_path)?;
    if metadata.is_none() && !handle_is_locked(&path)? {
        return Ok(None);
    }

    let is_stale = metadata
        .as_ref()
        .map(|meta| meta.is_stale(stale_threshold))
        .unwrap_or(false);

    Ok(Some(LockInfo {
        path,
        metadata,
        is_stale,
    }))
}

/// Remove both lock artifacts from `dir` regardless of holder state.
///
/// The caller is responsible for verifying that clearing is appropriate
/// (the CLI requires `--force`). Returns what was found before removal.
pub fn clear_lock<P: AsRef<Path>>(dir: P) -> Result<Option<LockInfo>> {
    let dir = dir.as_ref();
    let info = inspect_lock(dir, Duration::ZERO)?;

    remove_if_exists(dir.join(LOCK_FILE_NAME))?;
    remove_if_exists(dir.join(LOCK_DATA_FILE_NAME))?;

    Ok(info)
}

/// Whether some process holds the advisory lock on `path`.
fn handle_is_locked(path: &Path) -> Result<bool> {
    let file = match OpenOptions::new().write(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => {
            return Err(StorageError::io(
                format!("failed to open lock file '{}'", path.display()),
                e,
            ));
        }
    };

    match file.try_lock_exclusive() {
        Ok(()) => {
            FileExt::unlock(&file).map_err(|e| {
                StorageError::io(format!("failed to unlock '{}'", path.display()), e)
            })?;
            Ok(false)
        }
        Err(e) if is_contended(&e) => Ok(true),
        Err(e) => Err(StorageError::io(
            format!("failed to lock '{}'", path.display()),
            e,
        )),
    }
}
