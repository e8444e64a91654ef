//! RAII lock guard implementation.

use super::stale_lock::StaleLock;
use crate::error::Result;
use std::path::Path;

/// RAII guard for a held [`StaleLock`].
///
/// When dropped, the lock is released. If releasing fails, a warning is
/// logged but no panic occurs.
#[derive(Debug)]
pub struct LockGuard<'a> {
    lock: &'a mut StaleLock,

    /// Whether the lock has been released manually.
    released: bool,
}

impl<'a> LockGuard<'a> {
    pub(super) fn new(lock: &'a mut StaleLock) -> Self {
        Self {
            lock,
            released: false,
        }
    }

    /// Get the path to the lock handle file.
    pub fn path(&self) -> &Path {
        self.lock.lock_path()
    }

    /// Manually release the lock, reporting any failure.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.lock.release()
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = self.lock.release()
        {
            tracing::warn!(
                lock = %self.lock.lock_path().display(),
                error = %e,
                "failed to release lock"
            );
        }
    }
}
