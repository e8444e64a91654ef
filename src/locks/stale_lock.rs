//! Stale-aware exclusive lock over a shared directory.

use super::guard::LockGuard;
use super::metadata::LockMetadata;
use crate::error::{Result, StorageError};
use crate::fs::{atomic_write_file, ensure_dir, remove_if_exists};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Name of the advisory lock handle inside the guarded directory.
pub const LOCK_FILE_NAME: &str = ".lock";

/// Name of the heartbeat sidecar inside the guarded directory.
pub const LOCK_DATA_FILE_NAME: &str = ".lock.data";

/// Name of the gate serializing handle acquisition and stale reclaim.
/// It is never deleted.
pub const LOCK_GATE_FILE_NAME: &str = ".lock.gate";

/// Heartbeats older than this are presumed abandoned.
pub const DEFAULT_STALE_THRESHOLD: Duration = Duration::from_secs(10 * 60);

/// Timeout used by [`StaleLock::acquire`] unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sleep between attempts while the lock is contended.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Cross-process mutual exclusion keyed on a directory.
///
/// The lock is an exclusive, non-blocking advisory lock on `<dir>/.lock`
/// plus a heartbeat in `<dir>/.lock.data`. Taking the handle, writing the
/// heartbeat and reclaiming a stale handle all happen while holding a short
/// advisory lock on `<dir>/.lock.gate`, so no acquirer ever unlinks a handle
/// another acquirer has just locked.
///
/// The kernel drops the advisory lock of a process that dies, so a crashed
/// holder's handle is simply free again. A holder that hangs keeps its
/// handle locked; once its heartbeat ages past `stale_threshold` the next
/// acquirer unlinks both files and takes over. `stale_threshold` must be
/// longer than the longest legitimate critical section.
///
/// One instance owns at most one open handle; dropping the instance
/// releases the lock if it is still held.
#[derive(Debug)]
pub struct StaleLock {
    lock_path: PathBuf,
    data_path: PathBuf,
    gate_path: PathBuf,
    stale_threshold: Duration,
    default_timeout: Option<Duration>,
    retry_interval: Duration,
    held: Option<HeldLock>,
}

#[derive(Debug)]
struct HeldLock {
    file: File,
    metadata: LockMetadata,
}

impl StaleLock {
    /// Create a lock guarding `dir` with default timings.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            lock_path: dir.join(LOCK_FILE_NAME),
            data_path: dir.join(LOCK_DATA_FILE_NAME),
            gate_path: dir.join(LOCK_GATE_FILE_NAME),
            stale_threshold: DEFAULT_STALE_THRESHOLD,
            default_timeout: Some(DEFAULT_TIMEOUT),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            held: None,
        }
    }

    pub fn with_stale_threshold(mut self, threshold: Duration) -> Self {
        self.stale_threshold = threshold;
        self
    }

    /// Set the timeout used by [`acquire`](Self::acquire). `None` retries forever.
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.set_default_timeout(timeout);
        self
    }

    pub fn set_default_timeout(&mut self, timeout: Option<Duration>) {
        self.default_timeout = timeout;
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn stale_threshold(&self) -> Duration {
        self.stale_threshold
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    /// Whether this instance currently holds the lock.
    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    /// Acquire with the configured default timeout.
    pub fn acquire(&mut self) -> Result<()> {
        self.acquire_with_timeout(self.default_timeout)
    }

    /// Acquire the lock, retrying until `timeout` elapses.
    ///
    /// `None` retries forever. Fails with [`StorageError::LockTimeout`] once
    /// the deadline passes while another live holder keeps the lock. Any
    /// other filesystem error aborts immediately.
    pub fn acquire_with_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        if self.held.is_some() {
            debug!(lock = %self.lock_path.display(), "lock already held by this handle");
            return Ok(());
        }

        let started = Instant::now();
        loop {
            if let Some(held) = self.try_acquire_once()? {
                debug!(
                    lock = %self.lock_path.display(),
                    waited_ms = started.elapsed().as_millis() as u64,
                    "lock acquired"
                );
                self.held = Some(held);
                return Ok(());
            }

            let elapsed = started.elapsed();
            match timeout {
                Some(limit) if elapsed >= limit => {
                    return Err(StorageError::LockTimeout {
                        path: self.lock_path.clone(),
                        timeout: limit,
                    });
                }
                Some(limit) => thread::sleep(self.retry_interval.min(limit - elapsed)),
                None => thread::sleep(self.retry_interval),
            }
        }
    }

    /// Acquire with the default timeout and return a guard that releases on drop.
    pub fn lock(&mut self) -> Result<LockGuard<'_>> {
        self.acquire()?;
        Ok(LockGuard::new(self))
    }

    /// Like [`lock`](Self::lock) with an explicit timeout.
    pub fn lock_with_timeout(&mut self, timeout: Option<Duration>) -> Result<LockGuard<'_>> {
        self.acquire_with_timeout(timeout)?;
        Ok(LockGuard::new(self))
    }

    /// Release the lock. Safe to call when not held.
    ///
    /// The heartbeat is removed only if it is still the one this holder
    /// wrote; a holder that was reclaimed as stale must not erase the
    /// heartbeat of whoever took over.
    pub fn release(&mut self) -> Result<()> {
        let Some(held) = self.held.take() else {
            return Ok(());
        };

        match LockMetadata::read(&self.data_path) {
            Ok(Some(current)) if current == held.metadata => {
                if let Err(e) = remove_if_exists(&self.data_path) {
                    warn!(error = %e, "failed to remove lock metadata");
                }
            }
            Ok(Some(current)) => warn!(
                lock = %self.lock_path.display(),
                owner = %current.owner,
                pid = current.owner_id,
                "lock was reclaimed by another holder while held"
            ),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to read lock metadata on release"),
        }

        FileExt::unlock(&held.file).map_err(|e| {
            StorageError::io(
                format!("failed to unlock '{}'", self.lock_path.display()),
                e,
            )
        })?;
        debug!(lock = %self.lock_path.display(), "lock released");
        Ok(())
    }

    /// One attempt under the gate. `Ok(None)` means contention.
    fn try_acquire_once(&self) -> Result<Option<HeldLock>> {
        let Some(gate) = self.try_lock_gate()? else {
            return Ok(None);
        };

        let result = self.take_handle();

        // Closing the gate file also drops its lock; unlocking first just
        // makes the hand-off prompt.
        if let Err(e) = FileExt::unlock(&gate) {
            warn!(gate = %self.gate_path.display(), error = %e, "failed to unlock gate");
        }
        result
    }

    /// Take the handle, reclaiming it first when its heartbeat is stale.
    ///
    /// Must run under the gate.
    fn take_handle(&self) -> Result<Option<HeldLock>> {
        if let Some(file) = self.try_lock_handle()? {
            return self.write_heartbeat(file).map(Some);
        }

        // The handle is locked, so its holder is alive. A missing heartbeat
        // means it is mid-release; only an aged heartbeat is reclaimed.
        match LockMetadata::read(&self.data_path)? {
            Some(meta) if meta.is_stale(self.stale_threshold) => {
                info!(
                    lock = %self.lock_path.display(),
                    owner = %meta.owner,
                    pid = meta.owner_id,
                    age = %meta.age_string(),
                    "reclaiming stale lock"
                );
                remove_if_exists(&self.lock_path)?;
                remove_if_exists(&self.data_path)?;

                match self.try_lock_handle()? {
                    Some(file) => self.write_heartbeat(file).map(Some),
                    None => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }

    fn write_heartbeat(&self, file: File) -> Result<HeldLock> {
        let metadata = LockMetadata::new();
        // Dropping `file` on error closes it, which drops the lock.
        atomic_write_file(&self.data_path, &metadata.to_json()?)?;
        Ok(HeldLock { file, metadata })
    }

    /// Try to take the gate without blocking.
    fn try_lock_gate(&self) -> Result<Option<File>> {
        if let Some(parent) = self.gate_path.parent() {
            ensure_dir(parent)?;
        }
        let gate = open_lock_file(&self.gate_path)?;
        match gate.try_lock_exclusive() {
            Ok(()) => Ok(Some(gate)),
            Err(e) if is_contended(&e) => Ok(None),
            Err(e) => Err(StorageError::io(
                format!("failed to lock '{}'", self.gate_path.display()),
                e,
            )),
        }
    }

    /// Open the handle and try to lock it without blocking.
    ///
    /// Returns `Ok(None)` when a live holder has it, or when the file we
    /// locked is no longer the one at the lock path (an operator cleared it).
    fn try_lock_handle(&self) -> Result<Option<File>> {
        let file = open_lock_file(&self.lock_path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if is_contended(&e) => return Ok(None),
            Err(e) => {
                return Err(StorageError::io(
                    format!("failed to lock '{}'", self.lock_path.display()),
                    e,
                ));
            }
        }

        if !still_linked(&file, &self.lock_path)? {
            debug!(lock = %self.lock_path.display(), "lock handle replaced during acquire");
            return Ok(None);
        }

        Ok(Some(file))
    }
}

impl Drop for StaleLock {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(lock = %self.lock_path.display(), error = %e, "failed to release lock on drop");
        }
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|e| {
            StorageError::io(format!("failed to open lock file '{}'", path.display()), e)
        })
}

pub(super) fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Whether `path` still names the file behind `file`.
#[cfg(unix)]
fn still_linked(file: &File, path: &Path) -> Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let held = file
        .metadata()
        .map_err(|e| StorageError::io(format!("failed to stat '{}'", path.display()), e))?;
    match std::fs::metadata(path) {
        Ok(current) => Ok(held.dev() == current.dev() && held.ino() == current.ino()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::io(
            format!("failed to stat '{}'", path.display()),
            e,
        )),
    }
}

#[cfg(not(unix))]
fn still_linked(_file: &File, _path: &Path) -> Result<bool> {
    Ok(true)
}
