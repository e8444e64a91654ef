//! Stale-aware locking for shared storage.
//!
//! Workers share nothing but a directory, so mutual exclusion is built from
//! three files inside it:
//! - `.lock`: handle file holding an exclusive, non-blocking advisory lock.
//!   It carries no payload.
//! - `.lock.data`: JSON heartbeat (`timestamp`, `owner_id`, `owner`)
//!   rewritten on every acquisition and deleted on release.
//! - `.lock.gate`: held briefly around every acquisition attempt. It is
//!   never deleted.
//!
//! # Stale Recovery
//!
//! Worker processes are killable, and a killed process loses its advisory
//! lock with it. A holder that hangs keeps the handle locked, so a locked
//! handle whose heartbeat is older than the stale threshold is reclaimed:
//! under the gate, the next acquirer deletes both files and locks a fresh
//! handle. A locked handle with no heartbeat is never reclaimed, since its
//! holder is alive and between writing and deleting it. The cost is a
//! bounded window in which a very slow holder can be pre-empted, in
//! exchange for the lock never staying wedged.
//!
//! # RAII Guards
//!
//! [`StaleLock::lock`] returns a [`LockGuard`] that releases on drop, so
//! every exit path from a critical section releases the lock.

mod guard;
mod metadata;
mod operations;
mod stale_lock;
mod types;

#[cfg(test)]
mod tests;

pub use guard::LockGuard;
pub use metadata::LockMetadata;
pub use operations::{clear_lock, inspect_lock};
pub use stale_lock::{
    DEFAULT_RETRY_INTERVAL, DEFAULT_STALE_THRESHOLD, DEFAULT_TIMEOUT, LOCK_DATA_FILE_NAME,
    LOCK_FILE_NAME, LOCK_GATE_FILE_NAME, StaleLock,
};
pub use types::LockInfo;
