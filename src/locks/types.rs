//! Lock information reported by inspection.

use super::metadata::LockMetadata;
use std::path::PathBuf;

/// Snapshot of a lock found on a shared directory.
#[derive(Debug, Clone)]
pub struct LockInfo {
    /// The lock handle path.
    pub path: PathBuf,

    /// The heartbeat metadata, if the sidecar was readable.
    pub metadata: Option<LockMetadata>,

    /// Whether the lock would be reclaimed by the next acquirer.
    pub is_stale: bool,
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.metadata {
            Some(meta) => write!(
                f,
                "{} (owner: {}, pid: {}, age: {}{})",
                self.path.display(),
                meta.owner,
                meta.owner_id,
                meta.age_string(),
                if self.is_stale { ", STALE" } else { "" }
            ),
            None => write!(f, "{} (locked, no heartbeat)", self.path.display()),
        }
    }
}
