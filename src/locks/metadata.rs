//! Lock metadata structures and utilities.

use crate::error::{Result, StorageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

/// Heartbeat record stored in the `.lock.data` sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockMetadata {
    /// Wall-clock time the lock was acquired.
    pub timestamp: DateTime<Utc>,

    /// Process ID of the lock holder.
    pub owner_id: u32,

    /// Owner of the lock (e.g., `user@HOST`).
    #[serde(default)]
    pub owner: String,
}

impl LockMetadata {
    /// Create metadata for the current process, stamped now.
    pub fn new() -> Self {
        Self {
            timestamp: Utc::now(),
            owner_id: std::process::id(),
            owner: get_owner_string(),
        }
    }

    /// Read metadata from the sidecar file.
    ///
    /// A missing or unparsable file yields `Ok(None)`: both mean there is no
    /// valid heartbeat to age.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::io(
                    format!("failed to read lock metadata '{}'", path.display()),
                    e,
                ));
            }
        };

        Ok(serde_json::from_str(&content).ok())
    }

    /// Serialize lock metadata to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            StorageError::UserError(format!("failed to serialize lock metadata: {}", e))
        })
    }

    /// Age of the heartbeat. Negative when the holder's clock runs ahead.
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.timestamp)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let seconds = age.num_seconds().max(0);
        let minutes = seconds / 60;
        let hours = minutes / 60;

        if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds % 60)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Check if the heartbeat is older than `threshold`.
    pub fn is_stale(&self, threshold: Duration) -> bool {
        match self.age().to_std() {
            Ok(age) => age > threshold,
            // Timestamp in the future: a live holder with a skewed clock.
            Err(_) => false,
        }
    }
}

impl Default for LockMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the owner string for lock metadata.
pub(crate) fn get_owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
