//! Interface to the generation backend's model registry.
//!
//! The registry owns `models/` and `download_cache/`; this crate only asks
//! it what is installed, submits installs and waits for them. Calls block:
//! callers bridging an async backend do so inside their implementation.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A model as the registry knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Registry key used for updates.
    pub key: String,
    pub name: String,
    /// Source identity the model was installed from.
    pub source: String,
}

/// State of a submitted install job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStatus {
    Waiting,
    Running,
    Completed,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallJob {
    pub id: u64,
    pub source: String,
    pub status: InstallStatus,
}

/// Model registry operations used by
/// [`StorageCoordinator::install_models`](crate::storage::StorageCoordinator::install_models).
///
/// Implementations report failures as
/// [`StorageError::InstallFailure`](crate::error::StorageError::InstallFailure).
pub trait ModelRegistry {
    /// Every installed model.
    fn list(&mut self) -> Result<Vec<ModelRecord>>;

    /// Submit an install of `source`. `inplace` installs reference the files
    /// where they are instead of copying them into the models directory.
    fn install(&mut self, source: &str, inplace: bool) -> Result<InstallJob>;

    /// Rename the model with `key`.
    fn update(&mut self, key: &str, name: &str) -> Result<()>;

    /// Forget jobs that already finished.
    fn prune_completed_jobs(&mut self) -> Result<()>;

    /// Block until every submitted job finishes. With `raise_on_error`, any
    /// failed job turns into an error.
    fn wait_install(&mut self, raise_on_error: bool) -> Result<Vec<InstallJob>>;
}
