//! Paths of the ephemeral and shared roots.

use crate::config::BACKEND_CONFIG_FILE_NAME;
use crate::error::{Result, StorageError};
use crate::fs::ensure_dir;
use std::path::{Path, PathBuf};

/// The single database file synchronized between roots.
pub const DATABASE_FILE_NAME: &str = "invokeai.db";

/// Resolved roots for one worker.
///
/// Both paths are absolute and canonical, so comparing them tells whether
/// storage is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    /// Per-worker working directory.
    pub invoke_root: PathBuf,

    /// Directory shared by every worker. Equals `invoke_root` for private storage.
    pub storage_root: PathBuf,
}

impl StorageLayout {
    /// Create the ephemeral root (`mkdir -p`) and resolve both roots.
    ///
    /// A `storage_root` that is not an existing directory falls back to
    /// `invoke_root`. The shared root itself is never created here.
    pub fn resolve(invoke_root: &Path, storage_root: Option<&Path>) -> Result<Self> {
        ensure_dir(invoke_root)?;
        let invoke_root = canonical(invoke_root)?;

        let storage_root = match storage_root {
            Some(path) if path.is_dir() => canonical(path)?,
            Some(path) => {
                tracing::warn!(
                    storage = %path.display(),
                    "storage path is not a directory, using private storage"
                );
                invoke_root.clone()
            }
            None => invoke_root.clone(),
        };

        Ok(Self {
            invoke_root,
            storage_root,
        })
    }

    /// Whether the storage root differs from the ephemeral root.
    pub fn is_shared(&self) -> bool {
        self.invoke_root != self.storage_root
    }

    pub fn invoke_db_dir(&self) -> PathBuf {
        self.invoke_root.join("databases")
    }

    pub fn storage_db_dir(&self) -> PathBuf {
        self.storage_root.join("databases")
    }

    pub fn invoke_db_file(&self) -> PathBuf {
        self.invoke_db_dir().join(DATABASE_FILE_NAME)
    }

    pub fn storage_db_file(&self) -> PathBuf {
        self.storage_db_dir().join(DATABASE_FILE_NAME)
    }

    pub fn models_dir(&self) -> PathBuf {
        self.storage_root.join("models")
    }

    pub fn nodes_dir(&self) -> PathBuf {
        self.storage_root.join("nodes")
    }

    pub fn download_cache_dir(&self) -> PathBuf {
        self.storage_root.join("download_cache")
    }

    /// Location of `invokeai.yaml` under the ephemeral root.
    pub fn backend_config_path(&self) -> PathBuf {
        self.invoke_root.join(BACKEND_CONFIG_FILE_NAME)
    }

    /// The worker's isolated Python environment.
    pub fn venv_dir(&self) -> PathBuf {
        self.invoke_root.join(".venv")
    }
}

fn canonical(path: &Path) -> Result<PathBuf> {
    path.canonicalize().map_err(|e| {
        StorageError::io(format!("failed to resolve path '{}'", path.display()), e)
    })
}
