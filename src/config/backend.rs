//! The generation backend's persisted configuration document.

use super::settings::Settings;
use crate::error::{Result, StorageError};
use crate::fs::atomic_write_file;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of the backend config under the ephemeral root.
pub const BACKEND_CONFIG_FILE_NAME: &str = "invokeai.yaml";

/// Contents of `invokeai.yaml`.
///
/// Paths point the backend at shared storage: models and plugins are used
/// in place, only the database directory is per-worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub schema_version: String,
    pub db_dir: String,
    pub models_dir: String,
    pub custom_nodes_dir: String,
    pub download_cache_dir: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cache_ram_gb: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cache_vram_gb: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_partial_loading: Option<bool>,
}

impl BackendConfig {
    /// Build the config from directory paths and the tuning values in `settings`.
    pub fn new(
        settings: &Settings,
        db_dir: &Path,
        models_dir: &Path,
        custom_nodes_dir: &Path,
        download_cache_dir: &Path,
    ) -> Self {
        Self {
            schema_version: settings.schema_version.clone(),
            db_dir: posix(db_dir),
            models_dir: posix(models_dir),
            custom_nodes_dir: posix(custom_nodes_dir),
            download_cache_dir: posix(download_cache_dir),
            max_cache_ram_gb: settings.max_cache_ram_gb,
            max_cache_vram_gb: settings.max_cache_vram_gb,
            enable_partial_loading: settings.enable_partial_loading,
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            StorageError::UserError(format!("failed to serialize backend config: {}", e))
        })
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| StorageError::UserError(format!("failed to parse backend config: {}", e)))
    }

    /// Replace the file at `path` with this config.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        atomic_write_file(path, &self.to_yaml()?)
    }
}

fn posix(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
