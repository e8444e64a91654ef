//! Operator settings model, loading and validation.

use crate::error::{Result, StorageError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable naming a settings file.
pub const SETTINGS_ENV_VAR: &str = "INVOKE_STORAGE_SETTINGS";

/// Backend config schema written into `invokeai.yaml`.
pub const DEFAULT_SCHEMA_VERSION: &str = "4.0.2";

/// Settings for lock behaviour and the generated backend config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Seconds after which a lock heartbeat is considered abandoned.
    ///
    /// Must exceed the longest install plus database sync.
    pub lock_stale_seconds: u64,

    /// Seconds to wait for the shared lock. `null` waits forever.
    pub lock_timeout_seconds: Option<u64>,

    /// Milliseconds between lock attempts while contended.
    pub lock_retry_millis: u64,

    // =========================================================================
    // Backend settings
    // =========================================================================
    /// `schema_version` written into the backend config.
    pub schema_version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cache_ram_gb: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cache_vram_gb: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_partial_loading: Option<bool>,

    // =========================================================================
    // Dependency settings
    // =========================================================================
    /// Executable used to install plugin requirements.
    pub uv_program: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lock_stale_seconds: 600,
            lock_timeout_seconds: Some(30),
            lock_retry_millis: 100,
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            max_cache_ram_gb: None,
            max_cache_vram_gb: None,
            enable_partial_loading: None,
            uv_program: "uv".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            StorageError::UserError(format!(
                "failed to read settings file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load from `path` when given, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse settings from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document is valid and means "all defaults".
        let settings: Settings = if yaml.trim().is_empty() {
            Settings::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| {
                StorageError::UserError(format!("failed to parse settings YAML: {}", e))
            })?
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Serialize settings to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            StorageError::UserError(format!("failed to serialize settings to YAML: {}", e))
        })
    }

    /// Validate settings values.
    ///
    /// - `lock_stale_seconds` and `lock_retry_millis` must be positive
    /// - a configured `lock_timeout_seconds` must be positive
    /// - the stale threshold must exceed the timeout, or a waiter would
    ///   reclaim the lock from a holder it could simply have waited out
    pub fn validate(&self) -> Result<()> {
        if self.lock_stale_seconds == 0 {
            return Err(invalid("lock_stale_seconds must be greater than 0"));
        }
        if self.lock_retry_millis == 0 {
            return Err(invalid("lock_retry_millis must be greater than 0"));
        }
        if let Some(timeout) = self.lock_timeout_seconds {
            if timeout == 0 {
                return Err(invalid("lock_timeout_seconds must be greater than 0"));
            }
            if timeout >= self.lock_stale_seconds {
                return Err(invalid(
                    "lock_stale_seconds must be greater than lock_timeout_seconds",
                ));
            }
        }
        if self.schema_version.trim().is_empty() {
            return Err(invalid("schema_version must be non-empty"));
        }
        if self.uv_program.trim().is_empty() {
            return Err(invalid("uv_program must be non-empty"));
        }
        Ok(())
    }

    pub fn stale_threshold(&self) -> Duration {
        Duration::from_secs(self.lock_stale_seconds)
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_seconds.map(Duration::from_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.lock_retry_millis)
    }
}

fn invalid(message: &str) -> StorageError {
    StorageError::UserError(format!("settings validation failed: {}", message))
}
