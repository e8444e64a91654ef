//! Error types for invoke-storage.
//!
//! Uses thiserror for derive macros. Every variant maps to a distinct exit
//! code so the surrounding job handler can tell lock contention apart from
//! a broken install.

use crate::exit_codes;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for storage coordination.
#[derive(Error, Debug)]
pub enum StorageError {
    /// User provided invalid arguments or input files.
    #[error("{0}")]
    UserError(String),

    /// The shared lock stayed held by a live owner past the timeout.
    #[error("could not acquire lock on '{}' within {:.1}s", .path.display(), .timeout.as_secs_f64())]
    LockTimeout { path: PathBuf, timeout: Duration },

    /// The model registry failed to list, install or finish a model.
    #[error("Model install failed: {0}")]
    InstallFailure(String),

    /// A plugin repository could not be cloned.
    #[error("Clone failed: {0}")]
    CloneFailure(String),

    /// Plugin dependencies could not be installed into the worker environment.
    #[error("Dependency install failed: {0}")]
    DependencyInstallFailure(String),

    /// Filesystem operation failed outside the expected lock races.
    #[error("{context}: {source}")]
    Filesystem {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Build a filesystem error with a description of what was attempted.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        StorageError::Filesystem {
            context: context.into(),
            source,
        }
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            StorageError::UserError(_) => exit_codes::USER_ERROR,
            StorageError::LockTimeout { .. } => exit_codes::LOCK_FAILURE,
            StorageError::InstallFailure(_) => exit_codes::INSTALL_FAILURE,
            StorageError::CloneFailure(_) => exit_codes::CLONE_FAILURE,
            StorageError::DependencyInstallFailure(_) => exit_codes::DEPENDENCY_FAILURE,
            StorageError::Filesystem { .. } => exit_codes::FILESYSTEM_FAILURE,
        }
    }

    /// True for the one failure kind a caller is expected to retry.
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, StorageError::LockTimeout { .. })
    }
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
