//! The coordinator object and its lock plumbing.

use super::layout::StorageLayout;
use crate::config::{BackendConfig, Settings};
use crate::deps::{DependencyInstaller, UvInstaller, clean_specifiers};
use crate::error::Result;
use crate::git::{GitCloner, RepoCloner};
use crate::locks::{LockGuard, StaleLock};
use crate::registry::ModelRegistry;
use crate::request::JobRequirements;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Sequences installs and database syncs against a storage root.
///
/// One coordinator owns one [`StaleLock`] on the storage root. Operations
/// lock only when storage is shared.
pub struct StorageCoordinator {
    pub(super) layout: StorageLayout,
    pub(super) lock: StaleLock,
    pub(super) settings: Settings,
    pub(super) cloner: Box<dyn RepoCloner>,
    pub(super) installer: Box<dyn DependencyInstaller>,
}

impl StorageCoordinator {
    /// Resolve the roots and build a coordinator with the default git
    /// cloner and `uv` installer.
    pub fn new(invoke_root: &Path, storage_root: Option<&Path>, settings: &Settings) -> Result<Self> {
        let layout = StorageLayout::resolve(invoke_root, storage_root)?;
        let lock = StaleLock::new(&layout.storage_root)
            .with_stale_threshold(settings.stale_threshold())
            .with_default_timeout(settings.lock_timeout())
            .with_retry_interval(settings.retry_interval());

        info!(
            invoke = %layout.invoke_root.display(),
            storage = %layout.storage_root.display(),
            shared = layout.is_shared(),
            "storage coordinator ready"
        );

        Ok(Self {
            layout,
            lock,
            settings: settings.clone(),
            cloner: Box::new(GitCloner),
            installer: Box::new(UvInstaller::new(settings.uv_program.clone())),
        })
    }

    pub fn with_cloner(mut self, cloner: impl RepoCloner + 'static) -> Self {
        self.cloner = Box::new(cloner);
        self
    }

    pub fn with_installer(mut self, installer: impl DependencyInstaller + 'static) -> Self {
        self.installer = Box::new(installer);
        self
    }

    /// Override the lock timeout from settings. `None` waits forever.
    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock.set_default_timeout(timeout);
        self
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn invoke_path(&self) -> &Path {
        &self.layout.invoke_root
    }

    pub fn storage_path(&self) -> &Path {
        &self.layout.storage_root
    }

    /// Whether workers share the storage root, and therefore the lock.
    pub fn is_storage_shared(&self) -> bool {
        self.layout.is_shared()
    }

    /// Rewrite the backend config so the backend reads shared paths.
    ///
    /// Idempotent and lock-free: the file lives under the ephemeral root.
    pub fn write_backend_config(&self) -> Result<PathBuf> {
        let config = BackendConfig::new(
            &self.settings,
            &self.layout.invoke_db_dir(),
            &self.layout.models_dir(),
            &self.layout.nodes_dir(),
            &self.layout.download_cache_dir(),
        );
        let path = self.layout.backend_config_path();
        info!(path = %path.display(), "writing backend config");
        config.write(&path)?;
        Ok(path)
    }

    /// Install plain package specifiers into the worker environment.
    ///
    /// No lock: the environment belongs to this worker alone.
    pub fn install_packages<S: AsRef<str>>(&self, packages: &[S]) -> Result<()> {
        let packages = clean_specifiers(packages);
        if packages.is_empty() {
            return Ok(());
        }
        info!(count = packages.len(), "installing packages");
        self.installer
            .install_packages(&packages, &self.layout.venv_dir())
    }

    /// Install everything a job needs, then publish the database.
    ///
    /// Returns whether new plugin code arrived and the backend must reload.
    pub fn prepare_job<R: ModelRegistry + ?Sized>(
        &mut self,
        registry: &mut R,
        requirements: &JobRequirements,
    ) -> Result<bool> {
        let mut reload_required = false;
        if !requirements.models.is_empty() || !requirements.nodes.is_empty() {
            self.install_models(registry, &requirements.models)?;
            reload_required = self.install_nodes(&requirements.nodes)?;
            self.save_db()?;
        }
        self.install_packages(&requirements.packages)?;
        Ok(reload_required)
    }
}

/// Take the storage lock only when another worker could be contending.
pub(super) fn lock_if_shared(lock: &mut StaleLock, shared: bool) -> Result<Option<LockGuard<'_>>> {
    if shared { lock.lock().map(Some) } else { Ok(None) }
}
