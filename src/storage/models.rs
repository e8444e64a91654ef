//! Model installation through the backend registry.

use super::coordinator::{StorageCoordinator, lock_if_shared};
use crate::error::{Result, StorageError};
use crate::registry::{ModelRecord, ModelRegistry};
use crate::request::ModelSpec;
use std::collections::HashSet;
use tracing::{debug, info};

impl StorageCoordinator {
    /// Install every requested model the registry does not already have.
    ///
    /// Models are matched by source; each source is submitted at most once
    /// per call, in the order it was first requested. The lock is held from the first `list` until the renames
    /// are done so two workers never submit the same source, at the price
    /// of blocking other workers for the whole download.
    pub fn install_models<R: ModelRegistry + ?Sized>(
        &mut self,
        registry: &mut R,
        models: &[ModelSpec],
    ) -> Result<()> {
        if models.is_empty() {
            return Ok(());
        }

        let shared = self.layout.is_shared();
        let _guard = lock_if_shared(&mut self.lock, shared)?;

        let installed = registry.list()?;
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for model in models {
            if !seen.insert(model.source.as_str()) {
                continue;
            }
            if is_installed(&installed, &model.source) {
                debug!(source = %model.source, "model already installed");
            } else {
                pending.push(model.source.as_str());
            }
        }

        let records = if pending.is_empty() {
            installed
        } else {
            registry.prune_completed_jobs()?;
            for &source in &pending {
                info!(source, "installing model");
                registry.install(source, true)?;
            }

            info!(count = pending.len(), "waiting for model installs");
            registry.wait_install(true)?;
            info!("all models installed");
            registry.list()?
        };

        apply_names(registry, &records, models)
    }
}

fn is_installed(records: &[ModelRecord], source: &str) -> bool {
    records.iter().any(|r| r.source == source)
}

/// Rename models whose requested display name differs from the registry's.
fn apply_names<R: ModelRegistry + ?Sized>(
    registry: &mut R,
    records: &[ModelRecord],
    models: &[ModelSpec],
) -> Result<()> {
    for model in models {
        let Some(name) = model.name.as_deref() else {
            continue;
        };

        let record = records
            .iter()
            .find(|r| r.source == model.source)
            .ok_or_else(|| {
                StorageError::InstallFailure(format!(
                    "model '{}' is missing from the registry after install",
                    model.source
                ))
            })?;

        if record.name != name {
            info!(from = %record.name, to = name, "renaming model");
            registry.update(&record.key, name)?;
        }
    }
    Ok(())
}
