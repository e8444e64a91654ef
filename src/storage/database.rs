//! Database synchronization between the shared and ephemeral roots.

use super::coordinator::StorageCoordinator;
use crate::error::Result;
use crate::fs::atomic_copy;
use tracing::info;

impl StorageCoordinator {
    /// Point the backend at shared paths and seed the worker's database.
    ///
    /// The backend config is rewritten every time. On shared storage the
    /// shared database, if one exists yet, is copied over the worker's.
    pub fn load_db(&mut self) -> Result<()> {
        self.write_backend_config()?;

        if !self.layout.is_shared() {
            return Ok(());
        }

        info!("external storage is used");
        let source = self.layout.storage_db_file();
        let destination = self.layout.invoke_db_file();

        let _guard = self.lock.lock()?;
        if !source.is_file() {
            info!(path = %source.display(), "no shared database yet, starting fresh");
            return Ok(());
        }

        info!(from = %source.display(), to = %destination.display(), "sync: storage -> invoke");
        let bytes = atomic_copy(&source, &destination)?;
        info!(bytes, "database loaded");
        Ok(())
    }

    /// Publish the worker's database back to the shared root.
    pub fn save_db(&mut self) -> Result<()> {
        if !self.layout.is_shared() {
            return Ok(());
        }

        let source = self.layout.invoke_db_file();
        let destination = self.layout.storage_db_file();

        let _guard = self.lock.lock()?;
        info!(from = %source.display(), to = %destination.display(), "sync: storage <- invoke");
        let bytes = atomic_copy(&source, &destination)?;
        info!(bytes, "database saved");
        Ok(())
    }
}
