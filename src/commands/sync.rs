//! The `prep`, `save` and `config` commands.

use super::open_coordinator;
use crate::cli::RootArgs;
use crate::config::Settings;
use crate::error::Result;

/// Worker start-up: write the backend config and pull the shared database.
pub fn cmd_prep(roots: &RootArgs, settings: &Settings) -> Result<()> {
    let mut coordinator = open_coordinator(roots, settings)?;
    coordinator.load_db()?;

    println!("Prepared worker root: {}", coordinator.invoke_path().display());
    if coordinator.is_storage_shared() {
        println!("  Storage:    {}", coordinator.storage_path().display());
    } else {
        println!("  Storage:    private");
    }
    println!(
        "  Config:     {}",
        coordinator.layout().backend_config_path().display()
    );
    Ok(())
}

pub fn cmd_save(roots: &RootArgs, settings: &Settings) -> Result<()> {
    let mut coordinator = open_coordinator(roots, settings)?;
    coordinator.save_db()?;

    if coordinator.is_storage_shared() {
        println!(
            "Published database to {}",
            coordinator.layout().storage_db_file().display()
        );
    } else {
        println!("Storage is private; nothing to publish.");
    }
    Ok(())
}

pub fn cmd_config(roots: &RootArgs, settings: &Settings) -> Result<()> {
    let coordinator = open_coordinator(roots, settings)?;
    let path = coordinator.write_backend_config()?;
    println!("Wrote backend config: {}", path.display());
    Ok(())
}
