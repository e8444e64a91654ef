//! Command implementations for invoke-storage.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations.

mod install;
mod lock;
mod sync;


use crate::cli::{Cli, Command, LockAction, RootArgs};
use crate::config::Settings;
use crate::error::Result;
use crate::storage::StorageCoordinator;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let settings = Settings::load_or_default(cli.settings.as_deref())?;

    match cli.command {
        Command::Prep(roots) => sync::cmd_prep(&roots, &settings),
        Command::Save(roots) => sync::cmd_save(&roots, &settings),
        Command::Config(roots) => sync::cmd_config(&roots, &settings),
        Command::Install(args) => install::cmd_install(&args, &settings),
        Command::Lock(lock_cmd) => match lock_cmd.action {
            LockAction::Status(target) => lock::cmd_lock_status(&target, &settings),
            LockAction::Clear(args) => lock::cmd_lock_clear(&args),
        },
    }
}

fn open_coordinator(roots: &RootArgs, settings: &Settings) -> Result<StorageCoordinator> {
    StorageCoordinator::new(&roots.invoke, roots.storage.as_deref(), settings)
}
