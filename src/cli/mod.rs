//! CLI argument parsing for invoke-storage.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use crate::config::SETTINGS_ENV_VAR;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Shared-storage coordination for short-lived InvokeAI workers.
///
/// Each worker has an ephemeral root for its config and database copy and
/// may point at a storage root shared with other workers:
/// - models and plugin repositories live in the storage root
/// - the database is copied in at start-up and published back after installs
/// - every mutation of the storage root runs under a stale-aware lock
#[derive(Parser, Debug)]
#[command(name = "invoke-storage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file (YAML). Defaults apply when omitted.
    #[arg(long, global = true, env = SETTINGS_ENV_VAR)]
    pub settings: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Prepare a worker for its first job.
    ///
    /// Writes the backend config and copies the shared database into the
    /// ephemeral root.
    Prep(RootArgs),

    /// Publish the worker's database to the storage root.
    Save(RootArgs),

    /// Write the backend config only.
    Config(RootArgs),

    /// Install the plugin repositories and packages a job requires.
    ///
    /// Reads a YAML or JSON requirements file, then publishes the database
    /// when nodes were requested. Prints whether the backend must reload.
    Install(InstallArgs),

    /// Storage lock management.
    ///
    /// Inspect or clear the lock on a storage root.
    Lock(LockCommand),
}

/// Ephemeral and storage roots of one worker.
#[derive(Args, Debug, Clone)]
pub struct RootArgs {
    /// Ephemeral per-worker root (created if missing).
    #[arg(long)]
    pub invoke: PathBuf,

    /// Shared storage root. Falls back to private storage when omitted.
    #[arg(long, env = "STORAGE_PATH")]
    pub storage: Option<PathBuf>,
}

/// Arguments for the `install` command.
#[derive(Parser, Debug)]
pub struct InstallArgs {
    #[command(flatten)]
    pub roots: RootArgs,

    /// Requirements file listing nodes and packages.
    pub request: PathBuf,
}

/// Lock subcommands.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Available lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// Show the current holder of the storage lock.
    ///
    /// Reports owner, pid and heartbeat age, and whether it is stale.
    Status(LockTargetArgs),

    /// Delete the storage lock files.
    ///
    /// Requires --force flag to prevent accidental clearing.
    Clear(LockClearArgs),
}

/// Storage root whose lock is inspected.
#[derive(Args, Debug, Clone)]
pub struct LockTargetArgs {
    /// Storage root holding the lock.
    #[arg(long, env = "STORAGE_PATH")]
    pub storage: PathBuf,
}

/// Arguments for the `lock clear` command.
#[derive(Parser, Debug)]
pub struct LockClearArgs {
    #[command(flatten)]
    pub target: LockTargetArgs,

    /// Force clearing the lock (required for safety).
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
