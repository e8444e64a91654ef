//! Implementation of the `install` command.
//!
//! Installs the nodes and packages of a requirements file. Model installs
//! need a running backend registry, so a file that lists models is refused
//! before anything is touched.

use super::open_coordinator;
use crate::cli::InstallArgs;
use crate::config::Settings;
use crate::error::{Result, StorageError};
use crate::request::JobRequirements;

pub fn cmd_install(args: &InstallArgs, settings: &Settings) -> Result<()> {
    let requirements = JobRequirements::load(&args.request)?;
    if !requirements.models.is_empty() {
        return Err(StorageError::UserError(format!(
            "'{}' lists {} model(s); model installs require a running backend registry",
            args.request.display(),
            requirements.models.len()
        )));
    }

    let mut coordinator = open_coordinator(&args.roots, settings)?;

    let reload_required = coordinator.install_nodes(&requirements.nodes)?;
    if !requirements.nodes.is_empty() {
        coordinator.save_db()?;
    }
    coordinator.install_packages(&requirements.packages)?;

    println!(
        "Installed {} node(s) and {} package(s).",
        requirements.nodes.len(),
        requirements.packages.len()
    );
    println!("Reload required: {}", if reload_required { "yes" } else { "no" });
    Ok(())
}
