//! Entry point for the `invoke-storage` CLI.
//!
//! Parses arguments, installs the log subscriber, dispatches to the command
//! handler and maps errors to exit codes.

use invoke_storage::cli::Cli;
use invoke_storage::{commands, exit_codes};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let filter = if cli.verbose {
        "invoke_storage=debug"
    } else {
        "invoke_storage=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
