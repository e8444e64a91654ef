//! Git command runner and plugin repository cloning.
//!
//! Provides a wrapper around git commands with captured stdout/stderr and
//! structured error handling.

use crate::error::{Result, StorageError};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::info;

/// Result of a successful git command execution.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Standard output from the command (trimmed).
    pub stdout: String,
    /// Standard error from the command (trimmed).
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

/// Run a git command with the specified working directory.
///
/// Prompts are disabled so a private repository fails instead of hanging a
/// worker while it holds the shared lock.
///
/// # Returns
///
/// * `Ok(GitOutput)` - On successful execution (exit code 0)
/// * `Err(StorageError::CloneFailure)` - On spawn failure or non-zero exit
pub fn run_git<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<GitOutput> {
    let output = Command::new("git")
        .current_dir(cwd.as_ref())
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .map_err(|e| {
            StorageError::CloneFailure(format!(
                "failed to execute git {}: {}",
                args.first().unwrap_or(&""),
                e
            ))
        })?;

    let git_output = GitOutput::from_output(&output);

    if output.status.success() {
        Ok(git_output)
    } else {
        let exit_code = output.status.code().unwrap_or(-1);
        let error_msg = if git_output.stderr.is_empty() {
            git_output.stdout.clone()
        } else {
            git_output.stderr.clone()
        };

        Err(StorageError::CloneFailure(format!(
            "git {} failed (exit code {}): {}",
            args.first().unwrap_or(&""),
            exit_code,
            error_msg
        )))
    }
}

/// Clones plugin repositories into the shared nodes directory.
pub trait RepoCloner {
    /// Clone `uri` into `target`, which exists and is empty.
    /// Returns the working tree path.
    fn clone_repo(&self, uri: &str, target: &Path) -> Result<PathBuf>;
}

/// [`RepoCloner`] that shells out to `git clone`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCloner;

impl RepoCloner for GitCloner {
    fn clone_repo(&self, uri: &str, target: &Path) -> Result<PathBuf> {
        let cwd = target.parent().unwrap_or(Path::new("."));
        let target_str = target.to_string_lossy();
        run_git(cwd, &["clone", "--quiet", "--", uri, &target_str])?;
        info!(repo = uri, path = %target.display(), "repository cloned");
        Ok(target.to_path_buf())
    }
}
