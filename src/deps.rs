//! Dependency installation into the worker's virtual environment.

use crate::error::{Result, StorageError};
use std::path::Path;
use std::process::Command;
use tracing::info;

/// Installs Python packages into an isolated environment.
pub trait DependencyInstaller {
    /// Install everything listed in the requirements manifest at `manifest`.
    fn install_manifest(&self, manifest: &Path, venv: &Path) -> Result<()>;

    /// Install the given package specifiers.
    fn install_packages(&self, packages: &[String], venv: &Path) -> Result<()>;
}

/// [`DependencyInstaller`] backed by `uv pip install`.
///
/// The target environment is selected with `VIRTUAL_ENV`, which is what
/// activating the environment would set.
#[derive(Debug, Clone)]
pub struct UvInstaller {
    program: String,
}

impl UvInstaller {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[&str], venv: &Path) -> Result<()> {
        info!(program = %self.program, args = ?args, venv = %venv.display(), "installing dependencies");

        let output = Command::new(&self.program)
            .args(["pip", "install"])
            .args(args)
            .env("VIRTUAL_ENV", venv)
            .output()
            .map_err(|e| {
                StorageError::DependencyInstallFailure(format!(
                    "failed to execute {}: {}",
                    self.program, e
                ))
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(StorageError::DependencyInstallFailure(format!(
            "{} pip install {} failed (exit code {}): {}",
            self.program,
            args.join(" "),
            output.status.code().unwrap_or(-1),
            stderr
        )))
    }
}

impl Default for UvInstaller {
    fn default() -> Self {
        Self::new("uv")
    }
}

impl DependencyInstaller for UvInstaller {
    fn install_manifest(&self, manifest: &Path, venv: &Path) -> Result<()> {
        let manifest = manifest.to_string_lossy();
        self.run(&["-r", &manifest], venv)
    }

    fn install_packages(&self, packages: &[String], venv: &Path) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        let args: Vec<&str> = packages.iter().map(String::as_str).collect();
        self.run(&args, venv)
    }
}

/// Trim specifiers and drop blank ones (manifest lines, stray whitespace).
pub fn clean_specifiers<S: AsRef<str>>(packages: &[S]) -> Vec<String> {
    packages
        .iter()
        .map(|p| p.as_ref().trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn clean_specifiers_drops_blanks() {
        let cleaned = clean_specifiers(&["  numpy ", "", "   ", "torch==2.3\n"]);
        assert_eq!(cleaned, vec!["numpy".to_string(), "torch==2.3".to_string()]);
    }

    #[test]
    fn missing_program_is_dependency_failure() {
        let temp_dir = TempDir::new().unwrap();
        let installer = UvInstaller::new("definitely-not-an-installer-binary");

        let err = installer
            .install_packages(&["numpy".to_string()], temp_dir.path())
            .unwrap_err();
        assert!(matches!(err, StorageError::DependencyInstallFailure(_)));
    }

    #[test]
    fn empty_package_list_runs_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let installer = UvInstaller::new("definitely-not-an-installer-binary");
        installer.install_packages(&[], temp_dir.path()).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_dependency_failure() {
        let temp_dir = TempDir::new().unwrap();
        // `false pip install -r x` exits 1 without output.
        let installer = UvInstaller::new("false");

        let err = installer
            .install_manifest(&temp_dir.path().join("requirements.txt"), temp_dir.path())
            .unwrap_err();
        assert!(err.to_string().contains("exit code 1"));
    }
}
