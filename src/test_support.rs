use crate::error::{Result, StorageError};
use crate::git::{GitCloner, RepoCloner};
use crate::deps::DependencyInstaller;
use crate::registry::{InstallJob, InstallStatus, ModelRecord, ModelRegistry};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create a committed git repository at `<tempdir>/<name>` to clone from.
pub(crate) fn create_source_repo(name: &str, with_requirements: bool) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(name);
    std::fs::create_dir(&path).unwrap();

    git(&path, &["init"]);
    git(&path, &["config", "user.email", "test@example.com"]);
    git(&path, &["config", "user.name", "Test User"]);

    std::fs::write(path.join("README.md"), format!("# {}\n", name)).unwrap();
    if with_requirements {
        std::fs::write(path.join("requirements.txt"), "numpy\n").unwrap();
    }
    git(&path, &["add", "."]);
    git(&path, &["commit", "-m", "Initial commit"]);

    (temp_dir, path)
}

fn git(repo_dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .current_dir(repo_dir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute git {}: {}", args.join(" "), e));

    if !output.status.success() {
        panic!(
            "git {} failed (exit code {:?})\nstdout:\n{}\nstderr:\n{}",
            args.join(" "),
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

/// In-memory registry that records every call.
#[derive(Debug, Default)]
pub(crate) struct FakeRegistry {
    pub records: Vec<ModelRecord>,
    pub installs: Vec<String>,
    pub renames: Vec<(String, String)>,
    pub prunes: usize,
    pub waits: usize,
    /// Installs of this source finish with an error.
    pub fail_source: Option<String>,
    /// Successful installs never show up in `list`.
    pub forget_installs: bool,
    /// When set, `install` records whether this lock heartbeat exists.
    pub watch_lock: Option<PathBuf>,
    pub lock_seen_during_install: Vec<bool>,
    pending: Vec<InstallJob>,
    next_id: u64,
}

impl FakeRegistry {
    pub fn with_records(records: Vec<ModelRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// Installs of `source` finish with an error.
    pub fn failing(source: &str) -> Self {
        Self {
            fail_source: Some(source.to_string()),
            ..Self::default()
        }
    }

    /// Successful installs never show up in `list`.
    pub fn forgetful() -> Self {
        Self {
            forget_installs: true,
            ..Self::default()
        }
    }

    /// Every `install` records whether `heartbeat` exists at that moment.
    pub fn watching(heartbeat: PathBuf) -> Self {
        Self {
            watch_lock: Some(heartbeat),
            ..Self::default()
        }
    }
}

pub(crate) fn record(key: &str, name: &str, source: &str) -> ModelRecord {
    ModelRecord {
        key: key.to_string(),
        name: name.to_string(),
        source: source.to_string(),
    }
}

impl ModelRegistry for FakeRegistry {
    fn list(&mut self) -> Result<Vec<ModelRecord>> {
        Ok(self.records.clone())
    }

    fn install(&mut self, source: &str, inplace: bool) -> Result<InstallJob> {
        assert!(inplace, "installs must be in place");
        if let Some(lock) = &self.watch_lock {
            self.lock_seen_during_install.push(lock.exists());
        }
        self.next_id += 1;
        let job = InstallJob {
            id: self.next_id,
            source: source.to_string(),
            status: InstallStatus::Waiting,
        };
        self.installs.push(source.to_string());
        self.pending.push(job.clone());
        Ok(job)
    }

    fn update(&mut self, key: &str, name: &str) -> Result<()> {
        self.renames.push((key.to_string(), name.to_string()));
        if let Some(record) = self.records.iter_mut().find(|r| r.key == key) {
            record.name = name.to_string();
        }
        Ok(())
    }

    fn prune_completed_jobs(&mut self) -> Result<()> {
        self.prunes += 1;
        Ok(())
    }

    fn wait_install(&mut self, raise_on_error: bool) -> Result<Vec<InstallJob>> {
        self.waits += 1;
        let mut finished = Vec::new();
        for mut job in self.pending.drain(..) {
            if self.fail_source.as_deref() == Some(job.source.as_str()) {
                job.status = InstallStatus::Error("download failed".to_string());
            } else {
                job.status = InstallStatus::Completed;
                if !self.forget_installs {
                    let name = job.source.rsplit('/').next().unwrap_or("model").to_string();
                    self.records
                        .push(record(&format!("key-{}", job.id), &name, &job.source));
                }
            }
            finished.push(job);
        }

        if raise_on_error
            && let Some(job) = finished
                .iter()
                .find(|j| matches!(j.status, InstallStatus::Error(_)))
        {
            return Err(StorageError::InstallFailure(format!(
                "install of '{}' failed",
                job.source
            )));
        }
        Ok(finished)
    }
}

/// Installer that records calls instead of running anything.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingInstaller {
    pub manifests: Arc<Mutex<Vec<PathBuf>>>,
    pub packages: Arc<Mutex<Vec<Vec<String>>>>,
    pub fail: bool,
}

impl DependencyInstaller for RecordingInstaller {
    fn install_manifest(&self, manifest: &Path, _venv: &Path) -> Result<()> {
        self.manifests.lock().unwrap().push(manifest.to_path_buf());
        if self.fail {
            return Err(StorageError::DependencyInstallFailure(
                "resolution failed".to_string(),
            ));
        }
        Ok(())
    }

    fn install_packages(&self, packages: &[String], _venv: &Path) -> Result<()> {
        self.packages.lock().unwrap().push(packages.to_vec());
        Ok(())
    }
}

/// Real git clones, counted.
#[derive(Debug, Clone, Default)]
pub(crate) struct CountingCloner {
    pub clones: Arc<AtomicUsize>,
}

impl CountingCloner {
    pub fn count(&self) -> usize {
        self.clones.load(Ordering::SeqCst)
    }
}

impl RepoCloner for CountingCloner {
    fn clone_repo(&self, uri: &str, target: &Path) -> Result<PathBuf> {
        self.clones.fetch_add(1, Ordering::SeqCst);
        GitCloner.clone_repo(uri, target)
    }
}
