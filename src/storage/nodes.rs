//! Plugin repository installation into the shared nodes directory.

use super::coordinator::{StorageCoordinator, lock_if_shared};
use crate::error::{Result, StorageError};
use crate::fs::ensure_dir;
use crate::request::NodeSpec;
use std::fs;
use tracing::{debug, info, warn};

/// Manifest installed after a fresh clone, when present.
const REQUIREMENTS_FILE_NAME: &str = "requirements.txt";

impl StorageCoordinator {
    /// Clone every node whose directory does not exist yet.
    ///
    /// A node is installed when `nodes/<repo name>` exists; contents and
    /// `commit`/`update` are not checked. Returns `true` when anything was
    /// cloned, meaning the backend must reload to pick up new code.
    pub fn install_nodes(&mut self, nodes: &[NodeSpec]) -> Result<bool> {
        if nodes.is_empty() {
            return Ok(false);
        }

        let shared = self.layout.is_shared();
        let _guard = lock_if_shared(&mut self.lock, shared)?;

        let nodes_dir = self.layout.nodes_dir();
        ensure_dir(&nodes_dir)?;
        let venv = self.layout.venv_dir();

        let mut reload_required = false;
        for node in nodes {
            if node.commit.is_some() || node.update.is_some() {
                warn!(repo = %node.git, "commit and update are not honoured for nodes");
            }

            let target = nodes_dir.join(repo_dir_name(&node.git)?);
            if target.exists() {
                debug!(path = %target.display(), "node already installed");
                continue;
            }

            fs::create_dir(&target).map_err(|e| {
                StorageError::io(format!("failed to create '{}'", target.display()), e)
            })?;
            reload_required = true;

            if let Err(e) = self.cloner.clone_repo(&node.git, &target) {
                // Leaving the directory behind would mark the node installed.
                if let Err(cleanup) = fs::remove_dir_all(&target) {
                    warn!(path = %target.display(), error = %cleanup, "failed to remove partial clone");
                }
                return Err(e);
            }

            let manifest = target.join(REQUIREMENTS_FILE_NAME);
            if manifest.is_file() {
                info!(manifest = %manifest.display(), "installing node requirements");
                self.installer.install_manifest(&manifest, &venv)?;
            }
        }

        Ok(reload_required)
    }
}

/// Directory name for a repository URI: the last path segment with one
/// trailing `.git` removed.
///
/// ```
/// use invoke_storage::storage::repo_dir_name;
///
/// assert_eq!(repo_dir_name("https://example/repo-a.git").unwrap(), "repo-a");
/// assert_eq!(repo_dir_name("git@github.com:org/tools/").unwrap(), "tools");
/// ```
pub fn repo_dir_name(uri: &str) -> Result<String> {
    let trimmed = uri.trim().trim_end_matches('/');
    let segment = trimmed.rsplit(['/', ':']).next().unwrap_or("");
    let name = segment.strip_suffix(".git").unwrap_or(segment);

    if name.is_empty() || name == "." || name == ".." {
        return Err(StorageError::UserError(format!(
            "cannot derive a node directory name from '{}'",
            uri
        )));
    }
    Ok(name.to_string())
}
