//! Job requirement documents: which models, plugins and packages a job needs.

use crate::error::{Result, StorageError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A model the job needs, identified by its registry source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Source URI or hash the registry installed the model from.
    pub source: String,

    /// Display name to apply after install.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ModelSpec {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A plugin repository the job needs.
///
/// `commit` and `update` are accepted but not acted on: a node counts as
/// installed once its directory exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Repository URI to clone.
    pub git: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<bool>,
}

impl NodeSpec {
    pub fn new(git: impl Into<String>) -> Self {
        Self {
            git: git.into(),
            commit: None,
            update: None,
        }
    }
}

/// Everything a job asks to have installed before it runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobRequirements {
    pub models: Vec<ModelSpec>,
    pub nodes: Vec<NodeSpec>,
    /// Extra package specifiers for the worker environment.
    pub packages: Vec<String>,
}

impl JobRequirements {
    /// Load requirements from a YAML or JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            StorageError::UserError(format!(
                "failed to read requirements file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse requirements. JSON is accepted since it is valid YAML.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| StorageError::UserError(format!("failed to parse requirements: {}", e)))
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty() && self.nodes.is_empty() && self.packages.is_empty()
    }
}
