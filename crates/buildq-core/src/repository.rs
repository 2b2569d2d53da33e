//! Repository configuration: the registry entries tasks are created from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::task::BuildSpec;
use crate::{Error, Result, TaskName};

/// Actions that never need a working tree, regardless of configuration.
pub const SOURCELESS_ACTIONS: &[&str] = &["sync_es"];

/// A named build action of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionConfig {
    pub build: BuildSpec,
    /// Whether the repository must be cloned/pulled before building.
    pub needs_source: bool,
}

/// A repository known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// GitHub user or organization.
    pub gh_user: String,
    /// GitHub repository name; names the task and its clone directory.
    pub gh_repo: String,
    /// Build actions by name (`build_unstable`, `build_release`, ...).
    pub actions: BTreeMap<String, ActionConfig>,
}

impl RepoConfig {
    pub fn new(gh_user: impl Into<String>, gh_repo: impl Into<String>) -> Self {
        Self {
            gh_user: gh_user.into(),
            gh_repo: gh_repo.into(),
            actions: BTreeMap::new(),
        }
    }

    /// Add an action, replacing any action of the same name.
    pub fn with_action(mut self, name: impl Into<String>, build: BuildSpec) -> Self {
        self.actions.insert(
            name.into(),
            ActionConfig {
                build,
                needs_source: true,
            },
        );
        self
    }

    /// Add an action that runs without a working tree.
    pub fn with_sourceless_action(mut self, name: impl Into<String>, build: BuildSpec) -> Self {
        self.actions.insert(
            name.into(),
            ActionConfig {
                build,
                needs_source: false,
            },
        );
        self
    }

    pub fn task_name(&self) -> TaskName {
        TaskName::from(self.gh_repo.as_str())
    }

    pub fn clone_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.gh_user, self.gh_repo)
    }

    pub fn action(&self, name: &str) -> Result<&ActionConfig> {
        self.actions.get(name).ok_or_else(|| {
            Error::NotFound(format!(
                "action '{}' is not configured for repository '{}'",
                name, self.gh_repo
            ))
        })
    }

    /// Whether running `action` requires fetching the repository first.
    pub fn needs_source(&self, action: &str) -> Result<bool> {
        let config = self.action(action)?;
        Ok(config.needs_source && !SOURCELESS_ACTIONS.contains(&action))
    }
}
