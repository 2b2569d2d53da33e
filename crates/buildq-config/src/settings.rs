//! Worker settings parsing.
//!
//! ```kdl
//! redis "redis://localhost:6379"
//! namespace "ta"
//! clone-root "clone"
//! builder "tubearchivist"
//! registry "repos.kdl"
//! ```
//!
//! Every setting has a default. Environment variables override the file:
//! `BUILDQ_REDIS_URL`, `BUILDQ_NAMESPACE`, `BUILDQ_CLONE_ROOT`,
//! `BUILDQ_BUILDER`, `BUILDQ_REGISTRY`.

use crate::kdl_util::{get_first_string_arg, normalized_name};
use crate::{ConfigError, ConfigResult};
use buildq_core::QueueKey;
use kdl::KdlDocument;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
pub const DEFAULT_CLONE_ROOT: &str = "clone";
pub const DEFAULT_BUILDER: &str = "tubearchivist";
pub const DEFAULT_REGISTRY: &str = "repos.kdl";

/// Settings shared by the worker and the producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Redis connection URL.
    pub redis_url: String,
    /// Namespace prefix of the queue key.
    pub namespace: String,
    /// Directory holding one working tree per repository.
    pub clone_root: PathBuf,
    /// Name (prefix) of the buildx builder the worker builds with.
    pub builder: String,
    /// Repository registry file.
    pub registry: PathBuf,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            namespace: QueueKey::DEFAULT_NAMESPACE.to_string(),
            clone_root: PathBuf::from(DEFAULT_CLONE_ROOT),
            builder: DEFAULT_BUILDER.to_string(),
            registry: PathBuf::from(DEFAULT_REGISTRY),
        }
    }
}

impl WorkerSettings {
    pub fn queue_key(&self) -> QueueKey {
        QueueKey::new(&self.namespace)
    }

    /// Apply `BUILDQ_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `BUILDQ_*` overrides from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("BUILDQ_REDIS_URL") {
            self.redis_url = url;
        }
        if let Some(namespace) = lookup("BUILDQ_NAMESPACE") {
            self.namespace = namespace;
        }
        if let Some(root) = lookup("BUILDQ_CLONE_ROOT") {
            self.clone_root = PathBuf::from(root);
        }
        if let Some(builder) = lookup("BUILDQ_BUILDER") {
            self.builder = builder;
        }
        if let Some(registry) = lookup("BUILDQ_REGISTRY") {
            self.registry = PathBuf::from(registry);
        }
    }
}

/// Parse worker settings from KDL text, starting from the defaults.
pub fn parse_settings(kdl: &str) -> ConfigResult<WorkerSettings> {
    let doc: KdlDocument = kdl.parse()?;
    let mut settings = WorkerSettings::default();

    for node in doc.nodes() {
        let name = normalized_name(node);
        let value = || {
            get_first_string_arg(node)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingField(format!("value of `{}`", name)))
        };

        match name.as_str() {
            "redis" => settings.redis_url = value()?,
            "namespace" => settings.namespace = value()?,
            "clone-root" => settings.clone_root = PathBuf::from(value()?),
            "builder" => settings.builder = value()?,
            "registry" => settings.registry = PathBuf::from(value()?),
            _ => {} // Ignore unknown nodes
        }
    }

    Ok(settings)
}

/// Load settings from `path` if given, then apply environment overrides.
///
/// A missing file is an error only when the path was given explicitly.
pub fn load_settings(path: Option<&Path>) -> ConfigResult<WorkerSettings> {
    let mut settings = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            parse_settings(&content)?
        }
        None => WorkerSettings::default(),
    };

    settings.apply_env();
    Ok(settings)
}
