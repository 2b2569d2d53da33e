//! Repository registry parsing.
//!
//! The registry lists every repository the producer can enqueue work for:
//!
//! ```kdl
//! repo "drone-test" {
//!     gh-user "tubearchivist"
//!     gh-repo "drone-test"
//!     action "build_unstable" {
//!         args "build" "--platform" "linux/amd64,linux/arm64" "-t" "bbilly1/drone-test:unstable" "--push"
//!     }
//!     action "sync_es" source=#false {
//!         run "docker" "compose" "pull"
//!         run "docker" "compose" "up" "-d"
//!     }
//! }
//! ```

use crate::kdl_util::{get_all_string_args, get_bool_prop, get_first_string_arg, normalized_name};
use crate::{ConfigError, ConfigResult};
use buildq_core::repository::{ActionConfig, RepoConfig};
use buildq_core::task::BuildSpec;
use kdl::{KdlDocument, KdlNode};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

// Repository names end up as directory names and document keys.
static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").unwrap());

/// All configured repositories, by registry key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    repos: BTreeMap<String, RepoConfig>,
}

impl Registry {
    pub fn get(&self, key: &str) -> Option<&RepoConfig> {
        self.repos.get(key)
    }

    /// Look up a repository, failing with `UnknownRepo`.
    pub fn repo(&self, key: &str) -> ConfigResult<&RepoConfig> {
        self.get(key)
            .ok_or_else(|| ConfigError::UnknownRepo(key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RepoConfig)> {
        self.repos.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }
}

/// Read and parse a registry file.
pub fn load_registry(path: &Path) -> ConfigResult<Registry> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_registry(&content)
}

/// Parse a repository registry from KDL text.
pub fn parse_registry(kdl: &str) -> ConfigResult<Registry> {
    let doc: KdlDocument = kdl.parse()?;

    let mut repos = BTreeMap::new();
    let mut owners: BTreeMap<String, String> = BTreeMap::new();

    for node in doc.nodes() {
        if node.name().value() != "repo" {
            continue; // Ignore unknown nodes
        }

        let (key, repo) = parse_repo(node)?;
        if repos.contains_key(&key) {
            return Err(ConfigError::Duplicate(format!("repo '{}'", key)));
        }

        // Two entries for the same GitHub repository would share one task slot.
        if let Some(other) = owners.insert(repo.gh_repo.clone(), key.clone()) {
            return Err(ConfigError::Duplicate(format!(
                "gh-repo '{}' is used by repos '{}' and '{}'",
                repo.gh_repo, other, key
            )));
        }

        repos.insert(key, repo);
    }

    Ok(Registry { repos })
}

fn parse_repo(node: &KdlNode) -> ConfigResult<(String, RepoConfig)> {
    let key = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("repo name".to_string()))?;

    let mut gh_user = None;
    let mut gh_repo = None;
    let mut actions = BTreeMap::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match normalized_name(child).as_str() {
                "gh-user" => gh_user = get_first_string_arg(child),
                "gh-repo" => gh_repo = get_first_string_arg(child),
                "action" => {
                    let (name, action) = parse_action(&key, child)?;
                    if actions.insert(name.clone(), action).is_some() {
                        return Err(ConfigError::Duplicate(format!(
                            "action '{}' in repo '{}'",
                            name, key
                        )));
                    }
                }
                _ => {}
            }
        }
    }

    let gh_user = gh_user
        .ok_or_else(|| ConfigError::MissingField(format!("gh-user for repo '{}'", key)))?;
    let gh_repo = gh_repo
        .ok_or_else(|| ConfigError::MissingField(format!("gh-repo for repo '{}'", key)))?;

    validate_name("gh-user", &gh_user)?;
    validate_name("gh-repo", &gh_repo)?;

    Ok((
        key,
        RepoConfig {
            gh_user,
            gh_repo,
            actions,
        },
    ))
}

fn parse_action(repo: &str, node: &KdlNode) -> ConfigResult<(String, ActionConfig)> {
    let name = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField(format!("action name in repo '{}'", repo)))?;
    let needs_source = get_bool_prop(node, "source").unwrap_or(true);

    let mut args: Option<Vec<String>> = None;
    let mut commands: Vec<Vec<String>> = Vec::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "args" => {
                    if args.is_some() {
                        return Err(ConfigError::Duplicate(format!(
                            "args of action '{}' in repo '{}'",
                            name, repo
                        )));
                    }
                    args = Some(get_all_string_args(child));
                }
                "run" => {
                    let argv = get_all_string_args(child);
                    if argv.is_empty() {
                        return Err(ConfigError::InvalidValue {
                            field: format!("run of action '{}' in repo '{}'", name, repo),
                            message: "a command needs at least a program".to_string(),
                        });
                    }
                    commands.push(argv);
                }
                _ => {}
            }
        }
    }

    let build = match (args, commands.is_empty()) {
        (Some(args), true) => BuildSpec::SingleCommand(args),
        (None, false) => BuildSpec::CommandSequence(commands),
        (Some(_), false) => {
            return Err(ConfigError::InvalidValue {
                field: format!("action '{}' in repo '{}'", name, repo),
                message: "use either `args` or `run`, not both".to_string(),
            });
        }
        (None, true) => {
            return Err(ConfigError::MissingField(format!(
                "args or run for action '{}' in repo '{}'",
                name, repo
            )));
        }
    };

    Ok((
        name,
        ActionConfig {
            build,
            needs_source,
        },
    ))
}

fn validate_name(field: &str, value: &str) -> ConfigResult<()> {
    if NAME_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            message: format!("'{}' is not a valid repository name", value),
        })
    }
}
