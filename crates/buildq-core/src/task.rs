//! Task records and the queue document.
//!
//! The queue document is a single JSON object shared by the producer and the
//! worker:
//!
//! ```json
//! {
//!   "created": 1700000000,
//!   "tasks": {
//!     "drone-test": {
//!       "timestamp": 1700000100,
//!       "clone": "https://github.com/tubearchivist/drone-test.git",
//!       "name": "drone-test",
//!       "build": ["build", "-t", "bbilly1/drone-test:unstable", "--push"]
//!     }
//!   }
//! }
//! ```

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::{Error, Result, TaskName};

/// Placeholder replaced by the release version when a task is created.
pub const VERSION_PLACEHOLDER: &str = "$VERSION";

/// What to run once the source tree is in place.
///
/// On the wire both forms are JSON arrays. A list whose elements are all
/// lists is a command sequence, anything else is a single argument list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildSpec {
    /// Independent commands, each a full argv, run in order.
    CommandSequence(Vec<Vec<String>>),
    /// Arguments to the build tool; the build context is appended.
    SingleCommand(Vec<String>),
}

impl BuildSpec {
    /// Replace every `$VERSION` in every argument with `version`.
    pub fn with_version(&self, version: &str) -> Self {
        self.substitute(VERSION_PLACEHOLDER, version)
    }

    /// Textually replace `placeholder` in every argument.
    pub fn substitute(&self, placeholder: &str, value: &str) -> Self {
        let replace = |args: &[String]| -> Vec<String> {
            args.iter()
                .map(|arg| arg.replace(placeholder, value))
                .collect()
        };

        match self {
            BuildSpec::SingleCommand(args) => BuildSpec::SingleCommand(replace(args)),
            BuildSpec::CommandSequence(commands) => BuildSpec::CommandSequence(
                commands.iter().map(|command| replace(command)).collect(),
            ),
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, BuildSpec::CommandSequence(_))
    }
}

/// One pending unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// When the task was created.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    /// Repository to fetch before building; `None` when no working tree is
    /// needed. Stored as `false` in the document.
    #[serde(rename = "clone", with = "source_ref", default)]
    pub source: Option<String>,
    /// Repository name, also the clone directory name.
    pub name: TaskName,
    pub build: BuildSpec,
}

impl TaskRecord {
    pub fn new(name: TaskName, source: Option<String>, build: BuildSpec) -> Self {
        Self {
            timestamp: Utc::now().trunc_subsecs(0),
            source,
            name,
            build,
        }
    }

    /// Directory the source tree lives in below `clone_root`.
    pub fn working_dir(&self, clone_root: &Path) -> PathBuf {
        clone_root.join(self.name.as_str())
    }
}

/// The queue document.
///
/// Records are kept as raw JSON and decoded one at a time, so a single
/// malformed record does not make the rest of the queue unreadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueDocument {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub tasks: BTreeMap<String, serde_json::Value>,
}

impl QueueDocument {
    /// An empty document stamped with the current time.
    pub fn new() -> Self {
        Self {
            created: Utc::now().trunc_subsecs(0),
            tasks: BTreeMap::new(),
        }
    }

    /// Names of all pending tasks, in document order.
    pub fn task_names(&self) -> Vec<TaskName> {
        self.tasks.keys().map(|name| TaskName::from(name.as_str())).collect()
    }

    pub fn contains(&self, name: &TaskName) -> bool {
        self.tasks.contains_key(name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Decode the pending record for `name`.
    pub fn task(&self, name: &TaskName) -> Result<TaskRecord> {
        let raw = self
            .tasks
            .get(name.as_str())
            .ok_or_else(|| Error::NotFound(format!("task '{}' is not in the queue", name)))?;

        serde_json::from_value(raw.clone()).map_err(|e| Error::MalformedTask {
            name: name.to_string(),
            message: e.to_string(),
        })
    }

    /// Insert or overwrite the record for `record.name`.
    pub fn insert(&mut self, record: &TaskRecord) -> Result<()> {
        let raw = serde_json::to_value(record).map_err(|e| Error::Internal(e.to_string()))?;
        self.tasks.insert(record.name.to_string(), raw);
        Ok(())
    }

    /// Remove the record for `name`, returning whether it was present.
    pub fn remove(&mut self, name: &TaskName) -> bool {
        self.tasks.remove(name.as_str()).is_some()
    }
}

impl Default for QueueDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// `clone` is either a URL or `false`.
mod source_ref {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Url(String),
        Flag(bool),
    }

    pub fn serialize<S: Serializer>(
        source: &Option<String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match source {
            Some(url) => serializer.serialize_str(url),
            None => serializer.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        match Option::<Wire>::deserialize(deserializer)? {
            Some(Wire::Url(url)) if !url.is_empty() => Ok(Some(url)),
            Some(Wire::Url(_)) | Some(Wire::Flag(false)) | None => Ok(None),
            Some(Wire::Flag(true)) => Err(D::Error::custom(
                "`clone` must be a repository URL or false",
            )),
        }
    }
}
