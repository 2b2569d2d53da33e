//! Task names and queue keys.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Name of a pending task.
///
/// This is the repository name: it keys the record in the queue document,
/// travels as the notification payload and names the clone directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[serde(transparent)]
#[display("{_0}")]
pub struct TaskName(String);

impl TaskName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for TaskName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for TaskName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Key of the queue document, also used as the pub/sub channel name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{_0}")]
pub struct QueueKey(String);

impl QueueKey {
    pub const DEFAULT_NAMESPACE: &'static str = "ta";

    /// Key for the buildx queue of a deployment namespace.
    pub fn new(namespace: &str) -> Self {
        let namespace = namespace.trim_end_matches(':');
        Self(format!("{namespace}:task:buildx"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for QueueKey {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NAMESPACE)
    }
}
