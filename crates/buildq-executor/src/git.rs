//! Source sync with git.

use buildq_core::Result;
use buildq_core::executor::{CommandLine, CommandRunner};
use buildq_core::task::TaskRecord;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// What a sync did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The task needs no working tree.
    Skipped,
    /// A fresh clone was made into the directory.
    Cloned(PathBuf),
    /// An existing working tree was pulled.
    Updated(PathBuf),
}

impl SyncOutcome {
    pub fn working_dir(&self) -> Option<&Path> {
        match self {
            SyncOutcome::Skipped => None,
            SyncOutcome::Cloned(dir) | SyncOutcome::Updated(dir) => Some(dir),
        }
    }
}

/// Keeps one working tree per repository under a clone root.
pub struct GitService {
    runner: Arc<dyn CommandRunner>,
    clone_root: PathBuf,
}

impl GitService {
    pub fn new(runner: Arc<dyn CommandRunner>, clone_root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            clone_root: clone_root.into(),
        }
    }

    /// Bring the working tree of `record` up to date.
    ///
    /// Pulls when the directory exists, clones otherwise.
    pub async fn sync(&self, record: &TaskRecord) -> Result<SyncOutcome> {
        let Some(url) = record.source.as_deref() else {
            debug!(task = %record.name, "No source to sync");
            return Ok(SyncOutcome::Skipped);
        };

        let dir = record.working_dir(&self.clone_root);
        if tokio::fs::try_exists(&dir).await? {
            info!(task = %record.name, path = %dir.display(), "Pulling repository");
            self.runner.run(&pull_command(&dir)).await?;
            return Ok(SyncOutcome::Updated(dir));
        }

        tokio::fs::create_dir_all(&self.clone_root).await?;
        info!(task = %record.name, clone_url = %url, path = %dir.display(), "Cloning repository");
        self.runner.run(&clone_command(url, &dir)).await?;
        Ok(SyncOutcome::Cloned(dir))
    }
}

fn pull_command(dir: &Path) -> CommandLine {
    CommandLine::new("git")
        .arg("-C")
        .arg(dir.display().to_string())
        .arg("pull")
}

fn clone_command(url: &str, dir: &Path) -> CommandLine {
    CommandLine::new("git")
        .arg("clone")
        .arg(url)
        .arg(dir.display().to_string())
}
