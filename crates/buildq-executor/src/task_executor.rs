//! The task executor: load, sync, build, remove.

use buildq_core::executor::{CommandLine, CommandRunner};
use buildq_core::store::TaskStore;
use buildq_core::task::{BuildSpec, TaskRecord};
use buildq_core::{Error, Result, TaskName};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{Buildx, GitService, SyncOutcome};

/// Summary of one successful task execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRun {
    pub name: TaskName,
    pub sync: SyncOutcome,
    /// Commands run for the build step, in order.
    pub commands: usize,
}

/// Executes pending tasks one at a time.
pub struct TaskExecutor {
    store: Arc<dyn TaskStore>,
    runner: Arc<dyn CommandRunner>,
    git: GitService,
    buildx: Buildx,
    clone_root: PathBuf,
    keep_records: bool,
}

impl TaskExecutor {
    pub fn new(
        store: Arc<dyn TaskStore>,
        runner: Arc<dyn CommandRunner>,
        clone_root: impl Into<PathBuf>,
        builder: impl Into<String>,
    ) -> Self {
        let clone_root = clone_root.into();
        Self {
            git: GitService::new(runner.clone(), clone_root.clone()),
            buildx: Buildx::new(runner.clone(), builder),
            store,
            runner,
            clone_root,
            keep_records: false,
        }
    }

    /// Leave records in the queue after a successful run.
    ///
    /// Used for dry runs, where nothing was actually built.
    pub fn keep_records(mut self, keep: bool) -> Self {
        self.keep_records = keep;
        self
    }

    pub fn buildx(&self) -> &Buildx {
        &self.buildx
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Run the pending task `name`.
    ///
    /// Any failure stops the remaining steps; the record then stays in the
    /// queue document.
    pub async fn run(&self, name: &TaskName) -> Result<TaskRun> {
        let record = self.store.get_task(name).await?;
        info!(task = %name, "Executing task");

        let sync = self.git.sync(&record).await?;
        let commands = self.build(&record).await?;

        if self.keep_records {
            info!(task = %name, commands, "Dry run finished, task left pending");
        } else {
            self.store.remove_task(name).await?;
            info!(task = %name, commands, "Task completed");
        }

        Ok(TaskRun {
            name: name.clone(),
            sync,
            commands,
        })
    }

    async fn build(&self, record: &TaskRecord) -> Result<usize> {
        match &record.build {
            BuildSpec::SingleCommand(args) => {
                let context = record.working_dir(&self.clone_root);
                self.buildx.build(args, &context).await?;
                Ok(1)
            }
            BuildSpec::CommandSequence(argvs) => {
                let commands = argvs
                    .iter()
                    .map(|argv| {
                        CommandLine::from_argv(argv).ok_or_else(|| Error::MalformedTask {
                            name: record.name.to_string(),
                            message: "empty command in build sequence".to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;

                if commands.is_empty() {
                    warn!(task = %record.name, "Build sequence is empty");
                }
                for command in &commands {
                    self.runner.run(command).await?;
                }
                Ok(commands.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordingRunner;
    use buildq_store::MemoryTaskStore;
    use tempfile::TempDir;

    const URL: &str = "https://github.com/tubearchivist/drone-test.git";

    struct Fixture {
        store: Arc<MemoryTaskStore>,
        runner: Arc<RecordingRunner>,
        executor: TaskExecutor,
        tmp: TempDir,
    }

    async fn fixture(runner: RecordingRunner) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryTaskStore::default());
        store.create_queue().await.unwrap();
        let runner = Arc::new(runner);
        let executor = TaskExecutor::new(store.clone(), runner.clone(), tmp.path(), "tubearchivist");
        Fixture {
            store,
            runner,
            executor,
            tmp,
        }
    }

    fn flat(name: &str, source: Option<&str>) -> TaskRecord {
        TaskRecord::new(
            TaskName::from(name),
            source.map(String::from),
            BuildSpec::SingleCommand(vec!["build".into(), "-t".into(), "app:1".into()]),
        )
    }

    fn sequence(name: &str, argvs: &[&[&str]]) -> TaskRecord {
        TaskRecord::new(
            TaskName::from(name),
            None,
            BuildSpec::CommandSequence(
                argvs
                    .iter()
                    .map(|argv| argv.iter().map(|a| a.to_string()).collect())
                    .collect(),
            ),
        )
    }

    #[tokio::test]
    async fn test_flat_build_clones_builds_and_removes() {
        let f = fixture(RecordingRunner::new()).await;
        f.store.put_task(&flat("drone-test", Some(URL))).await.unwrap();

        let run = f.executor.run(&TaskName::from("drone-test")).await.unwrap();

        let dir = f.tmp.path().join("drone-test");
        assert_eq!(run.sync, SyncOutcome::Cloned(dir.clone()));
        assert_eq!(run.commands, 1);
        assert_eq!(
            f.runner.history_lines(),
            vec![
                format!("git clone {} {}", URL, dir.display()),
                format!("docker buildx build -t app:1 {}", dir.display()),
            ]
        );
        assert!(f.store.document().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_existing_tree_is_pulled() {
        let f = fixture(RecordingRunner::new()).await;
        let dir = f.tmp.path().join("drone-test");
        std::fs::create_dir(&dir).unwrap();
        f.store.put_task(&flat("drone-test", Some(URL))).await.unwrap();

        let run = f.executor.run(&TaskName::from("drone-test")).await.unwrap();

        assert_eq!(run.sync, SyncOutcome::Updated(dir.clone()));
        assert_eq!(
            f.runner.history_lines()[0],
            format!("git -C {} pull", dir.display())
        );
    }

    #[tokio::test]
    async fn test_sourceless_sequence_runs_in_order() {
        let f = fixture(RecordingRunner::new()).await;
        f.store
            .put_task(&sequence(
                "es",
                &[&["docker", "compose", "pull"], &["docker", "compose", "up", "-d"]],
            ))
            .await
            .unwrap();

        let run = f.executor.run(&TaskName::from("es")).await.unwrap();

        assert_eq!(run.sync, SyncOutcome::Skipped);
        assert_eq!(run.commands, 2);
        assert_eq!(
            f.runner.history_lines(),
            vec!["docker compose pull", "docker compose up -d"]
        );
    }

    #[tokio::test]
    async fn test_failed_build_keeps_record() {
        let runner = RecordingRunner::new()
            .failing_when(|c| c.args.first().is_some_and(|a| a == "buildx").then_some(1));
        let f = fixture(runner).await;
        let record = flat("drone-test", Some(URL));
        f.store.put_task(&record).await.unwrap();

        let err = f.executor.run(&record.name).await.unwrap_err();

        assert!(matches!(err, Error::CommandFailed { code: Some(1), .. }));
        assert_eq!(f.store.get_task(&record.name).await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_failed_sync_skips_build() {
        let runner = RecordingRunner::new().failing_when(|c| (c.program == "git").then_some(128));
        let f = fixture(runner).await;
        f.store.put_task(&flat("drone-test", Some(URL))).await.unwrap();

        assert!(f.executor.run(&TaskName::from("drone-test")).await.is_err());
        assert_eq!(f.runner.history().len(), 1);
        assert!(f.store.document().await.unwrap().contains(&TaskName::from("drone-test")));
    }

    #[tokio::test]
    async fn test_sequence_stops_at_first_failure() {
        let runner = RecordingRunner::new().failing_when(|c| (c.program == "false").then_some(1));
        let f = fixture(runner).await;
        f.store
            .put_task(&sequence("es", &[&["true"], &["false"], &["echo", "never"]]))
            .await
            .unwrap();

        assert!(f.executor.run(&TaskName::from("es")).await.is_err());
        assert_eq!(f.runner.history_lines(), vec!["true", "false"]);
        assert!(f.store.document().await.unwrap().contains(&TaskName::from("es")));
    }

    #[tokio::test]
    async fn test_empty_argv_is_malformed() {
        let f = fixture(RecordingRunner::new()).await;
        f.store
            .put_task(&sequence("es", &[&["true"], &[]]))
            .await
            .unwrap();

        let err = f.executor.run(&TaskName::from("es")).await.unwrap_err();

        assert!(matches!(err, Error::MalformedTask { .. }));
        assert!(f.runner.history().is_empty());
    }

    #[tokio::test]
    async fn test_kept_record_survives_successful_run() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryTaskStore::default());
        store.create_queue().await.unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let executor = TaskExecutor::new(store.clone(), runner.clone(), tmp.path(), "tubearchivist")
            .keep_records(true);
        let record = flat("drone-test", Some(URL));
        store.put_task(&record).await.unwrap();

        let run = executor.run(&record.name).await.unwrap();

        assert_eq!(run.commands, 1);
        assert_eq!(runner.history().len(), 2);
        assert_eq!(store.get_task(&record.name).await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_missing_task_is_not_found() {
        let f = fixture(RecordingRunner::new()).await;

        let err = f.executor.run(&TaskName::from("gone")).await.unwrap_err();

        assert!(err.is_missing_task());
        assert!(f.runner.history().is_empty());
    }
}
