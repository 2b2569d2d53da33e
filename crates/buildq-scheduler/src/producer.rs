//! Task producer.

use buildq_core::Result;
use buildq_core::repository::RepoConfig;
use buildq_core::store::TaskStore;
use buildq_core::task::TaskRecord;
use std::sync::Arc;
use tracing::{debug, info};

/// Creates tasks from repository configuration.
pub struct TaskProducer {
    store: Arc<dyn TaskStore>,
}

impl TaskProducer {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Queue `action` of `repo`, replacing any pending task for the repo.
    ///
    /// With a `version`, every `$VERSION` in the build command is replaced.
    /// The record is written before the notification is published.
    pub async fn create_task(
        &self,
        repo: &RepoConfig,
        action: &str,
        version: Option<&str>,
    ) -> Result<TaskRecord> {
        let config = repo.action(action)?;
        let source = repo.needs_source(action)?.then(|| repo.clone_url());
        let build = match version {
            Some(version) => config.build.with_version(version),
            None => config.build.clone(),
        };
        let record = TaskRecord::new(repo.task_name(), source, build);

        if self.store.create_queue().await? {
            debug!(key = %self.store.key(), "Initialized queue document");
        }
        self.store.put_task(&record).await?;
        self.store.publish(&record.name).await?;

        info!(
            task = %record.name,
            action = %action,
            version = version.unwrap_or("-"),
            "Task queued"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildq_core::task::BuildSpec;
    use buildq_core::{Error, TaskName};
    use buildq_store::MemoryTaskStore;
    use futures::StreamExt;

    fn args(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    fn repo() -> RepoConfig {
        RepoConfig::new("tubearchivist", "drone-test")
            .with_action(
                "build_unstable",
                BuildSpec::SingleCommand(args(&["build", "-t", "bbilly1/drone-test:unstable"])),
            )
            .with_action(
                "build_release",
                BuildSpec::SingleCommand(args(&["build", "-t", "img:$VERSION", "-t", "img:latest"])),
            )
            .with_action(
                "sync_es",
                BuildSpec::CommandSequence(vec![
                    args(&["docker", "pull", "es:$VERSION"]),
                    args(&["docker", "compose", "up", "-d"]),
                ]),
            )
    }

    fn producer() -> (Arc<MemoryTaskStore>, TaskProducer) {
        let store = Arc::new(MemoryTaskStore::default());
        (store.clone(), TaskProducer::new(store))
    }

    #[tokio::test]
    async fn test_create_task_writes_then_publishes() {
        let (store, producer) = producer();
        let mut notifications = store.subscribe().await.unwrap();

        let record = producer
            .create_task(&repo(), "build_unstable", None)
            .await
            .unwrap();

        assert_eq!(record.name, TaskName::from("drone-test"));
        assert_eq!(
            record.source.as_deref(),
            Some("https://github.com/tubearchivist/drone-test.git")
        );
        assert_eq!(store.get_task(&record.name).await.unwrap(), record);
        assert_eq!(notifications.next().await.unwrap().unwrap(), record.name);
    }

    #[tokio::test]
    async fn test_version_substitution() {
        let (_, producer) = producer();

        let record = producer
            .create_task(&repo(), "build_release", Some("v1.2.0"))
            .await
            .unwrap();

        assert_eq!(
            record.build,
            BuildSpec::SingleCommand(args(&["build", "-t", "img:v1.2.0", "-t", "img:latest"]))
        );
    }

    #[tokio::test]
    async fn test_without_version_build_is_verbatim() {
        let (_, producer) = producer();

        let record = producer
            .create_task(&repo(), "build_release", None)
            .await
            .unwrap();

        assert_eq!(record.build, repo().action("build_release").unwrap().build);
    }

    #[tokio::test]
    async fn test_sync_es_is_sourceless_and_substituted() {
        let (_, producer) = producer();

        let record = producer
            .create_task(&repo(), "sync_es", Some("8.11.0"))
            .await
            .unwrap();

        assert_eq!(record.source, None);
        assert_eq!(
            record.build,
            BuildSpec::CommandSequence(vec![
                args(&["docker", "pull", "es:8.11.0"]),
                args(&["docker", "compose", "up", "-d"]),
            ])
        );
    }

    #[tokio::test]
    async fn test_second_enqueue_overwrites_first() {
        let (store, producer) = producer();

        producer
            .create_task(&repo(), "build_unstable", None)
            .await
            .unwrap();
        let second = producer
            .create_task(&repo(), "build_release", Some("v2"))
            .await
            .unwrap();

        let document = store.document().await.unwrap();
        assert_eq!(document.task_names(), vec![second.name.clone()]);
        assert_eq!(document.task(&second.name).unwrap(), second);
    }

    #[tokio::test]
    async fn test_unknown_action_writes_nothing() {
        let (store, producer) = producer();
        let mut notifications = store.subscribe().await.unwrap();

        let err = producer
            .create_task(&repo(), "deploy", None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert!(!store.queue_exists().await.unwrap());

        store.publish(&TaskName::from("marker")).await.unwrap();
        assert_eq!(
            notifications.next().await.unwrap().unwrap(),
            TaskName::from("marker")
        );
    }
}
