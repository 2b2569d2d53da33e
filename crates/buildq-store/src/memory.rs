//! In-memory task store.
//!
//! Mirrors the Redis semantics the worker relies on: notifications reach
//! only the subscribers present at publish time, and nothing is buffered for
//! late subscribers.

use async_trait::async_trait;
use buildq_core::store::{Notifications, TaskStore};
use buildq_core::task::{QueueDocument, TaskRecord};
use buildq_core::{QueueKey, Result, TaskName};
use futures::StreamExt;
use tokio::sync::{RwLock, broadcast};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, warn};

use crate::StoreError;

const CHANNEL_CAPACITY: usize = 64;

/// Task store kept in process memory.
pub struct MemoryTaskStore {
    key: QueueKey,
    document: RwLock<Option<QueueDocument>>,
    channel: RwLock<Option<broadcast::Sender<TaskName>>>,
}

impl MemoryTaskStore {
    pub fn new(key: QueueKey) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            key,
            document: RwLock::new(None),
            channel: RwLock::new(Some(tx)),
        }
    }

    /// Simulate losing the connection.
    ///
    /// Open subscriptions end and every later operation fails with
    /// `StoreUnavailable`.
    pub async fn disconnect(&self) {
        self.channel.write().await.take();
    }

    async fn sender(&self) -> Result<broadcast::Sender<TaskName>> {
        let channel = self.channel.read().await;
        Ok(channel.clone().ok_or(StoreError::Disconnected)?)
    }

    async fn ensure_connected(&self) -> Result<()> {
        self.sender().await.map(|_| ())
    }
}

impl Default for MemoryTaskStore {
    fn default() -> Self {
        Self::new(QueueKey::default())
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    fn key(&self) -> &QueueKey {
        &self.key
    }

    async fn queue_exists(&self) -> Result<bool> {
        self.ensure_connected().await?;
        Ok(self.document.read().await.is_some())
    }

    async fn create_queue(&self) -> Result<bool> {
        self.ensure_connected().await?;
        let mut document = self.document.write().await;
        if document.is_some() {
            return Ok(false);
        }
        *document = Some(QueueDocument::new());
        Ok(true)
    }

    async fn document(&self) -> Result<QueueDocument> {
        self.ensure_connected().await?;
        let document = self.document.read().await;
        Ok(document
            .clone()
            .ok_or_else(|| StoreError::MissingQueue(self.key.to_string()))?)
    }

    async fn put_task(&self, record: &TaskRecord) -> Result<()> {
        self.ensure_connected().await?;
        let mut document = self.document.write().await;
        let document = document
            .as_mut()
            .ok_or_else(|| StoreError::MissingQueue(self.key.to_string()))?;
        document.insert(record)
    }

    async fn remove_task(&self, name: &TaskName) -> Result<()> {
        self.ensure_connected().await?;
        let mut document = self.document.write().await;
        if let Some(document) = document.as_mut() {
            if !document.remove(name) {
                warn!(task = %name, "Task was already gone from the queue document");
            }
        }
        Ok(())
    }

    async fn publish(&self, name: &TaskName) -> Result<()> {
        let sender = self.sender().await?;
        // A send error only means nobody is listening.
        let receivers = sender.send(name.clone()).unwrap_or(0);
        debug!(task = %name, receivers, "Published task notification");
        Ok(())
    }

    async fn subscribe(&self) -> Result<Notifications> {
        let receiver = self.sender().await?.subscribe();
        let key = self.key.clone();

        let stream = BroadcastStream::new(receiver).filter_map(move |item| {
            let item = match item {
                Ok(name) => Some(Ok(name)),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(channel = %key, skipped, "Subscriber lagged; notifications dropped");
                    None
                }
            };
            futures::future::ready(item)
        });
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildq_core::Error;
    use buildq_core::task::BuildSpec;

    fn record(name: &str, tag: &str) -> TaskRecord {
        TaskRecord::new(
            TaskName::from(name),
            None,
            BuildSpec::SingleCommand(vec!["build".into(), "-t".into(), tag.into()]),
        )
    }

    #[tokio::test]
    async fn test_create_queue_is_idempotent() {
        let store = MemoryTaskStore::default();
        assert!(!store.queue_exists().await.unwrap());
        assert!(store.create_queue().await.unwrap());

        let created = store.document().await.unwrap().created;
        assert!(!store.create_queue().await.unwrap());
        assert_eq!(store.document().await.unwrap().created, created);
    }

    #[tokio::test]
    async fn test_put_without_queue_fails() {
        let store = MemoryTaskStore::default();
        let err = store.put_task(&record("app", "app:1")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_last_put_wins() {
        let store = MemoryTaskStore::default();
        store.create_queue().await.unwrap();
        let second = record("app", "app:2");
        store.put_task(&record("app", "app:1")).await.unwrap();
        store.put_task(&second).await.unwrap();

        let pending = store.pending_tasks().await.unwrap();
        assert_eq!(pending, vec![TaskName::from("app")]);
        assert_eq!(
            store.get_task(&TaskName::from("app")).await.unwrap(),
            second
        );
    }

    #[tokio::test]
    async fn test_remove_task() {
        let store = MemoryTaskStore::default();
        store.create_queue().await.unwrap();
        store.put_task(&record("app", "app:1")).await.unwrap();

        store.remove_task(&TaskName::from("app")).await.unwrap();
        store.remove_task(&TaskName::from("app")).await.unwrap();
        assert!(store.document().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_only_reaches_current_subscribers() {
        let store = MemoryTaskStore::default();
        store.publish(&TaskName::from("early")).await.unwrap();

        let mut notifications = store.subscribe().await.unwrap();
        store.publish(&TaskName::from("late")).await.unwrap();

        let name = notifications.next().await.unwrap().unwrap();
        assert_eq!(name, TaskName::from("late"));
    }

    #[tokio::test]
    async fn test_disconnect_ends_subscriptions() {
        let store = MemoryTaskStore::default();
        store.create_queue().await.unwrap();
        let mut notifications = store.subscribe().await.unwrap();

        store.disconnect().await;

        assert!(notifications.next().await.is_none());
        let err = store.document().await.unwrap_err();
        assert!(err.is_fatal());
    }
}
