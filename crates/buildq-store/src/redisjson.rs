//! Redis task store.
//!
//! The queue document lives under one key and is manipulated with RedisJSON
//! commands, so single-path writes are atomic on the server. Notifications
//! use plain Redis pub/sub on a channel named like the key.

use async_trait::async_trait;
use buildq_core::store::{Notifications, TaskStore};
use buildq_core::task::{QueueDocument, TaskRecord};
use buildq_core::{Error, QueueKey, Result, TaskName};
use futures::StreamExt;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tracing::{debug, info, warn};

use crate::{StoreError, StoreResult};

/// Task store backed by Redis with the RedisJSON module.
pub struct RedisTaskStore {
    client: redis::Client,
    conn: MultiplexedConnection,
    key: QueueKey,
}

impl RedisTaskStore {
    /// Open a connection to `url`, e.g. `redis://localhost:6379`.
    pub async fn connect(url: &str, key: QueueKey) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!(key = %key, "Connected to task store");
        Ok(Self { client, conn, key })
    }

    /// JSONPath of a task record inside the document.
    fn task_path(name: &TaskName) -> StoreResult<String> {
        let name = name.as_str();
        if name.is_empty() || name.contains(['\'', '\\', '[', ']']) {
            return Err(StoreError::InvalidTaskName(name.to_string()));
        }
        Ok(format!("$.tasks['{}']", name))
    }

    async fn read_document(&self) -> StoreResult<QueueDocument> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("JSON.GET")
            .arg(self.key.as_str())
            .query_async(&mut conn)
            .await?;
        let raw = raw.ok_or_else(|| StoreError::MissingQueue(self.key.to_string()))?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn write_task(&self, record: &TaskRecord) -> StoreResult<()> {
        let path = Self::task_path(&record.name)?;
        let value = serde_json::to_string(record)?;
        let mut conn = self.conn.clone();

        // Nil means the parent path (`$.tasks`) does not exist.
        let reply: Option<String> = redis::cmd("JSON.SET")
            .arg(self.key.as_str())
            .arg(&path)
            .arg(value)
            .query_async(&mut conn)
            .await?;
        if reply.is_none() {
            return Err(StoreError::MissingQueue(self.key.to_string()));
        }
        Ok(())
    }

    async fn delete_task(&self, name: &TaskName) -> StoreResult<()> {
        let path = Self::task_path(name)?;
        let mut conn = self.conn.clone();
        let deleted: i64 = redis::cmd("JSON.DEL")
            .arg(self.key.as_str())
            .arg(&path)
            .query_async(&mut conn)
            .await?;
        if deleted == 0 {
            warn!(task = %name, "Task was already gone from the queue document");
        }
        Ok(())
    }

    async fn init_document(&self) -> StoreResult<bool> {
        let document = serde_json::to_string(&QueueDocument::new())?;
        let mut conn = self.conn.clone();

        // NX makes creation a no-op when the key exists.
        let reply: Option<String> = redis::cmd("JSON.SET")
            .arg(self.key.as_str())
            .arg("$")
            .arg(document)
            .arg("NX")
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }
}

#[async_trait]
impl TaskStore for RedisTaskStore {
    fn key(&self) -> &QueueKey {
        &self.key
    }

    async fn queue_exists(&self) -> Result<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn
            .exists(self.key.as_str())
            .await
            .map_err(StoreError::from)?;
        Ok(exists)
    }

    async fn create_queue(&self) -> Result<bool> {
        let created = self.init_document().await?;
        if created {
            info!(key = %self.key, "Created queue document");
        } else {
            debug!(key = %self.key, "Queue document already exists");
        }
        Ok(created)
    }

    async fn document(&self) -> Result<QueueDocument> {
        Ok(self.read_document().await?)
    }

    async fn put_task(&self, record: &TaskRecord) -> Result<()> {
        Ok(self.write_task(record).await?)
    }

    async fn remove_task(&self, name: &TaskName) -> Result<()> {
        Ok(self.delete_task(name).await?)
    }

    async fn publish(&self, name: &TaskName) -> Result<()> {
        let mut conn = self.conn.clone();
        let receivers: i64 = conn
            .publish(self.key.as_str(), name.as_str())
            .await
            .map_err(StoreError::from)?;
        debug!(task = %name, receivers, "Published task notification");
        Ok(())
    }

    async fn subscribe(&self) -> Result<Notifications> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(StoreError::from)?;
        pubsub
            .subscribe(self.key.as_str())
            .await
            .map_err(StoreError::from)?;
        info!(channel = %self.key, "Subscribed to task notifications");

        let stream = pubsub.into_on_message().map(|msg| {
            msg.get_payload::<String>()
                .map(TaskName::from)
                .map_err(|e| Error::InvalidInput(format!("undecodable notification: {e}")))
        });
        Ok(Box::pin(stream))
    }
}
