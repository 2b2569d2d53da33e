//! Task store abstraction.
//!
//! A task store holds the queue document and carries the notification
//! channel. Writes go to sub-paths of the document; there is no transaction
//! spanning a read and a later write.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::task::{QueueDocument, TaskRecord};
use crate::{QueueKey, Result, TaskName};

/// Stream of task names published on the queue channel.
///
/// The stream ends when the subscription is closed. An `Err` item means the
/// connection to the store was lost.
pub type Notifications = BoxStream<'static, Result<TaskName>>;

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Key of the queue document and channel.
    fn key(&self) -> &QueueKey;

    /// Whether the queue document exists.
    async fn queue_exists(&self) -> Result<bool>;

    /// Create an empty queue document unless one exists.
    ///
    /// Returns `true` if a document was created.
    async fn create_queue(&self) -> Result<bool>;

    /// Read the whole queue document.
    async fn document(&self) -> Result<QueueDocument>;

    /// Write a record at `tasks.<name>`, replacing any pending record.
    async fn put_task(&self, record: &TaskRecord) -> Result<()>;

    /// Delete `tasks.<name>`.
    async fn remove_task(&self, name: &TaskName) -> Result<()>;

    /// Announce a task on the queue channel.
    ///
    /// Only current subscribers see the message.
    async fn publish(&self, name: &TaskName) -> Result<()>;

    /// Start listening on the queue channel.
    async fn subscribe(&self) -> Result<Notifications>;

    /// Read and decode the pending record for `name`.
    async fn get_task(&self, name: &TaskName) -> Result<TaskRecord> {
        self.document().await?.task(name)
    }

    /// Names of all pending tasks.
    async fn pending_tasks(&self) -> Result<Vec<TaskName>> {
        Ok(self.document().await?.task_names())
    }
}
