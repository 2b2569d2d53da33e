//! Queue watcher: the worker loop.

use buildq_core::store::{Notifications, TaskStore};
use buildq_core::{Error, Result, TaskName};
use buildq_executor::TaskExecutor;
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Watches the queue and hands tasks to the executor, one at a time.
pub struct Watcher {
    store: Arc<dyn TaskStore>,
    executor: TaskExecutor,
}

impl Watcher {
    pub fn new(executor: TaskExecutor) -> Self {
        Self {
            store: executor.store().clone(),
            executor,
        }
    }

    /// Make sure the buildx builder exists. Returns `true` if it was created.
    pub async fn bootstrap(&self) -> Result<bool> {
        self.executor.buildx().bootstrap().await
    }

    /// Execute every task already in the queue document, in document order.
    ///
    /// Returns the number of tasks found.
    pub async fn check_stored(&self) -> Result<usize> {
        let pending = self.store.pending_tasks().await?;
        if pending.is_empty() {
            info!("No stored tasks");
            return Ok(0);
        }

        info!(count = pending.len(), "Processing stored tasks");
        for name in &pending {
            self.dispatch(name).await?;
        }
        Ok(pending.len())
    }

    pub async fn subscribe(&self) -> Result<Notifications> {
        self.store.subscribe().await
    }

    /// Process notifications until `shutdown` resolves.
    ///
    /// A task interrupted by shutdown is killed and stays pending. Returns an
    /// error only when the store is lost.
    pub async fn listen(
        &self,
        mut notifications: Notifications,
        shutdown: impl Future<Output = ()>,
    ) -> Result<()> {
        tokio::pin!(shutdown);
        info!(channel = %self.store.key(), "Waiting for tasks");

        loop {
            let next = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping watcher");
                    return Ok(());
                }
                next = notifications.next() => next,
            };

            let name = match next {
                Some(Ok(name)) => name,
                Some(Err(e)) if e.is_fatal() => return Err(e),
                Some(Err(e)) => {
                    warn!(error = %e, "Ignoring notification");
                    continue;
                }
                None => {
                    return Err(Error::StoreUnavailable(
                        "notification stream closed".to_string(),
                    ));
                }
            };

            tokio::select! {
                _ = &mut shutdown => {
                    warn!(task = %name, "Shutdown requested, task left pending");
                    return Ok(());
                }
                result = self.dispatch(&name) => result?,
            }
        }
    }

    /// Subscribe and process notifications until `shutdown` resolves.
    pub async fn watch(&self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let notifications = self.subscribe().await?;
        self.listen(notifications, shutdown).await
    }

    /// The full worker: bootstrap, queue init, recovery pass, then watch.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<()> {
        tokio::pin!(shutdown);

        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested during startup");
                return Ok(());
            }
            result = self.start() => result?,
        }

        self.watch(shutdown).await
    }

    async fn start(&self) -> Result<()> {
        if self.bootstrap().await? {
            info!("Created buildx builder");
        }
        self.store.create_queue().await?;
        self.check_stored().await?;
        Ok(())
    }

    /// Run one task. Only fatal errors are returned.
    async fn dispatch(&self, name: &TaskName) -> Result<()> {
        match self.executor.run(name).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_fatal() => {
                error!(task = %name, error = %e, "Task store unavailable");
                Err(e)
            }
            Err(e) if e.is_missing_task() => {
                info!(task = %name, "Task no longer queued, skipping");
                Ok(())
            }
            Err(e) => {
                error!(task = %name, error = %e, "Task failed, left pending");
                Ok(())
            }
        }
    }
}
