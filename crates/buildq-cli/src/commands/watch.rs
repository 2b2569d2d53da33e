//! The worker command.

use anyhow::{Context, Result};
use buildq_config::WorkerSettings;
use buildq_executor::{CommandRunner, ProcessRunner, RecordingRunner, TaskExecutor};
use buildq_scheduler::Watcher;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn run(settings: &WorkerSettings, dry_run: bool) -> Result<()> {
    let store = super::connect(settings).await?;
    let runner: Arc<dyn CommandRunner> = if dry_run {
        Arc::new(RecordingRunner::new())
    } else {
        Arc::new(ProcessRunner::new())
    };

    info!(
        key = %settings.queue_key(),
        clone_root = %settings.clone_root.display(),
        builder = %settings.builder,
        runner = runner.name(),
        "Starting worker"
    );

    // A dry run builds nothing, so records must not be removed.
    let executor = TaskExecutor::new(store, runner, &settings.clone_root, &settings.builder)
        .keep_records(dry_run);
    Watcher::new(executor)
        .run(shutdown_signal())
        .await
        .context("Worker stopped")?;

    info!("Worker stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}
