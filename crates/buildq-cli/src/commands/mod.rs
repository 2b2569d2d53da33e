//! CLI command implementations.

pub mod queue;
pub mod watch;

use anyhow::{Context, Result};
use buildq_config::WorkerSettings;
use buildq_core::store::TaskStore;
use std::path::Path;
use std::sync::Arc;

/// Open the Redis queue named by `settings`.
pub async fn connect(settings: &WorkerSettings) -> Result<Arc<dyn TaskStore>> {
    let store = buildq_store::connect(&settings.redis_url, settings.queue_key())
        .await
        .with_context(|| format!("Failed to connect to Redis at {}", settings.redis_url))?;
    Ok(Arc::new(store))
}

pub fn validate(path: &Path) -> Result<()> {
    let registry = buildq_config::load_registry(path)
        .with_context(|| format!("Invalid registry: {}", path.display()))?;

    println!("Registry is valid: {} repositories", registry.len());
    for (key, repo) in registry.iter() {
        let actions: Vec<&str> = repo.actions.keys().map(String::as_str).collect();
        println!(
            "  {} ({}/{}): {}",
            key,
            repo.gh_user,
            repo.gh_repo,
            actions.join(", ")
        );
    }
    Ok(())
}
