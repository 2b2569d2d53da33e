//! Producer-side commands.

use anyhow::{Context, Result};
use buildq_config::{WorkerSettings, load_registry};
use buildq_core::task::BuildSpec;
use buildq_scheduler::TaskProducer;

/// Queue `action` of registry entry `repo`.
pub async fn enqueue(
    settings: &WorkerSettings,
    repo: &str,
    action: &str,
    version: Option<&str>,
) -> Result<()> {
    let registry = load_registry(&settings.registry)
        .with_context(|| format!("Failed to load registry: {}", settings.registry.display()))?;
    let repo_config = registry.repo(repo)?;

    let store = super::connect(settings).await?;
    let record = TaskProducer::new(store)
        .create_task(repo_config, action, version)
        .await
        .with_context(|| format!("Failed to queue {} for {}", action, repo))?;

    println!("Queued task '{}'", record.name);
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// Print the pending tasks of the queue.
pub async fn list(settings: &WorkerSettings) -> Result<()> {
    let store = super::connect(settings).await?;
    if !store.queue_exists().await? {
        println!("Queue {} does not exist yet", store.key());
        return Ok(());
    }

    let document = store.document().await?;
    println!(
        "Queue {} (created {})",
        store.key(),
        document.created.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if document.is_empty() {
        println!("No pending tasks");
        return Ok(());
    }

    for name in document.task_names() {
        match document.task(&name) {
            Ok(record) => println!(
                "{:<24} {}  {}  {}",
                name,
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.source.as_deref().unwrap_or("-"),
                describe_build(&record.build)
            ),
            Err(e) => println!("{:<24} <{}>", name, e),
        }
    }
    Ok(())
}

fn describe_build(build: &BuildSpec) -> String {
    match build {
        BuildSpec::SingleCommand(args) => format!("docker buildx {}", args.join(" ")),
        BuildSpec::CommandSequence(commands) => commands
            .iter()
            .map(|argv| argv.join(" "))
            .collect::<Vec<_>>()
            .join(" && "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_build() {
        let flat = BuildSpec::SingleCommand(vec!["build".into(), "--push".into()]);
        assert_eq!(describe_build(&flat), "docker buildx build --push");

        let sequence = BuildSpec::CommandSequence(vec![
            vec!["docker".into(), "compose".into(), "pull".into()],
            vec!["docker".into(), "compose".into(), "up".into()],
        ]);
        assert_eq!(
            describe_build(&sequence),
            "docker compose pull && docker compose up"
        );
    }
}
