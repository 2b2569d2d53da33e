//! buildq CLI: the queue worker and producer.

use anyhow::Context;
use buildq_config::{WorkerSettings, load_settings};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "buildq")]
#[command(about = "Build task queue over Redis", long_about = None)]
struct Cli {
    /// Worker settings file
    #[arg(long, env = "BUILDQ_CONFIG")]
    config: Option<PathBuf>,

    /// Redis URL
    #[arg(long, env = "BUILDQ_REDIS_URL")]
    redis_url: Option<String>,

    /// Queue key namespace
    #[arg(long, env = "BUILDQ_NAMESPACE")]
    namespace: Option<String>,

    /// Log filter, e.g. `debug` or `buildq_executor=debug` (defaults to RUST_LOG, then info)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the worker: bootstrap the builder, drain stored tasks, then watch
    Watch {
        /// Directory holding one working tree per repository
        #[arg(long, env = "BUILDQ_CLONE_ROOT")]
        clone_root: Option<PathBuf>,
        /// Buildx builder name
        #[arg(long, env = "BUILDQ_BUILDER")]
        builder: Option<String>,
        /// Log commands instead of running them; pending tasks stay queued
        #[arg(long)]
        dry_run: bool,
    },
    /// Queue a build action for a repository
    Enqueue {
        /// Repository key in the registry
        repo: String,
        /// Action name, e.g. build_unstable
        action: String,
        /// Release version substituted for $VERSION
        #[arg(long)]
        version: Option<String>,
        /// Repository registry file
        #[arg(long, env = "BUILDQ_REGISTRY")]
        registry: Option<PathBuf>,
    },
    /// List pending tasks
    Tasks,
    /// Validate a repository registry
    Validate {
        /// Path to the registry (defaults to the configured registry)
        path: Option<PathBuf>,
    },
}

fn init_tracing(log_level: Option<&str>, json: bool) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let fmt = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        fmt.json().init();
    } else {
        fmt.init();
    }
}

impl Cli {
    fn settings(&self) -> anyhow::Result<WorkerSettings> {
        let mut settings = load_settings(self.config.as_deref()).with_context(|| {
            match &self.config {
                Some(path) => format!("Failed to load settings from {}", path.display()),
                None => "Failed to load settings".to_string(),
            }
        })?;

        if let Some(url) = &self.redis_url {
            settings.redis_url = url.clone();
        }
        if let Some(namespace) = &self.namespace {
            settings.namespace = namespace.clone();
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref(), cli.json_logs);

    let mut settings = cli.settings()?;

    match cli.command {
        Commands::Watch {
            clone_root,
            builder,
            dry_run,
        } => {
            if let Some(root) = clone_root {
                settings.clone_root = root;
            }
            if let Some(builder) = builder {
                settings.builder = builder;
            }
            commands::watch::run(&settings, dry_run).await?;
        }
        Commands::Enqueue {
            repo,
            action,
            version,
            registry,
        } => {
            if let Some(registry) = registry {
                settings.registry = registry;
            }
            commands::queue::enqueue(&settings, &repo, &action, version.as_deref()).await?;
        }
        Commands::Tasks => {
            commands::queue::list(&settings).await?;
        }
        Commands::Validate { path } => {
            let path = path.unwrap_or_else(|| settings.registry.clone());
            commands::validate(&path)?;
        }
    }

    Ok(())
}
