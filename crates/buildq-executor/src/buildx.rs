//! The docker buildx builder.

use buildq_core::Result;
use buildq_core::executor::{CommandLine, CommandRunner};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Drives `docker buildx` for one named builder.
pub struct Buildx {
    runner: Arc<dyn CommandRunner>,
    builder: String,
}

impl Buildx {
    pub fn new(runner: Arc<dyn CommandRunner>, builder: impl Into<String>) -> Self {
        Self {
            runner,
            builder: builder.into(),
        }
    }

    fn command(&self) -> CommandLine {
        CommandLine::new("docker").arg("buildx")
    }

    /// Inspect the current builder.
    pub async fn inspect(&self) -> Result<BTreeMap<String, String>> {
        let output = self.runner.capture(&self.command().arg("inspect")).await?;
        Ok(parse_inspect(&output))
    }

    /// Make sure the configured builder is the active one.
    ///
    /// Creates, selects and boots the builder when the active builder's name
    /// does not start with the configured name. Returns `true` if it did.
    pub async fn bootstrap(&self) -> Result<bool> {
        let info = self.inspect().await?;
        let current = info.get("Name").map(String::as_str).unwrap_or_default();

        if current.starts_with(&self.builder) {
            debug!(builder = %current, "Builder already active");
            return Ok(false);
        }

        info!(builder = %self.builder, current = %current, "Creating buildx builder");
        self.runner
            .run(&self.command().args(["create", "--name", self.builder.as_str()]))
            .await?;
        self.runner
            .run(&self.command().args(["use", self.builder.as_str()]))
            .await?;
        self.runner
            .run(&self.command().args(["inspect", "--bootstrap"]))
            .await?;

        info!(builder = %self.builder, "Builder ready");
        Ok(true)
    }

    /// `docker buildx <args...> <context>`.
    pub async fn build(&self, args: &[String], context: &Path) -> Result<()> {
        let command = self
            .command()
            .args(args.iter().cloned())
            .arg(context.display().to_string());
        self.runner.run(&command).await
    }
}

/// Parse the `Key: value` lines printed by `docker buildx inspect`.
///
/// Node sections repeat keys, so the first occurrence wins. Lines without a
/// value are headings and are skipped.
pub fn parse_inspect(output: &str) -> BTreeMap<String, String> {
    let mut info = BTreeMap::new();
    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            continue;
        }
        info.entry(key.to_string())
            .or_insert_with(|| value.to_string());
    }
    info
}
