//! Recording command runner.
//!
//! Records every command instead of spawning it. Used by `buildq watch
//! --dry-run` and as the test double for the executor and the watcher.

use async_trait::async_trait;
use buildq_core::executor::{CommandLine, CommandRunner};
use buildq_core::{Error, Result};
use std::sync::{Mutex, PoisonError};
use tracing::info;

type OutputFn = dyn Fn(&CommandLine, &[CommandLine]) -> String + Send + Sync;
type FailureFn = dyn Fn(&CommandLine) -> Option<i32> + Send + Sync;

/// A runner that never spawns anything.
///
/// By default every command succeeds and captures an empty stdout. Failures
/// and captured output can be scripted.
#[derive(Default)]
pub struct RecordingRunner {
    history: Mutex<Vec<CommandLine>>,
    output: Option<Box<OutputFn>>,
    failure: Option<Box<FailureFn>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the stdout returned by `capture`.
    ///
    /// The closure sees the command and every command recorded before it.
    pub fn with_output(
        mut self,
        output: impl Fn(&CommandLine, &[CommandLine]) -> String + Send + Sync + 'static,
    ) -> Self {
        self.output = Some(Box::new(output));
        self
    }

    /// Make matching commands exit with the returned code.
    pub fn failing_when(
        mut self,
        failure: impl Fn(&CommandLine) -> Option<i32> + Send + Sync + 'static,
    ) -> Self {
        self.failure = Some(Box::new(failure));
        self
    }

    /// All commands recorded so far, oldest first.
    pub fn history(&self) -> Vec<CommandLine> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded commands rendered as strings.
    pub fn history_lines(&self) -> Vec<String> {
        self.history().iter().map(ToString::to_string).collect()
    }

    fn record(&self, command: &CommandLine) -> Result<Vec<CommandLine>> {
        let earlier = {
            let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
            let earlier = history.clone();
            history.push(command.clone());
            earlier
        };

        if let Some(code) = self.failure.as_ref().and_then(|fail| fail(command)) {
            return Err(Error::CommandFailed {
                command: command.to_string(),
                code: Some(code),
            });
        }
        Ok(earlier)
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn run(&self, command: &CommandLine) -> Result<()> {
        info!(command = %command, "Would run command");
        self.record(command)?;
        Ok(())
    }

    async fn capture(&self, command: &CommandLine) -> Result<String> {
        let earlier = self.record(command)?;
        Ok(self
            .output
            .as_ref()
            .map(|output| output(command, &earlier))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_in_order() {
        let runner = RecordingRunner::new();
        runner.run(&CommandLine::new("git").arg("pull")).await.unwrap();
        runner.capture(&CommandLine::new("docker").arg("info")).await.unwrap();

        assert_eq!(runner.history_lines(), vec!["git pull", "docker info"]);
    }

    #[tokio::test]
    async fn test_scripted_failure_is_still_recorded() {
        let runner = RecordingRunner::new()
            .failing_when(|c| (c.program == "git").then_some(128));

        let err = runner.run(&CommandLine::new("git").arg("pull")).await.unwrap_err();
        assert!(matches!(err, Error::CommandFailed { code: Some(128), .. }));
        assert_eq!(runner.history().len(), 1);
    }

    #[tokio::test]
    async fn test_scripted_output_sees_history() {
        let runner = RecordingRunner::new().with_output(|_, earlier| earlier.len().to_string());
        runner.run(&CommandLine::new("true")).await.unwrap();

        let out = runner.capture(&CommandLine::new("count")).await.unwrap();
        assert_eq!(out, "1");
    }
}
