//! Child process runner.

use async_trait::async_trait;
use buildq_core::executor::{CommandLine, CommandRunner};
use buildq_core::{Error, Result};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Runs commands as child processes of the worker.
///
/// `run` lets the child inherit stdout/stderr so build output streams to the
/// worker's terminal. Children are killed if the waiting future is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(command: &CommandLine) -> Command {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

fn spawn_error(command: &CommandLine, e: std::io::Error) -> Error {
    Error::Io(std::io::Error::new(
        e.kind(),
        format!("failed to run `{}`: {}", command, e),
    ))
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn run(&self, command: &CommandLine) -> Result<()> {
        info!(command = %command, "Running command");

        let status = Self::command(command)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| spawn_error(command, e))?;

        if !status.success() {
            warn!(command = %command, code = ?status.code(), "Command failed");
            return Err(Error::CommandFailed {
                command: command.to_string(),
                code: status.code(),
            });
        }

        debug!(command = %command, "Command finished");
        Ok(())
    }

    async fn capture(&self, command: &CommandLine) -> Result<String> {
        debug!(command = %command, "Capturing command output");

        let output = Self::command(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| spawn_error(command, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(command = %command, code = ?output.status.code(), stderr = %stderr.trim(), "Command failed");
            return Err(Error::CommandFailed {
                command: command.to_string(),
                code: output.status.code(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Tests that spawn real processes; they rely on a POSIX `sh`.
#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandLine {
        CommandLine::new("sh").arg("-c").arg(script)
    }

    #[tokio::test]
    async fn test_run_success() {
        ProcessRunner::new().run(&sh("exit 0")).await.unwrap();
    }

    #[tokio::test]
    async fn test_run_reports_exit_code() {
        let err = ProcessRunner::new().run(&sh("exit 3")).await.unwrap_err();
        match err {
            Error::CommandFailed { code, .. } => assert_eq!(code, Some(3)),
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_capture_stdout() {
        let out = ProcessRunner::new()
            .capture(&sh("echo 'Name: default'"))
            .await
            .unwrap();
        assert_eq!(out.trim(), "Name: default");
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let err = ProcessRunner::new()
            .run(&CommandLine::new("buildq-definitely-not-a-program"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
