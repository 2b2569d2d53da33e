//! Task execution for buildq.
//!
//! Provides:
//! - Command runners: real child processes and a recording runner for
//!   dry runs and tests
//! - Source sync with git (clone or pull)
//! - The docker buildx builder: bootstrap and builds
//! - The task executor tying them together: load, sync, build, remove

pub mod buildx;
pub mod git;
pub mod process;
pub mod recording;
pub mod task_executor;

pub use buildq_core::executor::{CommandLine, CommandRunner};
pub use buildx::Buildx;
pub use git::{GitService, SyncOutcome};
pub use process::ProcessRunner;
pub use recording::RecordingRunner;
pub use task_executor::{TaskExecutor, TaskRun};
