//! Error types for buildq.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("malformed task '{name}': {message}")]
    MalformedTask { name: String, message: String },

    #[error("command `{command}` failed with {}", exit_description(.code))]
    CommandFailed { command: String, code: Option<i32> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Errors after which the worker cannot make progress at all.
    ///
    /// Everything else only concerns the task being processed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_))
    }

    /// The task was not (or no longer) in the queue document.
    pub fn is_missing_task(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_store_errors_are_fatal() {
        assert!(Error::StoreUnavailable("connection refused".into()).is_fatal());
        assert!(!Error::NotFound("tasks.app".into()).is_fatal());
        assert!(
            !Error::CommandFailed {
                command: "git pull".into(),
                code: Some(1)
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_command_failed_message() {
        let err = Error::CommandFailed {
            command: "docker buildx build".into(),
            code: Some(2),
        };
        assert_eq!(
            err.to_string(),
            "command `docker buildx build` failed with exit code 2"
        );

        let err = Error::CommandFailed {
            command: "git clone".into(),
            code: None,
        };
        assert!(err.to_string().contains("terminated by signal"));
    }
}
