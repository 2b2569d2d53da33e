//! Store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("queue document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("queue document {0} does not exist")]
    MissingQueue(String),

    #[error("invalid task name: {0}")]
    InvalidTaskName(String),

    #[error("store is disconnected")]
    Disconnected,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for buildq_core::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Redis(_) | StoreError::Disconnected => {
                buildq_core::Error::StoreUnavailable(err.to_string())
            }
            StoreError::MissingQueue(_) => buildq_core::Error::NotFound(err.to_string()),
            StoreError::InvalidTaskName(_) => buildq_core::Error::InvalidInput(err.to_string()),
            StoreError::Json(_) => buildq_core::Error::Internal(err.to_string()),
        }
    }
}
