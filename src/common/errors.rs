use thiserror::Error;

use crate::storage::StoreError;

/// Failure classes surfaced by the presence tracker, the message board and
/// the HTTP layer.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("blocking store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ChatError {
    pub fn validation(detail: impl Into<String>) -> Self {
        ChatError::Validation(detail.into())
    }
}

pub type ChatResult<T> = Result<T, ChatError>;
