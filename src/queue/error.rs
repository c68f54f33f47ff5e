use thiserror::Error;

/// Errors that can occur when sending messages to the job queue.
#[derive(Error, Debug)]
#[allow(dead_code)]
pub enum QueueError {
    #[error("job queue unavailable: {0}")]
    Unavailable(String),

    #[error("job message rejected by the queue: {0}")]
    Rejected(String),

    #[error("failed to serialize job message: {0}")]
    SerializationError(String),

    #[error("queue configuration error: {0}")]
    ConfigurationError(String),

    #[error("other queue error: {0}")]
    Other(#[from] anyhow::Error),
}

impl QueueError {
    /// Whether a send that failed with this error is worth one retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, QueueError::Unavailable(_))
    }
}
