use thiserror::Error;

use crate::credits::CreditError;
use crate::db::StoreError;
use crate::queue::QueueError;

/// Domain errors surfaced by the project service.
///
/// `InsufficientCredits`, `MissingInput` and `MissingOptions` are distinct
/// variants (not generic validation failures) so callers can render specific
/// messages for each.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("project {0} not found")]
    NotFound(String),

    #[error("no credits remaining for user {0}")]
    InsufficientCredits(String),

    #[error("project {0} has no input/output files")]
    MissingInput(String),

    #[error("project {0} has no tracker options")]
    MissingOptions(String),

    #[error("job queue unavailable: {0}")]
    QueueUnavailable(String),

    #[error(transparent)]
    Queue(QueueError),

    #[error(transparent)]
    Credits(#[from] CreditError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ServiceError::NotFound(id),
            StoreError::Validation(message) => ServiceError::Validation(message),
            other => ServiceError::Store(other),
        }
    }
}
