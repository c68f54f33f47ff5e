use thiserror::Error;

use crate::db::state::ProjectState;

/// Errors that can occur in the project store.
#[derive(Error, Debug)]
#[allow(dead_code)]
pub enum StoreError {
    #[error("project {0} not found")]
    NotFound(String),

    #[error("project {0} already exists")]
    AlreadyExists(String),

    #[error("concurrent update detected on project {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("illegal state transition {from} -> {to}")]
    IllegalTransition {
        from: ProjectState,
        to: ProjectState,
    },

    #[error("state precondition failed: {0}")]
    Precondition(String),

    #[error("failed to connect to project store: {0}")]
    ConnectionError(String),

    #[error("store query failed: {0}")]
    QueryError(String),

    #[error("failed to serialize project record: {0}")]
    SerializationError(String),

    #[error("other store error: {0}")]
    Other(#[from] anyhow::Error),
}
