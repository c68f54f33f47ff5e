use thiserror::Error;

/// Errors that can occur when reading the credit ledger.
#[derive(Error, Debug)]
#[allow(dead_code)]
pub enum CreditError {
    #[error("user {0} not found")]
    UserNotFound(String),

    #[error("failed to connect to credit ledger: {0}")]
    ConnectionError(String),

    #[error("credit lookup failed: {0}")]
    QueryError(String),

    #[error("other credit ledger error: {0}")]
    Other(#[from] anyhow::Error),
}
