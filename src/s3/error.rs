use thiserror::Error;

/// Errors that can occur when probing object storage.
///
/// Note that "object not present" is not represented here: the probe reports
/// it as `Ok(false)` because it is the expected condition for the whole
/// duration of processing.
#[derive(Error, Debug)]
#[allow(dead_code)]
pub enum StorageError {
    #[error("failed to connect to storage: {0}")]
    ConnectionError(String),

    #[error("existence probe for {0} timed out")]
    ProbeTimeout(String),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("storage configuration error: {0}")]
    ConfigurationError(String),

    #[error("other storage error: {0}")]
    Other(#[from] anyhow::Error),
}
