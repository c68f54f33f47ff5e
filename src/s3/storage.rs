use async_trait::async_trait;
use std::sync::Arc;

use crate::s3::error::StorageError;

/// Storage trait defining the existence probe against S3-compatible object
/// storage, used to detect that the external worker has produced its output.
#[async_trait]
pub trait ObjectStorage: Send + Sync + 'static {
    /// Check whether an object exists.
    ///
    /// Absence is the normal "still working" answer, so it is `Ok(false)`,
    /// not an error.
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;

    /// Add an empty object to storage (test-only)
    #[cfg(test)]
    async fn add_object(&self, bucket: &str, key: &str) -> Result<(), StorageError>;

    /// Remove an object from storage (test-only)
    #[cfg(test)]
    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), StorageError>;
}

/// Implementation of ObjectStorage for Arc<T> where T implements
/// ObjectStorage, so storage clients can be shared across components.
#[async_trait]
impl<T: ObjectStorage + ?Sized> ObjectStorage for Arc<T> {
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        (**self).exists(bucket, key).await
    }

    #[cfg(test)]
    async fn add_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        (**self).add_object(bucket, key).await
    }

    #[cfg(test)]
    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        (**self).remove_object(bucket, key).await
    }
}
