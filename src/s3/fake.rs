use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::s3::error::StorageError;
use crate::s3::storage::ObjectStorage;

/// `FakeObjectStorage` is an in-memory implementation of the `ObjectStorage`
/// trait for testing. Objects are tracked by `(bucket, key)` presence only;
/// individual probes can be made to fail or time out.
#[derive(Clone, Default)]
pub struct FakeObjectStorage {
    objects: Arc<Mutex<HashSet<(String, String)>>>,
    failing: Arc<Mutex<HashSet<(String, String)>>>,
}

#[allow(dead_code)]
impl FakeObjectStorage {
    /// Create a new empty FakeObjectStorage instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an object visible to the probe.
    pub fn fake_add_object(&self, bucket: &str, key: &str) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()));
    }

    /// Remove an object again.
    pub fn fake_remove_object(&self, bucket: &str, key: &str) {
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
    }

    /// Simulate a probe failure for a specific object: `exists` returns a
    /// timeout error for this key until cleared.
    pub fn fake_fail_probe(&self, bucket: &str, key: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()));
    }

    /// Clear a simulated probe failure.
    pub fn fake_clear_probe_failure(&self, bucket: &str, key: &str) {
        self.failing
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
    }
}

#[async_trait]
impl ObjectStorage for FakeObjectStorage {
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        let location = (bucket.to_string(), key.to_string());
        if self.failing.lock().unwrap().contains(&location) {
            return Err(StorageError::ProbeTimeout(format!("{bucket}/{key}")));
        }
        Ok(self.objects.lock().unwrap().contains(&location))
    }

    #[cfg(test)]
    async fn add_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.fake_add_object(bucket, key);
        Ok(())
    }

    #[cfg(test)]
    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.fake_remove_object(bucket, key);
        Ok(())
    }
}
