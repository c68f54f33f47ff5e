use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::db::backend::ProjectBackend;
use crate::db::error::StoreError;
use crate::db::models::Project;

/// A fake in-memory implementation of the ProjectBackend trait for testing.
///
/// Honors the same version semantics as the real backends so optimistic
/// concurrency paths can be exercised without external infrastructure.
#[derive(Clone)]
pub struct FakeProjectBackend {
    records: Arc<RwLock<HashMap<(String, String), Project>>>,
    fail_writes: Arc<RwLock<bool>>,
    conflicts_remaining: Arc<RwLock<u32>>,
}

#[allow(dead_code)]
impl FakeProjectBackend {
    /// Create a new empty FakeProjectBackend.
    pub fn new() -> Self {
        FakeProjectBackend {
            records: Arc::new(RwLock::new(HashMap::new())),
            fail_writes: Arc::new(RwLock::new(false)),
            conflicts_remaining: Arc::new(RwLock::new(0)),
        }
    }

    /// Simulate a lost version race: the next `count` updates fail with
    /// `Conflict` regardless of the version presented.
    pub fn fake_conflict_next_updates(&self, count: u32) {
        *self.conflicts_remaining.write().unwrap() = count;
    }

    /// Simulate an unavailable store: subsequent writes fail with a
    /// connection error until cleared.
    pub fn fake_fail_writes(&self, fail: bool) {
        *self.fail_writes.write().unwrap() = fail;
    }

    /// Insert a record directly, bypassing version checks.
    pub fn fake_put_project(&self, project: Project) {
        let mut records = self.records.write().unwrap();
        records.insert((project.owner_id.clone(), project.id.clone()), project);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if *self.fail_writes.read().unwrap() {
            return Err(StoreError::ConnectionError(
                "fake store is unavailable".into(),
            ));
        }
        Ok(())
    }
}

impl Default for FakeProjectBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProjectBackend for FakeProjectBackend {
    async fn insert(&self, project: &Project) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut records = self.records.write().unwrap();
        let key = (project.owner_id.clone(), project.id.clone());
        if records.contains_key(&key) {
            return Err(StoreError::AlreadyExists(project.id.clone()));
        }
        records.insert(key, project.clone());
        Ok(())
    }

    async fn get(&self, owner_id: &str, id: &str) -> Result<Option<Project>, StoreError> {
        let records = self.records.read().unwrap();
        Ok(records
            .get(&(owner_id.to_string(), id.to_string()))
            .cloned())
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<Project>, StoreError> {
        let records = self.records.read().unwrap();
        Ok(records
            .values()
            .filter(|project| project.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn update(&self, project: &Project, expected_version: u64) -> Result<(), StoreError> {
        self.check_writable()?;
        {
            let mut conflicts = self.conflicts_remaining.write().unwrap();
            if *conflicts > 0 {
                *conflicts -= 1;
                return Err(StoreError::Conflict(project.id.clone()));
            }
        }
        let mut records = self.records.write().unwrap();
        let key = (project.owner_id.clone(), project.id.clone());
        match records.get(&key) {
            None => Err(StoreError::NotFound(project.id.clone())),
            Some(stored) if stored.version != expected_version => {
                Err(StoreError::Conflict(project.id.clone()))
            }
            Some(_) => {
                records.insert(key, project.clone());
                Ok(())
            }
        }
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut records = self.records.write().unwrap();
        records.remove(&(owner_id.to_string(), id.to_string()));
        Ok(())
    }
}
