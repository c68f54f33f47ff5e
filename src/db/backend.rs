use async_trait::async_trait;
use std::sync::Arc;

use crate::db::error::StoreError;
use crate::db::models::Project;

/// Key-value primitives for persisting project records.
///
/// Records are partitioned by owner id; every operation is scoped to one
/// owner so cross-owner access cannot be expressed at this layer. Writes are
/// versioned: `update` only succeeds when the stored version still matches
/// the version the caller read, which is what the higher-level store's
/// read-modify-write operations rely on to avoid lost updates.
#[async_trait]
pub trait ProjectBackend: Send + Sync + 'static {
    /// Insert a new project record. Fails with `AlreadyExists` if a record
    /// with the same owner id and project id is present.
    async fn insert(&self, project: &Project) -> Result<(), StoreError>;

    /// Fetch a project by owner id and project id.
    async fn get(&self, owner_id: &str, id: &str) -> Result<Option<Project>, StoreError>;

    /// Fetch all projects for an owner. No ordering is guaranteed.
    async fn list(&self, owner_id: &str) -> Result<Vec<Project>, StoreError>;

    /// Replace a project record, conditional on the stored version still
    /// being `expected_version`. Fails with `Conflict` when another writer
    /// got there first and `NotFound` when the record is gone.
    async fn update(&self, project: &Project, expected_version: u64) -> Result<(), StoreError>;

    /// Delete a project record. Deleting a nonexistent record is not an
    /// error.
    async fn delete(&self, owner_id: &str, id: &str) -> Result<(), StoreError>;
}

/// Implementation of ProjectBackend for Arc<T> where T implements
/// ProjectBackend, so backends can be shared across components.
#[async_trait]
impl<T: ProjectBackend + ?Sized> ProjectBackend for Arc<T> {
    async fn insert(&self, project: &Project) -> Result<(), StoreError> {
        (**self).insert(project).await
    }

    async fn get(&self, owner_id: &str, id: &str) -> Result<Option<Project>, StoreError> {
        (**self).get(owner_id, id).await
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<Project>, StoreError> {
        (**self).list(owner_id).await
    }

    async fn update(&self, project: &Project, expected_version: u64) -> Result<(), StoreError> {
        (**self).update(project, expected_version).await
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<(), StoreError> {
        (**self).delete(owner_id, id).await
    }
}
