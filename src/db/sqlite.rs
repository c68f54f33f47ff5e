use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::task;
use tracing::{debug, error, info};

use crate::db::backend::ProjectBackend;
use crate::db::error::StoreError;
use crate::db::models::{id_to_sort_key, Project};

/// A SQLite implementation of the ProjectBackend trait, used for local
/// development and tests. Stores the project document as JSON alongside the
/// version counter used for conditional writes.
pub struct SqliteProjectBackend {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteProjectBackend {
    /// Create a new SqliteProjectBackend with the given database path.
    /// `:memory:` gives a database that exists only for the test run.
    pub fn new(db_path: &str) -> Result<Self, StoreError> {
        info!("Creating SQLite project store at path: {db_path}");

        if db_path != ":memory:" {
            if let Some(parent) = Path::new(db_path).parent() {
                if !parent.exists() {
                    debug!("Creating parent directory: {:?}", parent);
                    fs::create_dir_all(parent).map_err(|e| {
                        error!("Failed to create directory {parent:?}: {e}");
                        StoreError::ConnectionError(format!("Failed to create directory: {e}"))
                    })?;
                }
            }
        }

        let connection = Connection::open(db_path).map_err(|e| {
            error!("Failed to open SQLite database at {db_path}: {e}");
            StoreError::ConnectionError(format!("Failed to open SQLite database: {e}"))
        })?;

        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS projects (
                    owner_id TEXT NOT NULL,
                    sk TEXT NOT NULL,
                    version INTEGER NOT NULL,
                    last_modified_at INTEGER NOT NULL,
                    doc TEXT NOT NULL,
                    PRIMARY KEY (owner_id, sk)
                )",
                [],
            )
            .map_err(|e| {
                error!("Failed to create projects table: {e}");
                StoreError::ConnectionError(format!("Failed to create projects table: {e}"))
            })?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    async fn with_connection<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        task::spawn_blocking(move || {
            let connection = connection
                .lock()
                .map_err(|e| StoreError::QueryError(format!("connection lock poisoned: {e}")))?;
            op(&connection)
        })
        .await
        .map_err(|e| StoreError::Other(anyhow::anyhow!("blocking task failed: {e}")))?
    }

    fn encode(project: &Project) -> Result<String, StoreError> {
        serde_json::to_string(project).map_err(|e| StoreError::SerializationError(e.to_string()))
    }

    fn decode(doc: &str) -> Result<Project, StoreError> {
        serde_json::from_str(doc).map_err(|e| StoreError::SerializationError(e.to_string()))
    }
}

#[async_trait]
impl ProjectBackend for SqliteProjectBackend {
    async fn insert(&self, project: &Project) -> Result<(), StoreError> {
        let owner_id = project.owner_id.clone();
        let sort_key = id_to_sort_key(&project.id);
        let id = project.id.clone();
        let version = project.version;
        let last_modified = project.last_modified_at.timestamp();
        let doc = Self::encode(project)?;

        self.with_connection(move |connection| {
            connection
                .execute(
                    "INSERT INTO projects (owner_id, sk, version, last_modified_at, doc)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![owner_id, sort_key, version, last_modified, doc],
                )
                .map_err(|e| match e {
                    rusqlite::Error::SqliteFailure(failure, _)
                        if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
                    {
                        StoreError::AlreadyExists(id.clone())
                    }
                    other => StoreError::QueryError(other.to_string()),
                })?;
            Ok(())
        })
        .await
    }

    async fn get(&self, owner_id: &str, id: &str) -> Result<Option<Project>, StoreError> {
        let owner_id = owner_id.to_string();
        let sort_key = id_to_sort_key(id);

        self.with_connection(move |connection| {
            let doc: Option<String> = connection
                .query_row(
                    "SELECT doc FROM projects WHERE owner_id = ?1 AND sk = ?2",
                    params![owner_id, sort_key],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| StoreError::QueryError(e.to_string()))?;

            doc.map(|doc| Self::decode(&doc)).transpose()
        })
        .await
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<Project>, StoreError> {
        let owner_id = owner_id.to_string();

        self.with_connection(move |connection| {
            let mut statement = connection
                .prepare(
                    "SELECT doc FROM projects
                     WHERE owner_id = ?1 AND sk LIKE 'project#%'
                     ORDER BY last_modified_at DESC",
                )
                .map_err(|e| StoreError::QueryError(e.to_string()))?;

            let docs = statement
                .query_map(params![owner_id], |row| row.get::<_, String>(0))
                .map_err(|e| StoreError::QueryError(e.to_string()))?;

            let mut projects = Vec::new();
            for doc in docs {
                let doc = doc.map_err(|e| StoreError::QueryError(e.to_string()))?;
                projects.push(Self::decode(&doc)?);
            }
            Ok(projects)
        })
        .await
    }

    async fn update(&self, project: &Project, expected_version: u64) -> Result<(), StoreError> {
        let owner_id = project.owner_id.clone();
        let sort_key = id_to_sort_key(&project.id);
        let id = project.id.clone();
        let version = project.version;
        let last_modified = project.last_modified_at.timestamp();
        let doc = Self::encode(project)?;

        self.with_connection(move |connection| {
            let changed = connection
                .execute(
                    "UPDATE projects SET version = ?1, last_modified_at = ?2, doc = ?3
                     WHERE owner_id = ?4 AND sk = ?5 AND version = ?6",
                    params![version, last_modified, doc, owner_id, sort_key, expected_version],
                )
                .map_err(|e| StoreError::QueryError(e.to_string()))?;

            if changed > 0 {
                return Ok(());
            }

            // Nothing matched: either the record is gone or another writer
            // bumped the version first.
            let exists: bool = connection
                .query_row(
                    "SELECT 1 FROM projects WHERE owner_id = ?1 AND sk = ?2",
                    params![owner_id, sort_key],
                    |_| Ok(true),
                )
                .optional()
                .map_err(|e| StoreError::QueryError(e.to_string()))?
                .unwrap_or(false);

            if exists {
                Err(StoreError::Conflict(id.clone()))
            } else {
                Err(StoreError::NotFound(id.clone()))
            }
        })
        .await
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<(), StoreError> {
        let owner_id = owner_id.to_string();
        let sort_key = id_to_sort_key(id);

        self.with_connection(move |connection| {
            connection
                .execute(
                    "DELETE FROM projects WHERE owner_id = ?1 AND sk = ?2",
                    params![owner_id, sort_key],
                )
                .map_err(|e| StoreError::QueryError(e.to_string()))?;
            Ok(())
        })
        .await
    }
}
