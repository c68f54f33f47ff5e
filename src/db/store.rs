use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::db::backend::ProjectBackend;
use crate::db::error::StoreError;
use crate::db::models::{Project, S3Location, Size, TrackHint, TrackerOptions, TrackerOptionsPatch};
use crate::db::state::ProjectState;

/// How many times a read-modify-write is retried after losing a version
/// race before giving up with `Conflict`.
const MAX_CAS_ATTEMPTS: u32 = 3;

/// The project data-access layer.
///
/// Wraps a `ProjectBackend` with the domain contract: validation on create,
/// merge semantics for file references and tracker options, the append-only
/// track hint log, and state transitions. Every mutation is a
/// read-modify-write guarded by the backend's version check and retried on
/// conflict, so concurrent writers cannot silently lose updates.
///
/// `set_state` is the only place the `state` field is ever written.
pub struct ProjectStore {
    backend: Arc<dyn ProjectBackend>,
    max_track_hints: usize,
}

impl ProjectStore {
    pub fn new(backend: Arc<dyn ProjectBackend>, max_track_hints: usize) -> Self {
        ProjectStore {
            backend,
            max_track_hints,
        }
    }

    /// Create a new project in the `Created` state.
    pub async fn create(
        &self,
        owner_id: &str,
        title: &str,
        size: Size,
    ) -> Result<Project, StoreError> {
        if title.trim().is_empty() {
            return Err(StoreError::Validation("title must not be empty".into()));
        }
        if size.width == 0 || size.height == 0 {
            return Err(StoreError::Validation(format!(
                "output size must have positive dimensions: {}x{}",
                size.width, size.height
            )));
        }

        let project = Project::new(owner_id, title, size);
        self.backend.insert(&project).await?;
        debug!("Created project {} for owner {}", project.id, owner_id);
        Ok(project)
    }

    /// Fetch a project. Projects belonging to other owners are reported as
    /// not found, never as denied.
    pub async fn get(&self, owner_id: &str, id: &str) -> Result<Project, StoreError> {
        self.backend
            .get(owner_id, id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// List an owner's projects, most recently modified first. The project
    /// list UI relies on this ordering.
    pub async fn list(&self, owner_id: &str) -> Result<Vec<Project>, StoreError> {
        let mut projects = self.backend.list(owner_id).await?;
        projects.sort_by(|a, b| b.last_modified_at.cmp(&a.last_modified_at));
        Ok(projects)
    }

    /// Merge file references into a project. A `None` argument leaves any
    /// previously stored reference untouched rather than clearing it.
    pub async fn update_files(
        &self,
        owner_id: &str,
        id: &str,
        input_file: Option<S3Location>,
        output_file: Option<S3Location>,
    ) -> Result<Project, StoreError> {
        self.update_with(owner_id, id, |project| {
            if let Some(input) = input_file.clone() {
                project.input_file = Some(input);
            }
            if let Some(output) = output_file.clone() {
                project.output_file = Some(output);
            }
            Ok(())
        })
        .await
    }

    /// Shallow-merge tracker options into a project, creating the options
    /// bundle if absent. Existing track hints are always preserved.
    pub async fn merge_tracker_options(
        &self,
        owner_id: &str,
        id: &str,
        patch: &TrackerOptionsPatch,
    ) -> Result<Project, StoreError> {
        self.update_with(owner_id, id, |project| {
            project
                .tracker_options
                .get_or_insert_with(TrackerOptions::default)
                .apply(patch);
            Ok(())
        })
        .await
    }

    /// Append a track hint to the project's hint log.
    ///
    /// The log is pure append: insertion order is preserved and duplicates
    /// are allowed. Appends beyond the configured cap are rejected loudly
    /// rather than silently dropped.
    pub async fn append_track_hint(
        &self,
        owner_id: &str,
        id: &str,
        hint: TrackHint,
    ) -> Result<Project, StoreError> {
        hint.validate().map_err(StoreError::Validation)?;

        let max_track_hints = self.max_track_hints;
        self.update_with(owner_id, id, |project| {
            let hints = project
                .tracker_options
                .get_or_insert_with(TrackerOptions::default)
                .track_hints
                .get_or_insert_with(Vec::new);
            if hints.len() >= max_track_hints {
                return Err(StoreError::Validation(format!(
                    "track hint limit of {max_track_hints} reached"
                )));
            }
            hints.push(hint.clone());
            Ok(())
        })
        .await
    }

    /// Advance a project's lifecycle state.
    ///
    /// Setting the state a project is already in is an idempotent no-op so
    /// callers can safely retry. Otherwise the transition must be legal per
    /// the lifecycle table and the target state's preconditions must hold.
    pub async fn set_state(
        &self,
        owner_id: &str,
        id: &str,
        next: ProjectState,
    ) -> Result<Project, StoreError> {
        let current = self.get(owner_id, id).await?;
        if current.state == next {
            return Ok(current);
        }

        self.update_with(owner_id, id, |project| {
            if project.state == next {
                return Ok(());
            }
            if !project.state.can_transition_to(next) {
                return Err(StoreError::IllegalTransition {
                    from: project.state,
                    to: next,
                });
            }
            check_state_preconditions(project, next)?;
            debug!(
                "Project {} transitioning {} -> {}",
                project.id, project.state, next
            );
            project.state = next;
            Ok(())
        })
        .await
    }

    /// Delete a project. Idempotent: deleting a nonexistent project is fine.
    pub async fn delete(&self, owner_id: &str, id: &str) -> Result<(), StoreError> {
        self.backend.delete(owner_id, id).await
    }

    /// Read-modify-write with optimistic concurrency: load the record, apply
    /// the mutation, and write back conditional on the version read. Lost
    /// races are retried a bounded number of times.
    async fn update_with<F>(&self, owner_id: &str, id: &str, mutate: F) -> Result<Project, StoreError>
    where
        F: Fn(&mut Project) -> Result<(), StoreError>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut project = self.get(owner_id, id).await?;
            let expected_version = project.version;

            mutate(&mut project)?;
            project.version = expected_version + 1;
            project.last_modified_at = Utc::now();

            match self.backend.update(&project, expected_version).await {
                Ok(()) => return Ok(project),
                Err(StoreError::Conflict(_)) if attempt < MAX_CAS_ATTEMPTS => {
                    warn!(
                        "Version conflict updating project {id} (attempt {attempt}), retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Preconditions guarding entry into each state, checked against the record
/// being written.
fn check_state_preconditions(project: &Project, next: ProjectState) -> Result<(), StoreError> {
    match next {
        ProjectState::Ready => {
            if project.input_file.is_none() || project.output_file.is_none() {
                return Err(StoreError::Precondition(
                    "input and output files must be set before Ready".into(),
                ));
            }
        }
        ProjectState::Processing => {
            if project.input_file.is_none() || project.output_file.is_none() {
                return Err(StoreError::Precondition(
                    "input and output files must be set before Processing".into(),
                ));
            }
            if project.tracker_options.is_none() {
                return Err(StoreError::Precondition(
                    "tracker options must be set before Processing".into(),
                ));
            }
        }
        _ => {}
    }
    Ok(())
}
