use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::SubmitConfig;
use crate::credits::CreditLedger;
use crate::db::{
    derive_output_key, Project, ProjectState, ProjectStore, S3Location, Size, TrackHint,
    TrackerOptionsPatch,
};
use crate::pipeline::error::ServiceError;
use crate::queue::{JobMessage, JobQueue, QueueReceipt, WireTrackHint, JOB_TYPE_CROP};
use crate::s3::ObjectStorage;

/// Orchestrates the project lifecycle: upload bookkeeping, annotation,
/// job submission and completion reconciliation.
///
/// Route handlers are expected to call into this service; it owns the
/// ordering guarantees the individual collaborators cannot provide on their
/// own (preconditions before merge, send before state transition).
pub struct ProjectService<Q: JobQueue, O: ObjectStorage, C: CreditLedger> {
    store: ProjectStore,
    queue: Arc<Q>,
    storage: Arc<O>,
    credits: Arc<C>,
    submit_config: SubmitConfig,
}

impl<Q: JobQueue, O: ObjectStorage, C: CreditLedger> ProjectService<Q, O, C> {
    pub fn new(
        store: ProjectStore,
        queue: Q,
        storage: O,
        credits: C,
        submit_config: SubmitConfig,
    ) -> Self {
        ProjectService {
            store,
            queue: Arc::new(queue),
            storage: Arc::new(storage),
            credits: Arc::new(credits),
            submit_config,
        }
    }

    /// Create a new project for an owner.
    pub async fn create_project(
        &self,
        owner_id: &str,
        title: &str,
        size: Size,
    ) -> Result<Project, ServiceError> {
        Ok(self.store.create(owner_id, title, size).await?)
    }

    pub async fn get_project(&self, owner_id: &str, id: &str) -> Result<Project, ServiceError> {
        Ok(self.store.get(owner_id, id).await?)
    }

    /// An owner's projects, most recently touched first.
    pub async fn list_projects(&self, owner_id: &str) -> Result<Vec<Project>, ServiceError> {
        Ok(self.store.list(owner_id).await?)
    }

    pub async fn delete_project(&self, owner_id: &str, id: &str) -> Result<(), ServiceError> {
        Ok(self.store.delete(owner_id, id).await?)
    }

    /// Record a finished upload: store the input location, derive the output
    /// location from it, and advance the project to `Ready`.
    ///
    /// The output key is derived purely from the input key so submission
    /// later needs no extra storage round trip.
    pub async fn record_upload(
        &self,
        owner_id: &str,
        id: &str,
        input_file: S3Location,
    ) -> Result<Project, ServiceError> {
        if input_file.bucket.is_empty() || input_file.key.is_empty() {
            return Err(ServiceError::Validation(
                "input file bucket and key are required".into(),
            ));
        }

        let output_key = derive_output_key(
            &self.submit_config.output_key_prefix,
            owner_id,
            id,
            &input_file.key,
        );
        let output_file = S3Location {
            bucket: input_file.bucket.clone(),
            key: output_key,
        };

        self.store
            .update_files(owner_id, id, Some(input_file), Some(output_file))
            .await?;
        Ok(self
            .store
            .set_state(owner_id, id, ProjectState::Ready)
            .await?)
    }

    /// Append one annotation to the project's track hint log.
    pub async fn append_track_hint(
        &self,
        owner_id: &str,
        id: &str,
        hint: TrackHint,
    ) -> Result<Project, ServiceError> {
        Ok(self.store.append_track_hint(owner_id, id, hint).await?)
    }

    /// Merge user-chosen tracker options into the project.
    pub async fn merge_tracker_options(
        &self,
        owner_id: &str,
        id: &str,
        patch: &TrackerOptionsPatch,
    ) -> Result<Project, ServiceError> {
        Ok(self.store.merge_tracker_options(owner_id, id, patch).await?)
    }

    /// Submit the crop job for a project.
    ///
    /// Preconditions are checked in order (credits, then files) before
    /// anything is written, so a failed submission never leaves partial
    /// tracker options behind. The queue send happens strictly before the
    /// state transition: a project only ever reaches `Processing` with a job
    /// on the queue. Retrying after a transient failure reuses the same
    /// deterministic deduplication key, so at most one job per project is
    /// ever accepted as new.
    pub async fn submit(
        &self,
        owner_id: &str,
        id: &str,
    ) -> Result<(Project, QueueReceipt), ServiceError> {
        let remaining = self.credits.remaining(owner_id).await?;
        if remaining == 0 {
            return Err(ServiceError::InsufficientCredits(owner_id.to_string()));
        }

        let project = self.store.get(owner_id, id).await?;
        if project.input_file.is_none() || project.output_file.is_none() {
            return Err(ServiceError::MissingInput(id.to_string()));
        }

        // All preconditions hold: fill unset tracker option fields from the
        // configured defaults, keeping anything the user chose and the full
        // hint log.
        let stored_options = project.tracker_options.clone().unwrap_or_default();
        let defaults_patch = TrackerOptionsPatch {
            exclude_limbs: Some(
                stored_options
                    .exclude_limbs
                    .unwrap_or(self.submit_config.exclude_limbs),
            ),
            padding_ratio: Some(
                stored_options
                    .padding_ratio
                    .unwrap_or(self.submit_config.padding_ratio),
            ),
            smoothing_window_secs: Some(
                stored_options
                    .smoothing_window_secs
                    .unwrap_or(self.submit_config.smoothing_window_secs),
            ),
        };
        let project = self
            .store
            .merge_tracker_options(owner_id, id, &defaults_patch)
            .await?;

        let message = build_job_message(&project, &self.submit_config)?;

        let receipt = match self.queue.send_job(&message).await {
            Ok(receipt) => receipt,
            Err(err) if err.is_transient() => {
                warn!("Job send for project {id} failed ({err}), retrying once");
                self.queue
                    .send_job(&message)
                    .await
                    .map_err(|err| ServiceError::QueueUnavailable(err.to_string()))?
            }
            Err(err) => return Err(ServiceError::Queue(err)),
        };

        // Receipt is opaque; log it for diagnostics only.
        info!(
            "Queued crop job for project {id} (message id {})",
            receipt.message_id
        );

        let project = self
            .store
            .set_state(owner_id, id, ProjectState::Processing)
            .await?;
        Ok((project, receipt))
    }

    /// Reconcile a project against the worker's output.
    ///
    /// Idempotent: does nothing unless the project is `Processing`. Flips to
    /// `Completed` only once the output object is confirmed to exist; an
    /// absent object or an inconclusive probe is the normal "still working"
    /// case and is not an error.
    pub async fn reconcile(&self, owner_id: &str, id: &str) -> Result<Project, ServiceError> {
        let project = self.store.get(owner_id, id).await?;
        if project.state != ProjectState::Processing {
            return Ok(project);
        }

        let Some(output_file) = project.output_file.clone() else {
            // Unreachable through the submission path, but nothing to probe.
            return Ok(project);
        };

        match self
            .storage
            .exists(&output_file.bucket, &output_file.key)
            .await
        {
            Ok(true) => {
                info!("Output for project {id} exists, marking Completed");
                Ok(self
                    .store
                    .set_state(owner_id, id, ProjectState::Completed)
                    .await?)
            }
            Ok(false) => {
                debug!("Output for project {id} not present yet");
                Ok(project)
            }
            Err(err) => {
                debug!("Existence probe for project {id} inconclusive: {err}");
                Ok(project)
            }
        }
    }

    /// Record an unrecoverable worker failure reported out of band.
    pub async fn mark_failed(&self, owner_id: &str, id: &str) -> Result<Project, ServiceError> {
        Ok(self
            .store
            .set_state(owner_id, id, ProjectState::Error)
            .await?)
    }
}

/// Assemble the wire payload from a fully merged project record.
fn build_job_message(project: &Project, config: &SubmitConfig) -> Result<JobMessage, ServiceError> {
    let (input_file, output_file) = match (&project.input_file, &project.output_file) {
        (Some(input), Some(output)) => (input, output),
        _ => return Err(ServiceError::MissingInput(project.id.clone())),
    };
    let Some(options) = &project.tracker_options else {
        return Err(ServiceError::MissingOptions(project.id.clone()));
    };

    let track_hints = options
        .track_hints
        .as_ref()
        .map(|hints| hints.iter().map(WireTrackHint::from).collect());

    Ok(JobMessage {
        job_type: JOB_TYPE_CROP.to_string(),
        env: config.env,
        user_id: project.owner_id.clone(),
        project_id: project.id.clone(),
        bucket: input_file.bucket.clone(),
        input_key: input_file.key.clone(),
        output_key: output_file.key.clone(),
        output_width: project.size.width,
        output_height: project.size.height,
        exclude_limbs: options.exclude_limbs.unwrap_or(config.exclude_limbs),
        padding_ratio: options.padding_ratio.unwrap_or(config.padding_ratio),
        smoothing_window_secs: options
            .smoothing_window_secs
            .unwrap_or(config.smoothing_window_secs),
        track_hints,
    })
}
