use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::models::TrackHint;

/// Job type discriminator carried in the payload and the message attributes.
pub const JOB_TYPE_CROP: &str = "crop";

/// Deployment environment tag carried on every job message so the worker can
/// route results correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Testing,
    Staging,
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Testing => "testing",
            Environment::Staging => "staging",
            Environment::Production => "production",
        };
        write!(f, "{name}")
    }
}

/// A track hint as the external worker expects it on the wire. The hint
/// field names differ from the persisted record and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTrackHint {
    pub time_secs: f64,
    pub norm_ltwh: [f64; 4],
}

impl From<&TrackHint> for WireTrackHint {
    fn from(hint: &TrackHint) -> Self {
        WireTrackHint {
            time_secs: hint.time_secs,
            norm_ltwh: hint.normalized_box,
        }
    }
}

/// The outbound crop-job payload.
///
/// This is the contract with the external worker: field names are snake_case
/// on the wire and fixed. Changing them breaks a consumer that lives outside
/// this repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMessage {
    #[serde(rename = "type")]
    pub job_type: String,
    pub env: Environment,
    pub user_id: String,
    pub project_id: String,
    pub bucket: String,
    pub input_key: String,
    pub output_key: String,
    pub output_width: u32,
    pub output_height: u32,
    pub exclude_limbs: bool,
    pub padding_ratio: f64,
    pub smoothing_window_secs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_hints: Option<Vec<WireTrackHint>>,
}

impl JobMessage {
    /// The deduplication key for this message.
    pub fn dedup_key(&self) -> String {
        dedup_key(&self.project_id)
    }
}

/// Deduplication key for a crop job, derived deterministically from the
/// project id so retries of the same logical submission can never enqueue a
/// second job.
pub fn dedup_key(project_id: &str) -> String {
    format!("{JOB_TYPE_CROP}:{project_id}")
}
