use chrono::serde::ts_seconds;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::db::state::ProjectState;

/// Projects become eligible for purging this long after creation.
pub const PROJECT_TTL_HOURS: i64 = 48;

/// Target render dimensions, fixed at project creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// A location in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Location {
    pub bucket: String,
    pub key: String,
}

/// One user-supplied annotation: a bounding box drawn on a video frame.
///
/// The box is normalized to the rendered frame (left, top, width, height,
/// each in [0,1]) so it stays valid regardless of the output video size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackHint {
    pub time_secs: f64,
    pub normalized_box: [f64; 4],
}

impl TrackHint {
    /// Check that the timestamp and box components are finite and in range.
    pub fn validate(&self) -> Result<(), String> {
        if !self.time_secs.is_finite() || self.time_secs < 0.0 {
            return Err(format!("timeSecs must be non-negative: {}", self.time_secs));
        }
        for (i, component) in self.normalized_box.iter().enumerate() {
            if !component.is_finite() || !(0.0..=1.0).contains(component) {
                return Err(format!(
                    "normalizedBox[{i}] must be within [0,1]: {component}"
                ));
            }
        }
        Ok(())
    }
}

/// Parameters controlling the external cropper, accumulated across the
/// options step. Scalar fields left unset are resolved from configured
/// defaults at submission time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_limbs: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothing_window_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_hints: Option<Vec<TrackHint>>,
}

/// Partial tracker options for shallow merges. Fields that are `None` leave
/// the stored value untouched; track hints are never written through a patch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackerOptionsPatch {
    pub exclude_limbs: Option<bool>,
    pub padding_ratio: Option<f64>,
    pub smoothing_window_secs: Option<f64>,
}

impl TrackerOptions {
    /// Shallow-merge a patch into these options, preserving track hints.
    pub fn apply(&mut self, patch: &TrackerOptionsPatch) {
        if let Some(exclude_limbs) = patch.exclude_limbs {
            self.exclude_limbs = Some(exclude_limbs);
        }
        if let Some(padding_ratio) = patch.padding_ratio {
            self.padding_ratio = Some(padding_ratio);
        }
        if let Some(smoothing_window_secs) = patch.smoothing_window_secs {
            self.smoothing_window_secs = Some(smoothing_window_secs);
        }
    }
}

/// The central entity: one user-owned video-processing job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub size: Size,
    pub state: ProjectState,
    #[serde(with = "ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "ts_seconds")]
    pub last_modified_at: DateTime<Utc>,
    #[serde(with = "ts_seconds")]
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_file: Option<S3Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<S3Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker_options: Option<TrackerOptions>,
    /// Write counter used for optimistic concurrency control.
    #[serde(default)]
    pub version: u64,
}

impl Project {
    /// Construct a fresh project in the `Created` state with a new id.
    pub fn new(owner_id: &str, title: &str, size: Size) -> Self {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            title: title.to_string(),
            size,
            state: ProjectState::Created,
            created_at: now,
            last_modified_at: now,
            expires_at: now + Duration::hours(PROJECT_TTL_HOURS),
            input_file: None,
            output_file: None,
            tracker_options: None,
            version: 1,
        }
    }
}

const SORT_KEY_PREFIX: &str = "project#";

/// Encode a project id as the table sort key.
pub fn id_to_sort_key(id: &str) -> String {
    format!("{SORT_KEY_PREFIX}{id}")
}

/// Decode a table sort key back into a project id.
#[cfg_attr(not(test), allow(dead_code))]
pub fn sort_key_to_id(sort_key: &str) -> &str {
    sort_key.strip_prefix(SORT_KEY_PREFIX).unwrap_or(sort_key)
}

/// Derive the output object key from the input key.
///
/// The derivation is pure so job submission never needs an extra storage
/// round trip: `<prefix>/<owner>/<project>/out/<input stem>.mp4`.
pub fn derive_output_key(
    prefix: &str,
    owner_id: &str,
    project_id: &str,
    input_key: &str,
) -> String {
    let stem = Path::new(input_key)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();
    format!("{prefix}/{owner_id}/{project_id}/out/{stem}.mp4")
}
