use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::queue::message::Environment;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    pub queue: QueueConfig,
    pub storage: StorageConfig,
    pub credits: CreditsConfig,
    pub submit: SubmitConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    pub logging: Option<LoggingConfig>,
}

/// Project table settings. When `sqlite_path` is set the SQLite backend is
/// used instead of DynamoDB (local development).
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    pub table: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub sqlite_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueueConfig {
    pub queue_url: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    #[serde(default = "default_message_group")]
    pub message_group: String,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

/// User table holding the per-user credit counter.
#[derive(Debug, Deserialize)]
pub struct CreditsConfig {
    pub table: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

/// Job submission settings: the environment tag stamped on every outbound
/// message, the output key layout, and the tracker option defaults applied
/// to fields the user never set.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitConfig {
    pub env: Environment,
    #[serde(default = "default_output_key_prefix")]
    pub output_key_prefix: String,
    #[serde(default = "default_exclude_limbs")]
    pub exclude_limbs: bool,
    #[serde(default = "default_padding_ratio")]
    pub padding_ratio: f64,
    #[serde(default = "default_smoothing_window_secs")]
    pub smoothing_window_secs: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_track_hints")]
    pub max_track_hints: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            max_track_hints: default_max_track_hints(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub path: String,
    /// Maximum size of one log file, in megabytes.
    pub size: u64,
    pub max_files: usize,
}

fn default_message_group() -> String {
    "crop-jobs".to_string()
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_output_key_prefix() -> String {
    "tmp".to_string()
}

fn default_exclude_limbs() -> bool {
    true
}

fn default_padding_ratio() -> f64 {
    1.2
}

fn default_smoothing_window_secs() -> f64 {
    2.0
}

fn default_max_track_hints() -> usize {
    100
}

pub fn load_config(path: &str) -> Result<Config> {
    let config_text = fs::read_to_string(Path::new(path))?;
    let config: Config = toml::from_str(&config_text)?;
    Ok(config)
}
