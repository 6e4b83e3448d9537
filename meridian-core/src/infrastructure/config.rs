// meridian-core/src/infrastructure/config.rs
//
// `RuntimeConfig`: a YAML file plus `MERIDIAN_*` environment overrides,
// loaded file-first and then layered with env overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

use crate::infrastructure::error::InfrastructureError;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RuntimeConfig {
    /// Store endpoints; only the first is used by the in-memory/file drivers,
    /// the field exists so a distributed driver can be dropped in later.
    #[serde(default)]
    pub store_endpoints: Vec<String>,

    /// Key prefix this instance's objects and indexes live under.
    #[serde(default = "default_prefix")]
    #[validate(length(min = 1))]
    pub prefix: String,

    /// Path to the embedded file store's base directory. Absent means the
    /// in-memory driver is used.
    #[serde(default)]
    pub embedded_store_path: Option<String>,

    #[serde(default = "default_dial_timeout_ms")]
    pub dial_timeout_ms: u64,

    #[serde(default = "default_keepalive_ms")]
    pub keepalive_ms: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

fn default_prefix() -> String {
    "meridian".to_string()
}

fn default_dial_timeout_ms() -> u64 {
    5_000
}

fn default_keepalive_ms() -> u64 {
    30_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_retries() -> usize {
    crate::domain::store::txn::DEFAULT_MAX_RETRIES
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            store_endpoints: Vec::new(),
            prefix: default_prefix(),
            embedded_store_path: None,
            dial_timeout_ms: default_dial_timeout_ms(),
            keepalive_ms: default_keepalive_ms(),
            log_level: default_log_level(),
            max_retries: default_max_retries(),
        }
    }
}

#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_runtime_config(path: &Path) -> Result<RuntimeConfig, InfrastructureError> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content)?
    } else {
        info!("no config file at this path, using defaults with env overrides");
        RuntimeConfig::default()
    };

    apply_env_overrides(&mut config);
    config
        .validate()
        .map_err(|e| InfrastructureError::ConfigError(e.to_string()))?;
    Ok(config)
}

fn apply_env_overrides(config: &mut RuntimeConfig) {
    if let Ok(val) = std::env::var("MERIDIAN_PREFIX") {
        info!(old = %config.prefix, new = %val, "overriding prefix via env");
        config.prefix = val;
    }
    if let Ok(val) = std::env::var("MERIDIAN_LOG_LEVEL") {
        config.log_level = val;
    }
    if let Ok(val) = std::env::var("MERIDIAN_EMBEDDED_STORE_PATH") {
        config.embedded_store_path = Some(val);
    }
    if let Ok(val) = std::env::var("MERIDIAN_DIAL_TIMEOUT_MS") {
        if let Ok(parsed) = val.parse() {
            config.dial_timeout_ms = parsed;
        }
    }
    if let Ok(val) = std::env::var("MERIDIAN_MAX_RETRIES") {
        if let Ok(parsed) = val.parse() {
            config.max_retries = parsed;
        }
    }
}
