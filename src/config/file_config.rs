use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Optional TOML configuration, merged under the CLI arguments.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI defaults)
    pub port: Option<u16>,
    pub redis_url: Option<String>,
    pub cache_ttl_secs: Option<u64>,
    pub poll_interval_secs: Option<u64>,
    pub stale_job_threshold_secs: Option<i64>,

    // Search index
    pub es_url: Option<String>,
    pub es_index: Option<String>,
    pub es_timeout_secs: Option<u64>,

    // Benefits provider
    pub provider: Option<ProviderConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_token_path: Option<String>,
    pub benefits_path: Option<String>,
    pub timeout_secs: Option<u64>,
    pub token_ttl_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
