//! Runtime settings.
//!
//! CLI flags (see `main.rs`) are merged with an optional TOML config file;
//! the file supplies anything the command line leaves unset.

mod file_config;

pub use file_config::FileConfig;

/// Settings for the external benefits provider client.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Base URL of the provider API.
    pub base_url: String,
    /// Username for the credential-based token request.
    pub username: String,
    /// Password for the credential-based token request.
    pub password: String,
    /// Path of the token endpoint, relative to the base URL.
    pub auth_token_path: String,
    /// Path template of the benefit lookup endpoint; `{cpf}` is replaced
    /// with the document id.
    pub benefits_path: String,
    /// Outbound request timeout in seconds.
    pub timeout_secs: u64,
    /// Cache TTL for the auth token in seconds. The token may expire on the
    /// provider side before this does; the 401 retry covers that gap.
    pub token_ttl_secs: u64,
}

/// Settings for the ingestion worker.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Seconds to sleep between polls of an empty queue.
    pub poll_interval_secs: u64,
    /// Cache TTL for processed documents in seconds.
    pub cache_ttl_secs: u64,
    /// Age in seconds after which a claimed-but-unfinished job is requeued.
    pub stale_job_threshold_secs: i64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 1,
            cache_ttl_secs: 3600,
            stale_job_threshold_secs: 600,
        }
    }
}
