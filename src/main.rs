use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use benefit_server::cache::{CacheStore, InMemoryCacheStore, RedisCacheStore};
use benefit_server::config::{FileConfig, ProviderSettings, WorkerSettings};
use benefit_server::provider::{BenefitProvider, InssApiClient};
use benefit_server::queue::{IngestWorker, SqliteJobQueueStore};
use benefit_server::search_index::{EsSearchIndex, SearchIndex};
use benefit_server::server::{run_server, ServerState};
use benefit_server::submission::Submitter;
use tokio_util::sync::CancellationToken;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite job queue database file.
    #[clap(value_parser = parse_path)]
    pub queue_db: PathBuf,

    /// Path to an optional TOML config file. Values from the file fill in
    /// anything not given on the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3002)]
    pub port: u16,

    /// Redis URL for the document cache. Without it an in-memory cache is
    /// used, which does not survive restarts.
    #[clap(long)]
    pub redis_url: Option<String>,

    /// TTL in seconds for cached benefit datasets.
    #[clap(long, default_value_t = 3600)]
    pub cache_ttl_secs: u64,

    /// Base URL of the search index (Elasticsearch-compatible).
    #[clap(long, default_value = "http://localhost:9200")]
    pub es_url: String,

    /// Name of the search index to read and write.
    #[clap(long, default_value = "benefits")]
    pub es_index: String,

    /// Timeout in seconds for search index requests.
    #[clap(long, default_value_t = 10)]
    pub es_timeout_secs: u64,

    /// Base URL of the INSS benefits API.
    #[clap(long)]
    pub provider_url: Option<String>,

    /// Username for the INSS benefits API.
    #[clap(long)]
    pub provider_username: Option<String>,

    /// Password for the INSS benefits API.
    #[clap(long)]
    pub provider_password: Option<String>,

    /// Path of the provider token endpoint.
    #[clap(long, default_value = "/token")]
    pub provider_auth_token_path: String,

    /// Path template of the provider benefits endpoint.
    #[clap(long, default_value = "/beneficios/{cpf}")]
    pub provider_benefits_path: String,

    /// Timeout in seconds for provider requests.
    #[clap(long, default_value_t = 30)]
    pub provider_timeout_secs: u64,

    /// TTL in seconds for the cached provider auth token.
    #[clap(long, default_value_t = 3600)]
    pub provider_token_ttl_secs: u64,

    /// Seconds the worker sleeps between polls of an empty queue.
    #[clap(long, default_value_t = 1)]
    pub poll_interval_secs: u64,

    /// Age in seconds after which an in-progress job is considered abandoned
    /// and requeued.
    #[clap(long, default_value_t = 600)]
    pub stale_job_threshold_secs: i64,
}

/// Explicit CLI values win; the file fills in credentials and overrides
/// the built-in flag defaults.
fn resolve_provider_settings(cli: &CliArgs, file: &FileConfig) -> Result<ProviderSettings> {
    let file_provider = file.provider.clone().unwrap_or_default();

    let base_url = cli
        .provider_url
        .clone()
        .or(file_provider.base_url)
        .context("Provider base URL must be set via --provider-url or the config file")?;
    let username = cli
        .provider_username
        .clone()
        .or(file_provider.username)
        .context("Provider username must be set via --provider-username or the config file")?;
    let password = cli
        .provider_password
        .clone()
        .or(file_provider.password)
        .context("Provider password must be set via --provider-password or the config file")?;

    Ok(ProviderSettings {
        base_url,
        username,
        password,
        auth_token_path: file_provider
            .auth_token_path
            .unwrap_or_else(|| cli.provider_auth_token_path.clone()),
        benefits_path: file_provider
            .benefits_path
            .unwrap_or_else(|| cli.provider_benefits_path.clone()),
        timeout_secs: file_provider.timeout_secs.unwrap_or(cli.provider_timeout_secs),
        token_ttl_secs: file_provider
            .token_ttl_secs
            .unwrap_or(cli.provider_token_ttl_secs),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            FileConfig::load(path)?
        }
        None => FileConfig::default(),
    };

    let provider_settings = resolve_provider_settings(&cli_args, &file_config)?;
    let worker_settings = WorkerSettings {
        poll_interval_secs: file_config
            .poll_interval_secs
            .unwrap_or(cli_args.poll_interval_secs),
        cache_ttl_secs: file_config.cache_ttl_secs.unwrap_or(cli_args.cache_ttl_secs),
        stale_job_threshold_secs: file_config
            .stale_job_threshold_secs
            .unwrap_or(cli_args.stale_job_threshold_secs),
    };

    info!(
        "Opening SQLite job queue database at {:?}...",
        cli_args.queue_db
    );
    let queue = Arc::new(SqliteJobQueueStore::new(&cli_args.queue_db)?);

    let cache: Arc<dyn CacheStore> = match cli_args.redis_url.or(file_config.redis_url) {
        Some(url) => {
            info!("Using redis cache at {}", url);
            Arc::new(RedisCacheStore::new(&url)?)
        }
        None => {
            warn!("No redis URL configured, using in-memory cache");
            Arc::new(InMemoryCacheStore::new())
        }
    };

    let provider: Arc<dyn BenefitProvider> =
        Arc::new(InssApiClient::new(&provider_settings, cache.clone())?);

    let es_url = file_config.es_url.unwrap_or(cli_args.es_url);
    let es_index = file_config.es_index.unwrap_or(cli_args.es_index);
    let es_timeout_secs = file_config.es_timeout_secs.unwrap_or(cli_args.es_timeout_secs);
    info!("Using search index '{}' at {}", es_index, es_url);
    let index: Arc<dyn SearchIndex> =
        Arc::new(EsSearchIndex::new(&es_url, &es_index, es_timeout_secs)?);

    let shutdown = CancellationToken::new();

    let worker = IngestWorker::new(
        queue.clone(),
        cache,
        provider,
        index.clone(),
        &worker_settings,
    );
    let worker_shutdown = shutdown.clone();
    let worker_handle = tokio::spawn(async move { worker.run(worker_shutdown).await });

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
        signal_shutdown.cancel();
    });

    let port = file_config.port.unwrap_or(cli_args.port);
    let state = ServerState::new(Arc::new(Submitter::new(queue)), index);
    let result = run_server(state, port, shutdown.clone()).await;

    // Let the worker finish its current job before exiting.
    shutdown.cancel();
    if let Err(e) = worker_handle.await {
        error!("Worker task panicked: {}", e);
    }

    result
}
