//! Benefit Ingestion Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod provider;
pub mod queue;
pub mod search_index;
pub mod server;
pub mod submission;

// Re-export commonly used types for convenience
pub use cache::{CacheStore, InMemoryCacheStore, RedisCacheStore};
pub use error::IngestError;
pub use models::{BenefitDataset, BenefitRecord, DocumentId};
pub use provider::{BenefitProvider, InssApiClient};
pub use queue::{IngestWorker, JobQueueStore, SqliteJobQueueStore};
pub use search_index::{EsSearchIndex, SearchIndex};
pub use server::{run_server, ServerState};
pub use submission::Submitter;
