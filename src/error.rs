//! Error taxonomy for the ingestion pipeline.
//!
//! Validation errors stop a submission before any job exists; every other
//! kind is fatal for the job it occurred in and is caught (and logged) at
//! the job boundary by the worker.

use thiserror::Error;

/// Errors that can occur while submitting or processing a document.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Malformed document, rejected before enqueue.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The provider's auth endpoint answered without a usable token.
    #[error("provider returned no usable auth token")]
    Auth,

    /// Non-2xx from the provider, after the single allowed 401 retry.
    #[error("provider request failed with status {status}")]
    Provider { status: u16 },

    /// 2xx from the provider but zero benefit entries. Not a valid terminal
    /// state, so it is never cached or indexed.
    #[error("provider returned no benefits for document")]
    EmptyResult,

    /// The provider could not be reached at all (no HTTP status available).
    #[error("provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// Cache or index unreachable, or stored data failed to deserialize.
    #[error("store error: {0}")]
    Store(#[source] anyhow::Error),
}

impl IngestError {
    /// Wrap any error as a store failure.
    pub fn store<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        IngestError::Store(err.into())
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::store(err)
    }
}
