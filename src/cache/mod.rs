//! Key/value cache with expiry.
//!
//! Used both for the provider auth token (under a reserved key) and for
//! per-document result caching. Values are JSON-serialized strings; the
//! typed helpers below surface deserialization failures as store errors
//! instead of silently treating them as a miss.

mod memory;
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::IngestError;

pub use memory::InMemoryCacheStore;
pub use redis_store::RedisCacheStore;

/// Flat string key/value store with per-entry TTL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get the raw value for a key, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, IngestError>;

    /// Set a value with the given time-to-live.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), IngestError>;

    /// Remove a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), IngestError>;
}

/// Get and deserialize a JSON value from the cache.
///
/// A present-but-unparseable value is a store error, not a miss.
pub async fn get_json<T: DeserializeOwned>(
    cache: &dyn CacheStore,
    key: &str,
) -> Result<Option<T>, IngestError> {
    match cache.get(key).await? {
        Some(raw) => {
            let value = serde_json::from_str(&raw)?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Serialize a value to JSON and store it with the given TTL.
pub async fn set_json<T: Serialize>(
    cache: &dyn CacheStore,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<(), IngestError> {
    let raw = serde_json::to_string(value)?;
    cache.set(key, raw, ttl).await
}
