//! Redis-backed cache store.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::{error, info};

use super::CacheStore;
use crate::error::IngestError;

/// Cache store backed by a Redis server.
///
/// The connection is established in the background at construction time.
/// If it fails, the failure is logged and each subsequent call errors
/// individually until the connection manager comes up; construction itself
/// never blocks on the server being reachable.
pub struct RedisCacheStore {
    conn: Arc<RwLock<Option<ConnectionManager>>>,
}

impl RedisCacheStore {
    /// Create a store for the given redis URL (e.g. "redis://localhost:6379").
    ///
    /// Only URL parsing can fail here; connecting happens in a spawned task.
    pub fn new(url: &str) -> Result<Self, IngestError> {
        let client = redis::Client::open(url).map_err(IngestError::store)?;
        let conn: Arc<RwLock<Option<ConnectionManager>>> = Arc::new(RwLock::new(None));

        let slot = conn.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            match client.get_connection_manager().await {
                Ok(manager) => {
                    info!("Connected to redis at {}", url);
                    *slot.write().await = Some(manager);
                }
                Err(err) => {
                    error!("Redis connection error for {}: {}", url, err);
                }
            }
        });

        Ok(Self { conn })
    }

    async fn manager(&self) -> Result<ConnectionManager, IngestError> {
        self.conn
            .read()
            .await
            .clone()
            .ok_or_else(|| IngestError::store(anyhow!("redis connection not established")))
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, IngestError> {
        let mut conn = self.manager().await?;
        let value: Option<String> = conn.get(key).await.map_err(IngestError::store)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), IngestError> {
        let mut conn = self.manager().await?;
        let _: () = conn
            .set_ex(key, value, ttl.as_secs())
            .await
            .map_err(IngestError::store)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), IngestError> {
        let mut conn = self.manager().await?;
        let _: () = conn.del(key).await.map_err(IngestError::store)?;
        Ok(())
    }
}
