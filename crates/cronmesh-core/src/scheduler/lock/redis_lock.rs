use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::LockService;
use crate::scheduler::types::{Result, SchedulerError};

/// Redis-backed lock service (for production)
///
/// Uses `SET key marker NX PX ttl`, so creation and expiry are a single
/// atomic command. The marker only identifies the holder when inspecting
/// Redis by hand; presence of the key is what matters.
pub struct RedisLockService {
    client: redis::Client,
    /// Value stored under each lock key
    marker: String,
}

impl RedisLockService {
    /// Create a new Redis lock service
    ///
    /// # Errors
    ///
    /// Returns error if Redis URL is invalid
    pub fn new(redis_url: &str) -> Result<Self> {
        Self::with_marker(redis_url, "locked")
    }

    /// Create with a custom marker value (e.g. the scheduler instance ID)
    ///
    /// # Errors
    ///
    /// Returns error if Redis URL is invalid
    pub fn with_marker(redis_url: &str, marker: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| SchedulerError::LockUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            marker: marker.into(),
        })
    }

    /// Get an async connection
    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| SchedulerError::LockUnavailable(format!("Redis connection failed: {}", e)))
    }
}

#[async_trait]
impl LockService for RedisLockService {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let ttl_ms = (ttl.as_millis() as u64).max(1);

        // Nil reply means the key already exists
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(&self.marker)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| SchedulerError::LockUnavailable(format!("Redis SET NX failed: {}", e)))?;

        let acquired = reply.is_some();
        debug!(lock_key = %key, ttl_ms, acquired, "redis lock attempt");
        Ok(acquired)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.get_connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| SchedulerError::LockUnavailable(format!("Redis PING failed: {}", e)))?;
        Ok(())
    }
}
