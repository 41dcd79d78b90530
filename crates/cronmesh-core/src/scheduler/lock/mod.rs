//! Distributed job locks
//!
//! A lock is a key in an ephemeral store, `job_lock:<job id>`, created only
//! if absent and expiring on its own after a fixed TTL. There is no release:
//! ownership ends when the key expires.
//!
//! - `RedisLockService` is the production backend (`SET NX PX`), shared by
//!   every scheduler instance
//! - `MemoryLockService` keeps keys in-process and is only exclusive within
//!   one process (single-instance deployments and tests)
//!
//! A job body that outlives the TTL can be picked up again by another
//! instance; callers should keep the TTL above the expected body runtime.

mod memory;
mod redis_lock;


use async_trait::async_trait;
use std::time::Duration;

use super::types::{JobId, Result};

pub use self::memory::MemoryLockService;
pub use self::redis_lock::RedisLockService;

/// Prefix of every job lock key
pub const LOCK_KEY_PREFIX: &str = "job_lock:";

/// Default lock TTL (same order as the tick interval)
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(10);

/// Lock key for a job
pub fn lock_key(job_id: JobId) -> String {
    format!("{}{}", LOCK_KEY_PREFIX, job_id)
}

/// TTL-bounded mutual exclusion keyed by job identity
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LockService: Send + Sync {
    /// Atomically create `key` if absent, expiring after `ttl`.
    ///
    /// Returns `true` iff this call created the key. Backend failures are
    /// reported as `SchedulerError::LockUnavailable`.
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Round-trip check against the backend
    async fn ping(&self) -> Result<()>;
}
