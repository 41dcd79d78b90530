use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::LockService;
use crate::scheduler::types::Result;

/// Expired keys are swept on every `PURGE_EVERY`th acquisition attempt
pub const PURGE_EVERY: u64 = 64;

/// In-process lock store
///
/// Keys carry their own deadline and are treated as absent once it has
/// passed. Stale keys (deleted jobs included) are dropped periodically
/// from `try_acquire`. Clones share the same keyspace, so two engines built from
/// clones of one `MemoryLockService` contend exactly like two instances
/// sharing one Redis.
#[derive(Clone, Default)]
pub struct MemoryLockService {
    locks: Arc<DashMap<String, Instant>>,
    attempts: Arc<AtomicU64>,
}

impl MemoryLockService {
    /// Create an empty lock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys that have not yet expired
    pub fn active_count(&self) -> usize {
        let now = Instant::now();
        self.locks.iter().filter(|e| *e.value() > now).count()
    }

    /// Number of keys held in memory, expired or not
    pub fn tracked_count(&self) -> usize {
        self.locks.len()
    }

    /// Drop expired keys
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.locks.len();
        self.locks.retain(|_, deadline| *deadline > now);
        before.saturating_sub(self.locks.len())
    }
}

#[async_trait]
impl LockService for MemoryLockService {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        if attempt % PURGE_EVERY == 0 {
            let purged = self.purge_expired();
            if purged > 0 {
                debug!(purged, "purged expired memory locks");
            }
        }

        let now = Instant::now();
        let acquired = match self.locks.entry(key.to_string()) {
            Entry::Occupied(mut held) => {
                if *held.get() > now {
                    false
                } else {
                    held.insert(now + ttl);
                    true
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(now + ttl);
                true
            }
        };

        debug!(lock_key = %key, acquired, "memory lock attempt");
        Ok(acquired)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
