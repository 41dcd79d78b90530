//! Backend initialization
//!
//! Builds the job store and the lock service once per process; everything
//! downstream receives them as trait objects.

use super::config::{AppConfig, LockBackend};
use anyhow::{Context, Result};
use cronmesh_core::{JobStore, LockService, MemoryLockService, RedisLockService, SqliteJobStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of backend initialization
pub struct BackendBundle {
    pub store: Arc<dyn JobStore>,
    pub locks: Arc<dyn LockService>,
}

/// Connect the job store and the lock service
pub async fn init_backends(config: &AppConfig) -> Result<BackendBundle> {
    if let Some(dir) = sqlite_parent_dir(&config.database.url) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create database directory {}", dir.display()))?;
    }

    let store = SqliteJobStore::connect(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to initialize job store")?;
    info!("Job store initialized at {}", config.database.url);

    let locks: Arc<dyn LockService> = match config.scheduler.lock_backend {
        LockBackend::Redis => {
            let redis = RedisLockService::new(&config.redis.url)
                .context("Failed to create Redis lock service")?;
            // Unreachable Redis is not fatal: every lock attempt fails and
            // jobs are skipped until it comes back.
            match redis.ping().await {
                Ok(()) => info!("Redis lock service connected at {}", config.redis.url),
                Err(e) => warn!("Redis not reachable yet, jobs will be skipped: {}", e),
            }
            Arc::new(redis)
        }
        LockBackend::Memory => {
            warn!("Using in-memory job locks; only safe with a single instance");
            Arc::new(MemoryLockService::new())
        }
    };

    Ok(BackendBundle {
        store: Arc::new(store),
        locks,
    })
}

/// Directory holding a file-backed SQLite database, if any
fn sqlite_parent_dir(url: &str) -> Option<&Path> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Path::new(path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_parent_dir() {
        assert_eq!(
            sqlite_parent_dir("sqlite:data/cronmesh.db?mode=rwc"),
            Some(Path::new("data"))
        );
        assert_eq!(
            sqlite_parent_dir("sqlite:///var/lib/cronmesh/jobs.db"),
            Some(Path::new("/var/lib/cronmesh"))
        );
        assert_eq!(sqlite_parent_dir("sqlite:jobs.db"), None);
        assert_eq!(sqlite_parent_dir("sqlite::memory:"), None);
        assert_eq!(sqlite_parent_dir("postgres://localhost/jobs"), None);
    }
}
