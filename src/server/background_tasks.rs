//! Background task startup functions
//!
//! Contains functions to seed jobs and start the scheduler loop.

use super::config::{AppConfig, SeedJob};
use cronmesh_core::{JobService, JobStore, LockService, SchedulerEngine, ShutdownController};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Insert configured seed jobs that do not exist yet
///
/// Returns the number of jobs inserted. Failures are logged per job.
pub async fn seed_jobs(service: &JobService, seeds: &[SeedJob]) -> usize {
    let mut inserted = 0;
    for seed in seeds {
        match service.seed(&seed.name, &seed.cron_schedule).await {
            Ok(Some(_)) => inserted += 1,
            Ok(None) => {}
            Err(e) => warn!(job_name = %seed.name, "Failed to seed job: {}", e),
        }
    }
    if inserted > 0 {
        info!(count = inserted, "Seeded jobs");
    }
    inserted
}

/// Start the scheduler loop on a background task
pub fn start_scheduler(
    config: &AppConfig,
    store: Arc<dyn JobStore>,
    locks: Arc<dyn LockService>,
    shutdown_controller: &Arc<ShutdownController>,
) -> Option<(Arc<SchedulerEngine>, JoinHandle<()>)> {
    if !config.scheduler.enabled {
        info!("Scheduler disabled by configuration");
        return None;
    }

    let engine = Arc::new(SchedulerEngine::new(
        store,
        locks,
        config.scheduler.engine_config(),
    ));

    let guard = shutdown_controller.track();
    let token = shutdown_controller.token();
    let engine_for_run = engine.clone();
    let handle = tokio::spawn(async move {
        if let Err(e) = engine_for_run.run(token).await {
            error!("Scheduler error: {}", e);
        }
        drop(guard);
    });

    info!(
        instance_id = %engine.instance_id(),
        "Scheduler started (tick interval: {}s, lock TTL: {}s, max concurrent: {})",
        config.scheduler.tick_interval_secs,
        config.scheduler.lock_ttl_secs,
        config.scheduler.max_concurrent
    );

    Some((engine, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::loader::parse_config;
    use cronmesh_core::{MemoryLockService, SqliteJobStore};
    use tempfile::TempDir;

    async fn service_in(dir: &TempDir) -> (Arc<dyn JobStore>, JobService) {
        let store: Arc<dyn JobStore> = Arc::new(
            SqliteJobStore::from_path(&dir.path().join("seed.db"))
                .await
                .unwrap(),
        );
        let service = JobService::new(store.clone());
        (store, service)
    }

    #[tokio::test]
    async fn test_seed_jobs_once() {
        let dir = TempDir::new().unwrap();
        let (_store, service) = service_in(&dir).await;
        let config = parse_config("").unwrap();

        assert_eq!(seed_jobs(&service, &config.seed).await, 2);
        assert_eq!(seed_jobs(&service, &config.seed).await, 0);
        assert_eq!(service.list_jobs().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_bad_seed_does_not_block_others() {
        let dir = TempDir::new().unwrap();
        let (_store, service) = service_in(&dir).await;
        let seeds = vec![
            SeedJob {
                name: "broken".to_string(),
                cron_schedule: "not cron".to_string(),
            },
            SeedJob {
                name: "fine".to_string(),
                cron_schedule: "0 3 * * *".to_string(),
            },
        ];

        assert_eq!(seed_jobs(&service, &seeds).await, 1);
    }

    #[tokio::test]
    async fn test_disabled_scheduler_is_not_started() {
        let dir = TempDir::new().unwrap();
        let (store, _service) = service_in(&dir).await;
        let config = parse_config("[scheduler]\nenabled = false").unwrap();
        let shutdown = ShutdownController::new();

        let started = start_scheduler(
            &config,
            store,
            Arc::new(MemoryLockService::new()),
            &shutdown,
        );
        assert!(started.is_none());
        assert_eq!(shutdown.active_workers(), 0);
    }

    #[tokio::test]
    async fn test_scheduler_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let (store, _service) = service_in(&dir).await;
        let config = parse_config("").unwrap();
        let shutdown = ShutdownController::new();

        let (engine, handle) = start_scheduler(
            &config,
            store,
            Arc::new(MemoryLockService::new()),
            &shutdown,
        )
        .unwrap();
        assert_eq!(shutdown.active_workers(), 1);

        assert!(shutdown.shutdown().await);
        handle.await.unwrap();
        assert_eq!(engine.state(), cronmesh_core::scheduler::SchedulerState::Stopped);
    }
}
