//! Durable job storage
//!
//! `JobStore` is the seam between the scheduling engine and the relational
//! store holding job definitions and their append-only execution history.
//! `SqliteJobStore` is the sqlx-backed implementation. Failures are always
//! reported to the caller; nothing is retried inside the store.

mod migrations;
mod queries;


use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;

use crate::scheduler::types::{ExecutionRecord, ExecutionStatus, Job, JobId, Result, SchedulerError};

/// Durable CRUD over jobs and execution history
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Round-trip check against the backend
    async fn ping(&self) -> Result<()>;

    /// Jobs whose next-fire instant is `<= now`, in a stable order
    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Job>>;

    /// Persist a new next-fire instant
    async fn advance_next_fire(&self, id: JobId, next_run_at: DateTime<Utc>) -> Result<()>;

    /// Append one execution record, returning its ID
    async fn append_history(
        &self,
        job_id: JobId,
        run_at: DateTime<Utc>,
        status: ExecutionStatus,
        details: &str,
    ) -> Result<i64>;

    /// Insert a job definition
    async fn create_job(
        &self,
        name: &str,
        cron_schedule: &str,
        next_run_at: DateTime<Utc>,
    ) -> Result<Job>;

    /// Get a job by ID
    async fn get_job(&self, id: JobId) -> Result<Job>;

    /// First job with the given display name, if any
    async fn find_job_by_name(&self, name: &str) -> Result<Option<Job>>;

    /// All jobs, newest first
    async fn list_jobs(&self) -> Result<Vec<Job>>;

    /// Delete a job (history is cascade-deleted)
    async fn delete_job(&self, id: JobId) -> Result<()>;

    /// Most recent execution records, descending by run instant
    async fn list_history(&self, job_id: Option<JobId>, limit: u32) -> Result<Vec<ExecutionRecord>>;
}

/// SQLite-based job store
pub struct SqliteJobStore {
    pub(super) pool: Pool<Sqlite>,
}

impl SqliteJobStore {
    /// Create a new store from a database file path
    pub async fn from_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SchedulerError::InvalidConfig(format!("Failed to create directory: {}", e))
            })?;
        }

        Self::connect(&format!("sqlite:{}?mode=rwc", path.display()), 5).await
    }

    /// Create a new store from a connection URL
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(url)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }
}
