//! Execution bookkeeping
//!
//! `HistoryRecorder` appends one record per execution attempt. Keeping it
//! separate from the engine lets tests swap the job body without touching
//! persistence.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use super::store::JobStore;
use super::types::{ExecutionRecord, ExecutionStatus, Job, JobId, Result};

/// Default number of records returned by history listings
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Appends execution records through a `JobStore`
#[derive(Clone)]
pub struct HistoryRecorder {
    store: Arc<dyn JobStore>,
}

impl HistoryRecorder {
    /// Create a recorder over `store`
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Record one attempt for `job`
    pub async fn record(
        &self,
        job: &Job,
        run_at: DateTime<Utc>,
        status: ExecutionStatus,
        details: &str,
    ) -> Result<i64> {
        let id = self
            .store
            .append_history(job.id, run_at, status, details)
            .await?;
        debug!(job_id = job.id, record_id = id, %status, "execution recorded");
        Ok(id)
    }

    /// Most recent records, optionally for one job
    pub async fn recent(&self, job_id: Option<JobId>) -> Result<Vec<ExecutionRecord>> {
        self.store.list_history(job_id, DEFAULT_HISTORY_LIMIT).await
    }
}
