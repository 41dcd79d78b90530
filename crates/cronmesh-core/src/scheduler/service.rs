//! Job management operations
//!
//! The outer surfaces (HTTP API, startup seeding) go through `JobService`
//! rather than the store directly, so a job never reaches storage with an
//! expression the engine cannot evaluate.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use super::engine::Clock;
use super::evaluator::{CronEvaluator, ScheduleEvaluator};
use super::history::HistoryRecorder;
use super::store::JobStore;
use super::types::{ExecutionRecord, Job, JobId, Result, SchedulerError};

/// Job CRUD, manual triggering and history queries
#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn JobStore>,
    evaluator: Arc<dyn ScheduleEvaluator>,
    history: HistoryRecorder,
    clock: Clock,
}

impl JobService {
    /// Create a service over `store` with the cron evaluator and wall clock
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            history: HistoryRecorder::new(store.clone()),
            store,
            evaluator: Arc::new(CronEvaluator::new()),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the schedule evaluator
    pub fn with_evaluator(mut self, evaluator: Arc<dyn ScheduleEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Store round-trip, used by health checks
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    /// Create a job whose first fire is the next match after now
    pub async fn create_job(&self, name: &str, cron_schedule: &str) -> Result<Job> {
        let name = validate_name(name)?;
        let cron_schedule = cron_schedule.trim();
        let next_run_at = self.evaluator.next_after(cron_schedule, self.now())?;

        let job = self.store.create_job(name, cron_schedule, next_run_at).await?;
        info!(job_id = job.id, job_name = %job.name, next_run_at = %job.next_run_at, "Job created");
        Ok(job)
    }

    /// Get a job by ID
    pub async fn get_job(&self, id: JobId) -> Result<Job> {
        self.store.get_job(id).await
    }

    /// All jobs, newest first
    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        self.store.list_jobs().await
    }

    /// Delete a job and its history
    pub async fn delete_job(&self, id: JobId) -> Result<()> {
        self.store.delete_job(id).await?;
        info!(job_id = id, "Job deleted");
        Ok(())
    }

    /// Make a job due immediately
    ///
    /// The next tick on any instance picks it up through the normal locked
    /// path; nothing runs inline.
    pub async fn trigger_now(&self, id: JobId) -> Result<Job> {
        let now = self.now();
        self.store.advance_next_fire(id, now).await?;
        info!(job_id = id, "Job triggered manually");
        self.store.get_job(id).await
    }

    /// Recent execution records, optionally for one job
    pub async fn list_history(&self, job_id: Option<JobId>) -> Result<Vec<ExecutionRecord>> {
        if let Some(id) = job_id {
            // Distinguish "no runs yet" from "no such job"
            self.store.get_job(id).await?;
        }
        self.history.recent(job_id).await
    }

    /// Insert a job unless one with the same name exists
    ///
    /// Seeded jobs are due immediately. Returns `None` when the name was
    /// already taken.
    pub async fn seed(&self, name: &str, cron_schedule: &str) -> Result<Option<Job>> {
        let name = validate_name(name)?;
        if self.store.find_job_by_name(name).await?.is_some() {
            return Ok(None);
        }

        let cron_schedule = cron_schedule.trim();
        self.evaluator.validate(cron_schedule)?;

        let job = self.store.create_job(name, cron_schedule, self.now()).await?;
        info!(job_id = job.id, job_name = %job.name, "Seeded job");
        Ok(Some(job))
    }
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SchedulerError::InvalidConfig(
            "job name must not be empty".to_string(),
        ));
    }
    Ok(name)
}

#[cfg(test)]
mod tests;
