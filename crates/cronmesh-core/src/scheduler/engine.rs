//! Scheduler execution engine
//!
//! Each instance runs one tick-driven loop:
//!
//! 1. fetch every job whose `next_run_at <= now`
//! 2. per job, try the `job_lock:<id>` lock; skip the job if it is held
//!    or the lock backend fails
//! 3. on acquisition, check the cron expression, run the job body, append
//!    a history record and persist the next fire instant
//!
//! One job's failure never aborts the rest of the batch. Instances do not
//! talk to each other; the lock keyspace and the job rows are the only
//! shared state.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::evaluator::{CronEvaluator, ScheduleEvaluator};
use super::history::HistoryRecorder;
use super::lock::{lock_key, LockService};
use super::store::JobStore;
use super::types::{ExecutionStatus, Job, Result, SchedulerError};

/// Callback type for executing job bodies
pub type JobExecutor = Arc<dyn Fn(Job) -> JobExecutionFuture + Send + Sync>;

/// Future type for job execution; resolves to the detail text
pub type JobExecutionFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<String>> + Send>>;

/// Source of "now" for the engine
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Details recorded when no executor is installed
pub const DEFAULT_EXECUTION_DETAILS: &str = "Executed via scheduler";

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Tick interval in seconds
    pub tick_interval_secs: u64,
    /// Job lock time-to-live in seconds
    pub lock_ttl_secs: u64,
    /// Maximum job bodies in flight within one tick
    pub max_concurrent: usize,
    /// Per-job body timeout in seconds (0 = unbounded)
    pub job_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 10,
            lock_ttl_secs: 10,
            max_concurrent: 1,
            job_timeout_secs: 0,
        }
    }
}

impl SchedulerConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set tick interval
    pub fn with_tick_interval(mut self, secs: u64) -> Self {
        self.tick_interval_secs = secs;
        self
    }

    /// Set lock TTL
    pub fn with_lock_ttl(mut self, secs: u64) -> Self {
        self.lock_ttl_secs = secs;
        self
    }

    /// Set max concurrent job bodies per tick
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Set per-job body timeout
    pub fn with_job_timeout(mut self, secs: u64) -> Self {
        self.job_timeout_secs = secs;
        self
    }

    /// Reject zero intervals and zero concurrency
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_secs == 0 {
            return Err(SchedulerError::InvalidConfig(
                "tick_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.lock_ttl_secs == 0 {
            return Err(SchedulerError::InvalidConfig(
                "lock_ttl_secs must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent == 0 {
            return Err(SchedulerError::InvalidConfig(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }
}

/// Loop states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next tick
    Idle,
    /// Processing a batch of due jobs
    Ticking,
    /// Cancelled; no further batches
    Stopped,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Ticking => write!(f, "Ticking"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Summary of one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Jobs returned by the due query
    pub due: usize,
    /// Jobs whose body ran (either outcome)
    pub executed: usize,
    /// Executed jobs whose body failed or timed out
    pub failed: usize,
    /// Skipped because another holder owns the lock
    pub skipped_locked: usize,
    /// Skipped because the lock backend errored
    pub lock_errors: usize,
    /// Skipped because the cron expression is unusable
    pub skipped_invalid: usize,
    /// History or next-fire writes that failed
    pub store_errors: usize,
    /// Not attempted because shutdown was requested
    pub cancelled: usize,
}

/// Per-job result inside a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobOutcome {
    Executed {
        status: ExecutionStatus,
        store_errors: usize,
    },
    LockHeld,
    LockError,
    InvalidExpression,
    Cancelled,
}

impl TickReport {
    fn record(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Executed {
                status,
                store_errors,
            } => {
                self.executed += 1;
                if status == ExecutionStatus::Failure {
                    self.failed += 1;
                }
                self.store_errors += store_errors;
            }
            JobOutcome::LockHeld => self.skipped_locked += 1,
            JobOutcome::LockError => self.lock_errors += 1,
            JobOutcome::InvalidExpression => self.skipped_invalid += 1,
            JobOutcome::Cancelled => self.cancelled += 1,
        }
    }
}

/// Scheduler engine: the per-instance scheduling loop
pub struct SchedulerEngine {
    store: Arc<dyn JobStore>,
    locks: Arc<dyn LockService>,
    evaluator: Arc<dyn ScheduleEvaluator>,
    history: HistoryRecorder,
    config: SchedulerConfig,
    executor: Option<JobExecutor>,
    clock: Clock,
    instance_id: Uuid,
    state: AtomicU8,
}

impl SchedulerEngine {
    /// Create a new scheduler engine
    pub fn new(
        store: Arc<dyn JobStore>,
        locks: Arc<dyn LockService>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            history: HistoryRecorder::new(store.clone()),
            store,
            locks,
            evaluator: Arc::new(CronEvaluator::new()),
            config,
            executor: None,
            clock: Arc::new(Utc::now),
            instance_id: Uuid::new_v4(),
            state: AtomicU8::new(SchedulerState::Idle as u8),
        }
    }

    /// Set the job executor callback
    pub fn with_executor(mut self, executor: JobExecutor) -> Self {
        self.executor = Some(executor);
        self
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

    /// Use a fixed instance ID
    pub fn with_instance_id(mut self, instance_id: Uuid) -> Self {
        self.instance_id = instance_id;
        self
    }

    /// This instance's ID
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Engine configuration
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Current loop state
    pub fn state(&self) -> SchedulerState {
        match self.state.load(Ordering::SeqCst) {
            0 => SchedulerState::Idle,
            1 => SchedulerState::Ticking,
            _ => SchedulerState::Stopped,
        }
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Run the scheduler loop until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        self.config.validate()?;

        info!(
            instance_id = %self.instance_id,
            tick_interval_secs = self.config.tick_interval_secs,
            lock_ttl_secs = self.config.lock_ttl_secs,
            "Scheduler engine starting"
        );

        let period = self.config.tick_interval();
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            tokio::select! {
                _ = interval.tick() => {
                    if shutdown.is_cancelled() {
                        break;
                    }
                    match self.tick_with(&shutdown).await {
                        Ok(report) if report.due > 0 => {
                            debug!(
                                due = report.due,
                                executed = report.executed,
                                skipped_locked = report.skipped_locked,
                                skipped_invalid = report.skipped_invalid,
                                "Tick complete"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => error!("Scheduler tick failed: {}", e),
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Scheduler engine shutting down");
                    break;
                }
            }
        }

        self.set_state(SchedulerState::Stopped);
        info!(instance_id = %self.instance_id, "Scheduler engine stopped");
        Ok(())
    }

    /// Process one batch of due jobs
    ///
    /// Fails only when the due-job query itself fails; per-job errors are
    /// logged and counted in the report.
    pub async fn tick(&self) -> Result<TickReport> {
        self.tick_with(&CancellationToken::new()).await
    }

    async fn tick_with(&self, shutdown: &CancellationToken) -> Result<TickReport> {
        self.set_state(SchedulerState::Ticking);
        let result = self.process_due_jobs(shutdown).await;
        self.set_state(SchedulerState::Idle);
        result
    }

    async fn process_due_jobs(&self, shutdown: &CancellationToken) -> Result<TickReport> {
        let now = (self.clock)();
        let due = self.store.list_due(now).await.inspect_err(|e| {
            error!("Failed to query due jobs: {}", e);
        })?;

        let mut report = TickReport {
            due: due.len(),
            ..TickReport::default()
        };

        if due.is_empty() {
            debug!("No jobs due");
            return Ok(report);
        }

        debug!(count = due.len(), "Processing due jobs");

        // `buffered` keeps store order and, at width 1, runs jobs one at a time
        let outcomes: Vec<JobOutcome> = futures::stream::iter(due)
            .map(|job| self.process_job(job, shutdown))
            .buffered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            report.record(outcome);
        }

        Ok(report)
    }

    async fn process_job(&self, job: Job, shutdown: &CancellationToken) -> JobOutcome {
        if shutdown.is_cancelled() {
            return JobOutcome::Cancelled;
        }

        let key = lock_key(job.id);
        match self.locks.try_acquire(&key, self.config.lock_ttl()).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(job_id = job.id, lock_key = %key, "Job locked by another node, skipping");
                return JobOutcome::LockHeld;
            }
            Err(e) => {
                warn!(job_id = job.id, lock_key = %key, error = %e, "Lock attempt failed, skipping");
                return JobOutcome::LockError;
            }
        }

        // An unusable expression leaves next_run_at untouched: the job stays
        // due and is retried every tick until it is corrected.
        if let Err(e) = self.evaluator.next_after(&job.cron_schedule, (self.clock)()) {
            error!(
                job_id = job.id,
                expression = %job.cron_schedule,
                error = %e,
                "Cannot evaluate cron expression, job not executed"
            );
            return JobOutcome::InvalidExpression;
        }

        info!(job_id = job.id, job_name = %job.name, "Executing job");

        let run_at = (self.clock)();
        let started = Instant::now();
        let result = self.execute_job(&job).await;

        let elapsed = started.elapsed();
        if elapsed > self.config.lock_ttl() {
            warn!(
                job_id = job.id,
                elapsed_ms = elapsed.as_millis() as u64,
                lock_ttl_secs = self.config.lock_ttl_secs,
                "Job body outlived its lock; another instance may have started it"
            );
        }

        let (status, details) = match result {
            Ok(output) => (ExecutionStatus::Success, output),
            Err(e) => {
                warn!(job_id = job.id, job_name = %job.name, "Job failed: {}", e);
                (ExecutionStatus::Failure, e.to_string())
            }
        };

        let mut store_errors = 0;
        if let Err(e) = self.history.record(&job, run_at, status, &details).await {
            error!(job_id = job.id, "Failed to record execution history: {}", e);
            store_errors += 1;
        }

        match self.evaluator.next_after(&job.cron_schedule, (self.clock)()) {
            Ok(next) => match self.store.advance_next_fire(job.id, next).await {
                Ok(()) => info!(job_id = job.id, next_run_at = %next, "Job rescheduled"),
                Err(e) => {
                    error!(job_id = job.id, "Failed to update next run: {}", e);
                    store_errors += 1;
                }
            },
            Err(e) => {
                error!(job_id = job.id, error = %e, "Cannot compute next run");
                store_errors += 1;
            }
        }

        JobOutcome::Executed {
            status,
            store_errors,
        }
    }

    /// Run the job body, bounded by the configured timeout
    async fn execute_job(&self, job: &Job) -> Result<String> {
        let body = match &self.executor {
            Some(executor) => executor(job.clone()),
            None => {
                let name = job.name.clone();
                Box::pin(async move {
                    debug!("Would execute job: {}", name);
                    Ok(DEFAULT_EXECUTION_DETAILS.to_string())
                }) as JobExecutionFuture
            }
        };

        match self.config.job_timeout_secs {
            0 => body.await,
            secs => tokio::time::timeout(Duration::from_secs(secs), body)
                .await
                .unwrap_or(Err(SchedulerError::Timeout(secs))),
        }
    }
}

/// Builder for creating SchedulerEngine
pub struct SchedulerEngineBuilder {
    store: Option<Arc<dyn JobStore>>,
    locks: Option<Arc<dyn LockService>>,
    evaluator: Option<Arc<dyn ScheduleEvaluator>>,
    config: SchedulerConfig,
    executor: Option<JobExecutor>,
    clock: Option<Clock>,
}

impl SchedulerEngineBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            store: None,
            locks: None,
            evaluator: None,
            config: SchedulerConfig::default(),
            executor: None,
            clock: None,
        }
    }

    /// Set the job store
    pub fn store(mut self, store: Arc<dyn JobStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the lock service
    pub fn locks(mut self, locks: Arc<dyn LockService>) -> Self {
        self.locks = Some(locks);
        self
    }

    /// Set the schedule evaluator
    pub fn evaluator(mut self, evaluator: Arc<dyn ScheduleEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Set the configuration
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the executor
    pub fn executor(mut self, executor: JobExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Set the clock
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<SchedulerEngine> {
        let store = self
            .store
            .ok_or_else(|| SchedulerError::InvalidConfig("Store is required".to_string()))?;
        let locks = self
            .locks
            .ok_or_else(|| SchedulerError::InvalidConfig("Lock service is required".to_string()))?;
        self.config.validate()?;

        let mut engine = SchedulerEngine::new(store, locks, self.config);
        if let Some(evaluator) = self.evaluator {
            engine = engine.with_evaluator(evaluator);
        }
        if let Some(executor) = self.executor {
            engine = engine.with_executor(executor);
        }
        if let Some(clock) = self.clock {
            engine = engine.with_clock(clock);
        }

        Ok(engine)
    }
}

impl Default for SchedulerEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
