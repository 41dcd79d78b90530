//! Cronmesh Core - Distributed Cron Scheduling
//!
//! This crate provides the scheduling logic shared by every Cronmesh
//! instance:
//! - Scheduler: due-job scanning, TTL-bounded job locks and next-fire
//!   advancement over a relational job store
//! - Shutdown: coordinated cancellation and draining of workers

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod scheduler;
pub mod shutdown;

pub use scheduler::{
    CronEvaluator, ExecutionRecord, ExecutionStatus, Job, JobExecutor, JobId, JobService,
    JobStore, LockService, MemoryLockService, RedisLockService, ScheduleEvaluator,
    SchedulerConfig, SchedulerEngine, SchedulerError, SchedulerResult, SqliteJobStore,
};
pub use shutdown::{ShutdownController, ShutdownPhase, WorkerGuard};
