//! Distributed cron scheduling
//!
//! Every instance runs the same loop against shared state; there is no
//! leader and no peer-to-peer traffic.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ SchedulerEngine │  Tick loop, one per instance
//! └───┬─────────┬───┘
//!     │         │
//!     ▼         ▼
//! ┌────────┐ ┌─────────────┐
//! │JobStore│ │ LockService │  Relational jobs/history, TTL locks
//! └────────┘ └─────────────┘
//!     ▲
//!     │
//! ┌────────────┐
//! │ JobService │  Create/delete/trigger/history for outer surfaces
//! └────────────┘
//! ```
//!
//! Delivery is at-least-once per fire instant: a lock only narrows the
//! window in which two instances can run the same job.
//!
//! # Example
//!
//! ```ignore
//! use cronmesh_core::scheduler::{
//!     RedisLockService, SchedulerConfig, SchedulerEngine, SqliteJobStore,
//! };
//!
//! let store = Arc::new(SqliteJobStore::from_path(&db_path).await?);
//! let locks = Arc::new(RedisLockService::new("redis://127.0.0.1:6379")?);
//! let engine = SchedulerEngine::new(store, locks, SchedulerConfig::default());
//!
//! engine.run(shutdown_token).await?;
//! ```

mod engine;
mod evaluator;
mod history;
mod lock;
mod service;
mod store;
mod types;

pub use engine::{
    Clock, JobExecutionFuture, JobExecutor, SchedulerConfig, SchedulerEngine,
    SchedulerEngineBuilder, SchedulerState, TickReport, DEFAULT_EXECUTION_DETAILS,
};
pub use evaluator::{CronEvaluator, ScheduleEvaluator};
pub use history::{HistoryRecorder, DEFAULT_HISTORY_LIMIT};
pub use lock::{
    lock_key, LockService, MemoryLockService, RedisLockService, DEFAULT_LOCK_TTL, LOCK_KEY_PREFIX,
};
pub use service::JobService;
pub use store::{JobStore, SqliteJobStore};
pub use types::{
    ExecutionRecord, ExecutionStatus, Job, JobId, Result as SchedulerResult, SchedulerError,
};
