//! Scheduler job types and error definitions
//!
//! Contains the core types shared by the store, the lock services and the
//! scheduling engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Store-assigned job identifier
pub type JobId = i64;

/// Scheduler error types
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Cron text failed to parse or never fires
    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidExpression {
        /// The offending expression
        expression: String,
        /// Parser message
        reason: String,
    },
    /// Query or update against the job store failed
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
    /// Stored row could not be decoded
    #[error("corrupt stored record: {0}")]
    CorruptRecord(String),
    /// Lock backend error (distinct from the lock being held)
    #[error("lock backend unavailable: {0}")]
    LockUnavailable(String),
    /// Job not found
    #[error("job not found: {0}")]
    JobNotFound(JobId),
    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Job body returned an error
    #[error("execution error: {0}")]
    Execution(String),
    /// Job body exceeded its time budget
    #[error("job body timed out after {0}s")]
    Timeout(u64),
}

impl SchedulerError {
    /// Build an `InvalidExpression` error
    pub fn invalid_expression(expression: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidExpression {
            expression: expression.into(),
            reason: reason.to_string(),
        }
    }
}

/// A persisted job definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Unique, store-assigned ID
    pub id: JobId,
    /// Display name
    pub name: String,
    /// Five-field cron expression
    pub cron_schedule: String,
    /// Next instant at which the job becomes due
    pub next_run_at: DateTime<Utc>,
}

impl Job {
    /// Whether the job is due at `now` (inclusive)
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_run_at <= now
    }
}

/// Outcome of one execution attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Job body completed
    Success,
    /// Job body failed or timed out
    Failure,
}

impl ExecutionStatus {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "failure" | "failed" => Ok(Self::Failure),
            other => Err(format!("unknown execution status: {other}")),
        }
    }
}

/// Append-only execution history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Record ID
    pub id: i64,
    /// Owning job
    pub job_id: JobId,
    /// When the body ran
    pub run_at: DateTime<Utc>,
    /// Outcome
    pub status: ExecutionStatus,
    /// Free-text details (body output or error)
    pub details: String,
}

/// Internal row type for history queries
#[derive(FromRow)]
pub(super) struct HistoryRow {
    pub id: i64,
    pub job_id: i64,
    pub run_at: DateTime<Utc>,
    pub status: String,
    pub details: Option<String>,
}

impl TryFrom<HistoryRow> for ExecutionRecord {
    type Error = SchedulerError;

    fn try_from(row: HistoryRow) -> Result<Self> {
        Ok(ExecutionRecord {
            id: row.id,
            job_id: row.job_id,
            run_at: row.run_at,
            status: row
                .status
                .parse()
                .map_err(|e: String| {
                    SchedulerError::CorruptRecord(format!("job_history row {}: {e}", row.id))
                })?,
            details: row.details.unwrap_or_default(),
        })
    }
}
