use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{JobStore, SqliteJobStore};
use crate::scheduler::types::{
    ExecutionRecord, ExecutionStatus, HistoryRow, Job, JobId, Result, SchedulerError,
};

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Job>> {
        let jobs: Vec<Job> = sqlx::query_as(
            r#"
            SELECT id, name, cron_schedule, next_run_at FROM jobs
            WHERE next_run_at <= ?
            ORDER BY next_run_at ASC, id ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    async fn advance_next_fire(&self, id: JobId, next_run_at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query("UPDATE jobs SET next_run_at = ? WHERE id = ?")
            .bind(next_run_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(SchedulerError::JobNotFound(id));
        }

        Ok(())
    }

    async fn append_history(
        &self,
        job_id: JobId,
        run_at: DateTime<Utc>,
        status: ExecutionStatus,
        details: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO job_history (job_id, run_at, status, details)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(job_id)
        .bind(run_at)
        .bind(status.as_str())
        .bind(details)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn create_job(
        &self,
        name: &str,
        cron_schedule: &str,
        next_run_at: DateTime<Utc>,
    ) -> Result<Job> {
        let result =
            sqlx::query("INSERT INTO jobs (name, cron_schedule, next_run_at) VALUES (?, ?, ?)")
                .bind(name)
                .bind(cron_schedule)
                .bind(next_run_at)
                .execute(&self.pool)
                .await?;

        Ok(Job {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            cron_schedule: cron_schedule.to_string(),
            next_run_at,
        })
    }

    async fn get_job(&self, id: JobId) -> Result<Job> {
        sqlx::query_as("SELECT id, name, cron_schedule, next_run_at FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(SchedulerError::JobNotFound(id))
    }

    async fn find_job_by_name(&self, name: &str) -> Result<Option<Job>> {
        let job = sqlx::query_as(
            "SELECT id, name, cron_schedule, next_run_at FROM jobs WHERE name = ? ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    async fn list_jobs(&self) -> Result<Vec<Job>> {
        let jobs: Vec<Job> =
            sqlx::query_as("SELECT id, name, cron_schedule, next_run_at FROM jobs ORDER BY id DESC")
                .fetch_all(&self.pool)
                .await?;

        Ok(jobs)
    }

    async fn delete_job(&self, id: JobId) -> Result<()> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(SchedulerError::JobNotFound(id));
        }

        Ok(())
    }

    async fn list_history(&self, job_id: Option<JobId>, limit: u32) -> Result<Vec<ExecutionRecord>> {
        let rows: Vec<HistoryRow> = match job_id {
            Some(job_id) => {
                sqlx::query_as(
                    r#"
                    SELECT id, job_id, run_at, status, details FROM job_history
                    WHERE job_id = ?
                    ORDER BY run_at DESC, id DESC
                    LIMIT ?
                    "#,
                )
                .bind(job_id)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT id, job_id, run_at, status, details FROM job_history
                    ORDER BY run_at DESC, id DESC
                    LIMIT ?
                    "#,
                )
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}
