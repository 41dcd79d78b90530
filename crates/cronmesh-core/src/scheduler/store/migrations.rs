use super::SqliteJobStore;
use crate::scheduler::types::Result;

impl SqliteJobStore {
    /// Create the `jobs` and `job_history` tables (idempotent)
    pub(super) async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                cron_schedule TEXT NOT NULL,
                next_run_at TIMESTAMP NOT NULL
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS job_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id INTEGER NOT NULL,
                run_at TIMESTAMP NOT NULL,
                status TEXT NOT NULL,
                details TEXT,
                FOREIGN KEY (job_id) REFERENCES jobs(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        // Polling query: WHERE next_run_at <= ?
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_next_run ON jobs(next_run_at)")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_history_job_run ON job_history(job_id, run_at)",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
