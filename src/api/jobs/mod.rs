//! Job management API endpoints
//!
//! GET    /jobs              - List jobs, newest first
//! POST   /jobs              - Create a job
//! DELETE /jobs/:id          - Delete a job and its history
//! POST   /jobs/:id/run      - Make a job due immediately
//! GET    /jobs/history      - Recent executions (`?job_id=` to filter)
//!
//! `DELETE /jobs?id=` and `POST /jobs/run?id=` are accepted as aliases.

pub mod handlers;
pub mod types;

#[cfg(test)]
mod tests;

pub use handlers::{create_job, delete_job, list_history, list_jobs, run_job};
pub use types::{CreateJobRequest, HistoryQuery, IdQuery, StatusView};

use axum::{
    routing::{delete, get, post},
    Router,
};

/// Create job routes
pub fn jobs_routes() -> Router {
    Router::new()
        .route(
            "/jobs",
            get(list_jobs)
                .post(create_job)
                .delete(handlers::delete_job_by_query),
        )
        .route("/jobs/history", get(list_history))
        .route("/jobs/run", post(handlers::run_job_by_query))
        .route("/jobs/:id", delete(delete_job))
        .route("/jobs/:id/run", post(run_job))
}
