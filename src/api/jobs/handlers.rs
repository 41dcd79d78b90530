use axum::extract::{Path, Query};
use axum::{Extension, Json};
use tracing::info;

use cronmesh_core::{ExecutionRecord, Job, JobId, JobService};

use super::super::{ApiError, ApiResponse};
use super::types::{CreateJobRequest, HistoryQuery, IdQuery, StatusView};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// List all jobs
pub async fn list_jobs(Extension(service): Extension<JobService>) -> ApiResult<Vec<Job>> {
    let jobs = service.list_jobs().await?;
    Ok(Json(ApiResponse::success(jobs)))
}

/// Create a job; the first fire is the next match after now
pub async fn create_job(
    Extension(service): Extension<JobService>,
    Json(request): Json<CreateJobRequest>,
) -> ApiResult<Job> {
    let job = service
        .create_job(&request.name, &request.cron_schedule)
        .await?;
    info!(job_id = job.id, "Created job via API: {}", job.name);
    Ok(Json(ApiResponse::success(job)))
}

/// Delete a job
pub async fn delete_job(
    Extension(service): Extension<JobService>,
    Path(id): Path<JobId>,
) -> ApiResult<StatusView> {
    service.delete_job(id).await?;
    Ok(Json(ApiResponse::success(StatusView::new(id, "deleted"))))
}

/// `DELETE /jobs?id=`
pub async fn delete_job_by_query(
    service: Extension<JobService>,
    Query(query): Query<IdQuery>,
) -> ApiResult<StatusView> {
    delete_job(service, Path(query.id)).await
}

/// Make a job due now; the next tick on any instance runs it
pub async fn run_job(
    Extension(service): Extension<JobService>,
    Path(id): Path<JobId>,
) -> ApiResult<StatusView> {
    service.trigger_now(id).await?;
    Ok(Json(ApiResponse::success(StatusView::new(
        id,
        "scheduled_now",
    ))))
}

/// `POST /jobs/run?id=`
pub async fn run_job_by_query(
    service: Extension<JobService>,
    Query(query): Query<IdQuery>,
) -> ApiResult<StatusView> {
    run_job(service, Path(query.id)).await
}

/// Most recent executions, newest first
pub async fn list_history(
    Extension(service): Extension<JobService>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<ExecutionRecord>> {
    let records = service.list_history(query.job_id).await?;
    Ok(Json(ApiResponse::success(records)))
}
