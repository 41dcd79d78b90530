use crate::api::app;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use cronmesh_core::{ExecutionStatus, JobService, JobStore, MemoryLockService, SqliteJobStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestContext {
    store: Arc<SqliteJobStore>,
    router: Router,
    _dir: TempDir,
}

async fn create_test_context() -> TestContext {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        SqliteJobStore::from_path(&dir.path().join("api.db"))
            .await
            .unwrap(),
    );
    let service = JobService::new(store.clone());
    let router = app(service, Arc::new(MemoryLockService::new()), None);
    TestContext {
        store,
        router,
        _dir: dir,
    }
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_create_and_list_jobs() {
    let ctx = create_test_context().await;

    let (status, body) = send(
        &ctx.router,
        Method::POST,
        "/jobs",
        Some(json!({ "name": "Reports", "cron_schedule": "*/5 * * * *" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Reports");
    assert!(body["data"]["next_run_at"].is_string());

    send(
        &ctx.router,
        Method::POST,
        "/jobs",
        Some(json!({ "name": "Cleanup", "cron_schedule": "0 3 * * *" })),
    )
    .await;

    let (status, body) = send(&ctx.router, Method::GET, "/jobs", None).await;
    assert_eq!(status, StatusCode::OK);
    let jobs = body["data"].as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    // Newest first
    assert_eq!(jobs[0]["name"], "Cleanup");
}

#[tokio::test]
async fn test_create_rejects_invalid_cron() {
    let ctx = create_test_context().await;

    let (status, body) = send(
        &ctx.router,
        Method::POST,
        "/jobs",
        Some(json!({ "name": "broken", "cron_schedule": "bogus" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("bogus"));
}

#[tokio::test]
async fn test_delete_job() {
    let ctx = create_test_context().await;
    let job = ctx
        .store
        .create_job("temp", "* * * * *", Utc::now())
        .await
        .unwrap();

    let (status, body) = send(&ctx.router, Method::DELETE, &format!("/jobs/{}", job.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "deleted");

    let (status, _) = send(&ctx.router, Method::DELETE, &format!("/jobs/{}", job.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_job_by_query() {
    let ctx = create_test_context().await;
    let job = ctx
        .store
        .create_job("temp", "* * * * *", Utc::now())
        .await
        .unwrap();

    let (status, _) = send(&ctx.router, Method::DELETE, &format!("/jobs?id={}", job.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(ctx.store.list_jobs().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_run_job_now() {
    let ctx = create_test_context().await;
    let later = Utc::now() + chrono::Duration::hours(6);
    let job = ctx
        .store
        .create_job("nightly", "0 3 * * *", later)
        .await
        .unwrap();

    let (status, body) = send(
        &ctx.router,
        Method::POST,
        &format!("/jobs/{}/run", job.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "scheduled_now");

    let due = ctx.store.list_due(Utc::now()).await.unwrap();
    assert_eq!(due.len(), 1);

    let (status, _) = send(&ctx.router, Method::POST, "/jobs/run?id=999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_history_listing() {
    let ctx = create_test_context().await;
    let job = ctx
        .store
        .create_job("audited", "* * * * *", Utc::now())
        .await
        .unwrap();
    for _ in 0..3 {
        ctx.store
            .append_history(job.id, Utc::now(), ExecutionStatus::Success, "Executed via scheduler")
            .await
            .unwrap();
    }

    let (status, body) = send(
        &ctx.router,
        Method::GET,
        &format!("/jobs/history?job_id={}", job.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["status"], "success");

    let (status, body) = send(&ctx.router, Method::GET, "/jobs/history", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (status, _) = send(&ctx.router, Method::GET, "/jobs/history?job_id=404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_endpoints() {
    let ctx = create_test_context().await;

    let (status, body) = send(&ctx.router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&ctx.router, Method::GET, "/health/detailed", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["database"]["status"], "healthy");
    assert_eq!(body["checks"]["locks"]["status"], "healthy");
    assert_eq!(body["checks"]["scheduler"]["status"], "disabled");
}
