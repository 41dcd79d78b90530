use super::*;
use crate::scheduler::store::SqliteJobStore;
use crate::scheduler::types::ExecutionStatus;
use chrono::TimeZone;
use tempfile::TempDir;

struct TestContext {
    store: Arc<SqliteJobStore>,
    service: JobService,
    _dir: TempDir,
}

fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
}

async fn create_test_context(now: DateTime<Utc>) -> TestContext {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        SqliteJobStore::from_path(&dir.path().join("service.db"))
            .await
            .unwrap(),
    );
    let service = JobService::new(store.clone()).with_clock(Arc::new(move || now));
    TestContext {
        store,
        service,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_create_job_schedules_next_match() {
    let ctx = create_test_context(at(12, 3, 0)).await;

    let job = ctx.service.create_job("Reports", "*/5 * * * *").await.unwrap();
    assert_eq!(job.name, "Reports");
    assert_eq!(job.cron_schedule, "*/5 * * * *");
    assert_eq!(job.next_run_at, at(12, 5, 0));

    let listed = ctx.service.list_jobs().await.unwrap();
    assert_eq!(listed, vec![job]);
}

#[tokio::test]
async fn test_create_job_rejects_invalid_expression() {
    let ctx = create_test_context(at(12, 0, 0)).await;

    let result = ctx.service.create_job("broken", "every minute").await;
    assert!(matches!(result, Err(SchedulerError::InvalidExpression { .. })));
    assert!(ctx.service.list_jobs().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_job_rejects_blank_name() {
    let ctx = create_test_context(at(12, 0, 0)).await;

    let result = ctx.service.create_job("   ", "* * * * *").await;
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
}

#[tokio::test]
async fn test_trigger_now_makes_job_due() {
    let ctx = create_test_context(at(12, 0, 0)).await;
    let job = ctx.service.create_job("hourly", "0 * * * *").await.unwrap();
    assert_eq!(job.next_run_at, at(13, 0, 0));

    let triggered = ctx.service.trigger_now(job.id).await.unwrap();
    assert_eq!(triggered.next_run_at, at(12, 0, 0));

    let due = ctx.store.list_due(at(12, 0, 0)).await.unwrap();
    assert_eq!(due.len(), 1);
}

#[tokio::test]
async fn test_trigger_unknown_job() {
    let ctx = create_test_context(at(12, 0, 0)).await;
    let result = ctx.service.trigger_now(99).await;
    assert!(matches!(result, Err(SchedulerError::JobNotFound(99))));
}

#[tokio::test]
async fn test_delete_job() {
    let ctx = create_test_context(at(12, 0, 0)).await;
    let job = ctx.service.create_job("temp", "* * * * *").await.unwrap();

    ctx.service.delete_job(job.id).await.unwrap();
    assert!(matches!(
        ctx.service.get_job(job.id).await,
        Err(SchedulerError::JobNotFound(_))
    ));
    assert!(matches!(
        ctx.service.delete_job(job.id).await,
        Err(SchedulerError::JobNotFound(_))
    ));
}

#[tokio::test]
async fn test_list_history_for_job() {
    let ctx = create_test_context(at(12, 0, 0)).await;
    let job = ctx.service.create_job("audited", "* * * * *").await.unwrap();

    ctx.store
        .append_history(job.id, at(12, 1, 0), ExecutionStatus::Success, "ok")
        .await
        .unwrap();
    ctx.store
        .append_history(job.id, at(12, 2, 0), ExecutionStatus::Failure, "boom")
        .await
        .unwrap();

    let history = ctx.service.list_history(Some(job.id)).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].run_at, at(12, 2, 0));

    let all = ctx.service.list_history(None).await.unwrap();
    assert_eq!(all.len(), 2);

    assert!(matches!(
        ctx.service.list_history(Some(job.id + 100)).await,
        Err(SchedulerError::JobNotFound(_))
    ));
}

#[tokio::test]
async fn test_seed_is_idempotent_by_name() {
    let ctx = create_test_context(at(12, 0, 0)).await;

    let seeded = ctx.service.seed("Send Email", "*/1 * * * *").await.unwrap();
    let seeded = seeded.expect("first seed inserts");
    assert_eq!(seeded.next_run_at, at(12, 0, 0));

    let again = ctx.service.seed("Send Email", "*/1 * * * *").await.unwrap();
    assert!(again.is_none());
    assert_eq!(ctx.service.list_jobs().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_seed_rejects_invalid_expression() {
    let ctx = create_test_context(at(12, 0, 0)).await;
    let result = ctx.service.seed("bad", "61 * * * *").await;
    assert!(matches!(result, Err(SchedulerError::InvalidExpression { .. })));
}

#[tokio::test]
async fn test_ping() {
    let ctx = create_test_context(at(12, 0, 0)).await;
    tokio_test::assert_ok!(ctx.service.ping().await);
}
