//! Health check endpoints with component-level diagnostics.
//!
//! - `/health`: 200 when the job store answers, 503 otherwise (load balancers)
//! - `/health/detailed`: per-component status (database, locks, scheduler)

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use cronmesh_core::{JobService, LockService, SchedulerEngine};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Simple health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Detailed health response with per-component checks
#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub checks: HealthChecks,
}

/// All component health checks
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: ComponentHealth,
    pub locks: ComponentHealth,
    pub scheduler: ComponentHealth,
}

/// Individual component health status
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ComponentHealth {
    fn healthy(latency_ms: u64) -> Self {
        Self {
            status: "healthy",
            latency_ms: Some(latency_ms),
            error: None,
            details: None,
        }
    }

    fn unhealthy(error: String) -> Self {
        Self {
            status: "unhealthy",
            latency_ms: None,
            error: Some(error),
            details: None,
        }
    }

    fn disabled() -> Self {
        Self {
            status: "disabled",
            latency_ms: None,
            error: None,
            details: None,
        }
    }
}

/// Simple health check (for load balancers)
async fn health_check(
    Extension(service): Extension<JobService>,
) -> (StatusCode, Json<HealthResponse>) {
    match service.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                version: env!("CARGO_PKG_VERSION"),
                error: None,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unhealthy",
                version: env!("CARGO_PKG_VERSION"),
                error: Some(e.to_string()),
            }),
        ),
    }
}

/// Detailed health check with all component statuses
async fn detailed_health_check(
    Extension(service): Extension<JobService>,
    Extension(locks): Extension<Arc<dyn LockService>>,
    scheduler: Option<Extension<Arc<SchedulerEngine>>>,
) -> (StatusCode, Json<DetailedHealthResponse>) {
    let database = check_database(&service).await;
    let lock_health = check_locks(locks.as_ref()).await;
    let scheduler = match scheduler {
        Some(Extension(engine)) => check_scheduler(&engine),
        None => ComponentHealth::disabled(),
    };

    // Without the store nothing works; a lock outage only skips jobs
    let (code, status) = if database.status != "healthy" {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    } else if lock_health.status != "healthy" {
        (StatusCode::OK, "degraded")
    } else {
        (StatusCode::OK, "healthy")
    };

    (
        code,
        Json(DetailedHealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            checks: HealthChecks {
                database,
                locks: lock_health,
                scheduler,
            },
        }),
    )
}

async fn check_database(service: &JobService) -> ComponentHealth {
    let start = Instant::now();
    match service.ping().await {
        Ok(()) => ComponentHealth::healthy(start.elapsed().as_millis() as u64),
        Err(e) => ComponentHealth::unhealthy(e.to_string()),
    }
}

async fn check_locks(locks: &dyn LockService) -> ComponentHealth {
    let start = Instant::now();
    match locks.ping().await {
        Ok(()) => ComponentHealth::healthy(start.elapsed().as_millis() as u64),
        Err(e) => ComponentHealth::unhealthy(e.to_string()),
    }
}

fn check_scheduler(engine: &SchedulerEngine) -> ComponentHealth {
    ComponentHealth {
        status: "healthy",
        latency_ms: None,
        error: None,
        details: Some(serde_json::json!({
            "instance_id": engine.instance_id().to_string(),
            "state": engine.state().to_string(),
            "tick_interval_secs": engine.config().tick_interval_secs,
        })),
    }
}

/// Create health routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_health_healthy() {
        let h = ComponentHealth::healthy(42);
        assert_eq!(h.status, "healthy");
        assert_eq!(h.latency_ms, Some(42));
        assert!(h.error.is_none());
    }

    #[test]
    fn test_component_health_unhealthy() {
        let h = ComponentHealth::unhealthy("connection refused".to_string());
        assert_eq!(h.status, "unhealthy");
        assert!(h.latency_ms.is_none());
        assert_eq!(h.error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_disabled_serialization_omits_empty_fields() {
        let json = serde_json::to_value(ComponentHealth::disabled()).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "disabled" }));
    }
}
