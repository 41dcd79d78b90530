//! Web API module for Cronmesh
//!
//! Provides REST endpoints for:
//! - Health checks
//! - Job management (create, list, delete, run now)
//! - Execution history

pub mod health;
pub mod jobs;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json, Router};
use cronmesh_core::{JobService, LockService, SchedulerEngine, SchedulerError};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use health::health_routes;
pub use jobs::jobs_routes;

/// Standard API response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Scheduler error rendered as an HTTP response
pub struct ApiError(pub SchedulerError);

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            SchedulerError::InvalidExpression { .. } | SchedulerError::InvalidConfig(_) => {
                StatusCode::BAD_REQUEST
            }
            SchedulerError::JobNotFound(_) => StatusCode::NOT_FOUND,
            SchedulerError::StoreUnavailable(_) | SchedulerError::LockUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            SchedulerError::CorruptRecord(_)
            | SchedulerError::Execution(_)
            | SchedulerError::Timeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("API request failed: {}", self.0);
        }
        (status, Json(ApiResponse::<()>::error(self.0.to_string()))).into_response()
    }
}

/// Build the full application router
pub fn app(
    service: JobService,
    locks: Arc<dyn LockService>,
    engine: Option<Arc<SchedulerEngine>>,
) -> Router {
    let app = Router::new()
        .merge(health_routes())
        .merge(jobs_routes())
        .layer(Extension(service))
        .layer(Extension(locks));

    // Scheduler state is only reported when this process runs one
    let app = if let Some(engine) = engine {
        app.layer(Extension(engine))
    } else {
        app
    };

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
