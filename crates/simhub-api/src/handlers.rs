//! REST API handlers.
//!
//! Each handler validates the inbound document, calls the registry, and
//! wraps the outcome in the JSON envelope.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::debug;

use simhub_proto::{PropagateConfigRequest, RegisterWorkerRequest, RouteSessionRequest};
use simhub_registry::{RegistryError, WorkerId};

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
        .into_response()
}

/// Map a registry error onto an HTTP status.
fn registry_error(e: RegistryError) -> Response {
    debug!(error = %e, "request rejected");
    match e {
        RegistryError::Conflict { .. } => error_response(&e.to_string(), StatusCode::CONFLICT),
        RegistryError::Unavailable => error_response(&e.to_string(), StatusCode::SERVICE_UNAVAILABLE),
        RegistryError::ProtocolViolation(_) => error_response(&e.to_string(), StatusCode::BAD_REQUEST),
        RegistryError::MonitorNotRunning => error_response("FAILED", StatusCode::SERVICE_UNAVAILABLE),
    }
}

/// Undecodable bodies get the same envelope as every other error.
fn rejection_response(rejection: JsonRejection) -> Response {
    debug!(error = %rejection, "request body rejected");
    error_response(&rejection.body_text(), rejection.status())
}

// ── Workers ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registered {
    pub worker_id: WorkerId,
    pub directory_service: Option<String>,
}

/// POST /api/v1/workers
pub async fn register_worker(
    State(state): State<ApiState>,
    payload: Result<Json<RegisterWorkerRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    let checked = match req.validate() {
        Ok(c) => c,
        Err(e) => return registry_error(e.into()),
    };

    let worker_id = state
        .registry
        .register_worker(&checked.url, checked.sessions)
        .await;
    let directory_service = state.registry.directory_service().await;

    ApiResponse::ok(Registered {
        worker_id,
        directory_service,
    })
    .into_response()
}

/// GET /api/v1/workers
pub async fn list_workers(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.registry.workers().await).into_response()
}

/// DELETE /api/v1/workers/{id}
pub async fn deregister_worker(State(state): State<ApiState>, Path(id): Path<u64>) -> Response {
    if state.registry.deregister_worker(WorkerId(id)).await {
        ApiResponse::ok("deregistered").into_response()
    } else {
        error_response("worker not found", StatusCode::NOT_FOUND)
    }
}

// ── Sessions ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Routed {
    pub service_url: String,
}

/// POST /api/v1/sessions
pub async fn route_session(
    State(state): State<ApiState>,
    payload: Result<Json<RouteSessionRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    let checked = match req.validate() {
        Ok(c) => c,
        Err(e) => return registry_error(e.into()),
    };

    match state
        .registry
        .route_session(&checked.session_id, &checked.user_name)
        .await
    {
        Ok(service_url) => ApiResponse::ok(Routed { service_url }).into_response(),
        Err(e) => registry_error(e),
    }
}

/// DELETE /api/v1/sessions/{id}
pub async fn shutdown_session(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    state.registry.shutdown_session(&id).await;
    ApiResponse::ok("OK").into_response()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub user_name: String,
}

/// GET /api/v1/sessions/{id}/owner
pub async fn check_project_open(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    let user_name = state.registry.check_project_open(&id).await;
    ApiResponse::ok(Owner { user_name }).into_response()
}

// ── Health and configuration ───────────────────────────────────

/// POST /api/v1/health/check
pub async fn force_health_check(State(state): State<ApiState>) -> Response {
    match state.registry.force_health_check().await {
        Ok(()) => ApiResponse::ok("OK").into_response(),
        Err(e) => registry_error(e),
    }
}

/// POST /api/v1/config/directory
pub async fn propagate_config(
    State(state): State<ApiState>,
    payload: Result<Json<PropagateConfigRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    let url = match req.validate() {
        Ok(url) => url,
        Err(e) => return registry_error(e.into()),
    };

    match state.registry.propagate_config(&url).await {
        Ok(report) => ApiResponse::ok(report).into_response(),
        Err(e) => registry_error(e),
    }
}

/// GET /api/v1/stats
pub async fn stats(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.registry.stats().await).into_response()
}
