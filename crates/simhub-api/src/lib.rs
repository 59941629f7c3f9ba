//! simhub-api — REST API for the simhub session broker.
//!
//! Thin axum layer over `SessionRegistry`. Every response uses the
//! `{ success, data?, error? }` envelope.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/api/v1/workers` | Register a session service |
//! | GET | `/api/v1/workers` | List session services |
//! | DELETE | `/api/v1/workers/{id}` | Deregister a session service |
//! | POST | `/api/v1/sessions` | Route (create-or-attach) a session |
//! | DELETE | `/api/v1/sessions/{id}` | Shut a session down |
//! | GET | `/api/v1/sessions/{id}/owner` | Owner of an open session |
//! | POST | `/api/v1/health/check` | Force a health pass |
//! | POST | `/api/v1/config/directory` | Broadcast a directory-service address |
//! | GET | `/api/v1/stats` | Registry counters |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use simhub_registry::SessionRegistry;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<SessionRegistry>,
}

/// Build the complete API router.
pub fn build_router(registry: Arc<SessionRegistry>) -> Router {
    let api_state = ApiState { registry };

    let api_routes = Router::new()
        .route("/workers", get(handlers::list_workers).post(handlers::register_worker))
        .route("/workers/{id}", delete(handlers::deregister_worker))
        .route("/sessions", post(handlers::route_session))
        .route("/sessions/{id}", delete(handlers::shutdown_session))
        .route("/sessions/{id}/owner", get(handlers::check_project_open))
        .route("/health/check", post(handlers::force_health_check))
        .route("/config/directory", post(handlers::propagate_config))
        .route("/stats", get(handlers::stats))
        .with_state(api_state);

    Router::new().nest("/api/v1", api_routes)
}
