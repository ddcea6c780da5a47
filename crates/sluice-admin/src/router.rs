//! Axum router construction for the admin API.
//!
//! Assembles all routes into a single [`Router`] with CORS and request
//! tracing middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the admin server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /api/status` -- limits and retention counters
/// - `POST /api/retention/purge` -- run the age purge now
/// - `POST /api/retention/trim` -- trim one pair
/// - `GET /api/identities/{identity}/categories/{category}` -- pair count
/// - `POST /api/admission/check` -- dry-run admission
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status
        .route("/", get(handlers::index))
        .route("/api/status", get(handlers::status))
        // Retention
        .route("/api/retention/purge", post(handlers::purge))
        .route("/api/retention/trim", post(handlers::trim))
        .route(
            "/api/identities/{identity}/categories/{category}",
            get(handlers::pair_count),
        )
        // Admission
        .route("/api/admission/check", post(handlers::check_admission))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
