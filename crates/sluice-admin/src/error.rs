//! Error types for the admin API server.
//!
//! [`AdminError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sluice_core::RetentionError;
use sluice_db::DbError;

/// Errors that can occur in the admin API layer.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// A path parameter or request field was malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body was not valid JSON for the endpoint.
    #[error("invalid body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    /// A trim or purge could not reach the store.
    #[error(transparent)]
    Retention(#[from] RetentionError),

    /// A store query failed.
    #[error("store unavailable: {0}")]
    Store(#[from] DbError),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Retention(_) | Self::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status.is_server_error() {
            tracing::warn!(error = %self, "Admin request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
