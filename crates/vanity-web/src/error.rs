//! Error types for the site surfaces.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Site errors.
#[derive(Debug, Error)]
pub enum WebError {
    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A redirect table entry is unusable.
    #[error("invalid redirect: {0}")]
    InvalidRedirect(String),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::InvalidRedirect(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Site request failed");
        }

        (status, self.to_string()).into_response()
    }
}
