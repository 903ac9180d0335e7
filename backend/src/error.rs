//! Error types for the development report service.
//!
//! Handlers return [`ServerError`]; it renders as `(status, {"message": ..})`,
//! the same body shape the production service uses for failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

use crate::api::types::error_response;

// =============================================================================
// Server Errors
// =============================================================================

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Malformed or incomplete request.
    #[error("{0}")]
    BadRequest(String),

    /// Unknown artifact id or route.
    #[error("{0}")]
    NotFound(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.status(), Json(error_response(&self.to_string()))).into_response()
    }
}

impl From<axum::extract::multipart::MultipartError> for ServerError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        ServerError::BadRequest(format!("Multipart error: {}", err))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for HTTP handlers.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ServerError::BadRequest("No file part".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ServerError::NotFound("Report not found".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServerError::Internal("lock".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_message_is_bare_for_client_errors() {
        assert_eq!(ServerError::BadRequest("No file part".into()).to_string(), "No file part");
    }
}
