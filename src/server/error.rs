//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`mediabeam_core::Error`] so that route
//! handlers can return `Result<T, AppError>` directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
pub struct AppError(mediabeam_core::Error);

impl From<mediabeam_core::Error> for AppError {
    fn from(e: mediabeam_core::Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.0,
                "Server error in API handler"
            );
        }

        let code = match &self.0 {
            mediabeam_core::Error::NotFound { .. } => "not_found",
            mediabeam_core::Error::Validation(_) => "validation_error",
            mediabeam_core::Error::UnsatisfiableRange(_) => "unsatisfiable_range",
            mediabeam_core::Error::Probe(_) => "probe_error",
            mediabeam_core::Error::Tool { .. } => "tool_error",
            mediabeam_core::Error::Database { .. } => "database_error",
            mediabeam_core::Error::Io { .. } => "io_error",
            mediabeam_core::Error::Internal(_) => "internal_error",
        };

        let body = json!({
            "error": self.0.to_string(),
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_produces_404() {
        let err = AppError::from(mediabeam_core::Error::not_found("file", "a.mp4"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unsatisfiable_range_produces_416() {
        let err = AppError::from(mediabeam_core::Error::UnsatisfiableRange("bad".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    }

    #[test]
    fn probe_failure_produces_500() {
        let err = AppError::from(mediabeam_core::Error::Probe("ffprobe died".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
