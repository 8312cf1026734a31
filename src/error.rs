//! Error types for Snap Voca
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// Every handler returns `Result<_, AppError>`; the variant decides
/// the HTTP status code of the response.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found, or a private resource owned by someone else (404)
    #[error("Resource not found")]
    NotFound,

    /// Missing, malformed or expired bearer token (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Authenticated, but not the author/owner (403)
    #[error("Access denied")]
    Forbidden,

    /// Missing or invalid request fields (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Request body over the configured limit (413)
    #[error("Request body too large")]
    PayloadTooLarge,

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP client error talking to an upstream API (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Upstream API answered with an error (502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// An optional integration is not configured (503)
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token signing error (500)
    #[error("Signing error: {0}")]
    Signing(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge;
        }
        AppError::Validation(rejection.body_text())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Status code and metric label for this error
    pub fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            AppError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database"),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, "http_client"),
            AppError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream"),
            AppError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config"),
            AppError::Signing(_) => (StatusCode::INTERNAL_SERVER_ERROR, "signing"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Server-side failures are logged and answered with a generic
    /// message so internals never reach the client.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_type) = self.status_and_kind();

        let message = match &self {
            AppError::Validation(msg) | AppError::Unavailable(msg) => msg.clone(),
            AppError::Database(_)
            | AppError::Config(_)
            | AppError::Signing(_)
            | AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                "Internal server error".to_string()
            }
            AppError::HttpClient(_) | AppError::Upstream(_) => {
                tracing::warn!(error = %self, "Upstream request failed");
                "Upstream service error".to_string()
            }
            _ => self.to_string(),
        };

        crate::metrics::ERRORS_TOTAL
            .with_label_values(&[error_type])
            .inc();

        let body = Json(serde_json::json!({
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_client_errors_to_4xx() {
        assert_eq!(AppError::NotFound.status_and_kind().0, StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Unauthorized.status_and_kind().0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Forbidden.status_and_kind().0, StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Validation("name is required".into())
                .status_and_kind()
                .0,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn hides_internal_details() {
        let response =
            AppError::Internal(anyhow::anyhow!("disk on fire at /var/db")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
