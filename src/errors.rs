use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// API error taxonomy. Every variant maps onto the response envelope
/// `{ success: false, error, message }` with the status the original
/// system used.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing required parameter: {0}")]
    MissingParam(&'static str),

    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("API key required")]
    MissingApiKey,

    /// Invalid, expired, inactive, disallowed: deliberately one variant so
    /// the response never reveals which check failed.
    #[error("invalid API key")]
    InvalidApiKey,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("not found")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::MissingParam(_) => (StatusCode::BAD_REQUEST, "missing_parameter"),
            ApiError::InvalidParam(_) => (StatusCode::BAD_REQUEST, "invalid_parameter"),
            ApiError::MissingApiKey => (StatusCode::UNAUTHORIZED, "api_key_required"),
            ApiError::InvalidApiKey => (StatusCode::FORBIDDEN, "invalid_api_key"),
            ApiError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded"),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_server_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            // Never leak the underlying store error to clients.
            ApiError::Internal(e) => {
                tracing::error!("internal error: {e}");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "error": code,
            "message": message,
        }));

        let mut response = (status, body).into_response();
        if matches!(self, ApiError::RateLimited) {
            // Daily window, so advise retry after the UTC midnight rollover.
            response
                .headers_mut()
                .insert("retry-after", axum::http::HeaderValue::from_static("86400"));
        }
        response
    }
}
