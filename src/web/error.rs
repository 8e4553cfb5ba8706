//! Typed JSON error responses for the web API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorCode {
    InvalidQuery,
    InvalidUsername,
    NotFound,
    Internal,
}

/// An API-visible error: a machine-readable code plus a safe message.
///
/// Internal details are logged at the point of failure, never leaked to the
/// response body.
#[derive(Debug)]
pub struct ApiError {
    code: ApiErrorCode,
    message: String,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NotFound, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Internal, message)
    }

    fn status(&self) -> StatusCode {
        match self.code {
            ApiErrorCode::InvalidQuery | ApiErrorCode::InvalidUsername => StatusCode::BAD_REQUEST,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        });
        (self.status(), Json(body)).into_response()
    }
}

/// Log a database failure with context and return an opaque 500.
pub fn db_error(context: &str, e: anyhow::Error) -> ApiError {
    error!(error = ?e, "{context} failed");
    ApiError::internal_error(format!("{context} failed"))
}
