//! Request-level error type and HTTP status mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// Missing field, out-of-range number, or wrong type in a telemetry payload.
    InvalidTelemetry(String),
    /// Polygon cannot be parsed or is degenerate.
    MalformedGeometry(String),
    /// Any other malformed request payload.
    Validation(String),
    /// Bad or expired token.
    Unauthenticated,
    /// Valid token, insufficient role.
    Forbidden,
    NotFound(String),
    Conflict(String),
    /// Transient store failure after retry.
    StoreUnavailable,
    /// Pipeline exceeded its wall-clock deadline.
    DeadlineExceeded,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidTelemetry(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::MalformedGeometry(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Authentication required".to_string())
            }
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Access denied".to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::StoreUnavailable => {
                tracing::error!("Store unavailable after retry");
                (StatusCode::SERVICE_UNAVAILABLE, "Store unavailable".to_string())
            }
            ApiError::DeadlineExceeded => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Ingest deadline exceeded".to_string(),
            ),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {}", err);
        ApiError::StoreUnavailable
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
