//! API error types and conversions

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use portico_core::GatewayError;

/// API error type that converts to HTTP responses
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request
    BadRequest(String),
    /// 404 Not Found
    NotFound(String),
    /// 502 Bad Gateway (downstream or registry failure)
    BadGateway(String),
    /// 503 Service Unavailable (no healthy instance)
    ServiceUnavailable(String),
    /// 504 Gateway Timeout
    GatewayTimeout(String),
    /// 500 Internal Server Error
    Internal(String),
}

/// Standard error response format
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "bad_gateway", msg),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
            ApiError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, "gateway_timeout", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        // Log errors at appropriate levels
        if status.is_server_error() {
            tracing::error!(error = error_type, %message, "API error");
        } else if status.is_client_error() {
            tracing::debug!(error = error_type, %message, "API client error");
        }

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NoRouteMatch(msg) => {
                ApiError::NotFound(format!("No route matches path: {}", msg))
            }
            GatewayError::NoHealthyInstance(msg) => {
                ApiError::ServiceUnavailable(format!("No healthy instance for service: {}", msg))
            }
            GatewayError::Downstream(msg) => ApiError::BadGateway(msg),
            GatewayError::Lookup(msg) => ApiError::BadGateway(msg),
            GatewayError::Timeout => ApiError::GatewayTimeout("Operation timed out".to_string()),
            GatewayError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            GatewayError::Registration(msg) => ApiError::Internal(msg),
            GatewayError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}
