use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use stallbook_core::CoreError;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    TimeoutError(String),
    RemoteFailure(String),
    InternalServerError(String),
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => AppError::ValidationError(msg),
            CoreError::Conflict(msg) => AppError::ConflictError(msg),
            CoreError::NotFound(msg) => AppError::NotFoundError(msg),
            CoreError::Authorization(msg) => AppError::AuthorizationError(msg),
            CoreError::Timeout(msg) => AppError::TimeoutError(msg),
            CoreError::Remote(msg) => AppError::RemoteFailure(msg),
            CoreError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, "AUTHENTICATION_ERROR", msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, "AUTHORIZATION_ERROR", msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, "CONFLICT_ERROR", msg),
            AppError::TimeoutError(_) => (
                // Deliberately distinct from 5xx: the downstream may still
                // complete after our deadline, so the outcome is unknown.
                StatusCode::REQUEST_TIMEOUT,
                "TIMEOUT_ERROR",
                "no reply from downstream service; outcome unknown".to_string(),
            ),
            AppError::RemoteFailure(msg) => (StatusCode::SERVICE_UNAVAILABLE, "REMOTE_FAILURE", msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "kind": kind,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
