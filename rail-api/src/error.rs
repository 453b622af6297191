use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rail_core::{ErrorKind, LedgerError};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    Ledger(LedgerError),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, "PERMISSION_DENIED", msg),
            AppError::Ledger(err) => {
                let kind = err.kind();
                match kind {
                    ErrorKind::InvalidArgument => (StatusCode::BAD_REQUEST, kind.as_str(), err.to_string()),
                    ErrorKind::NotFound => (StatusCode::NOT_FOUND, kind.as_str(), err.to_string()),
                    ErrorKind::ResourceExhausted | ErrorKind::AlreadyExists => {
                        (StatusCode::CONFLICT, kind.as_str(), err.to_string())
                    }
                    ErrorKind::InternalInvariantViolation => {
                        // Already raised on the rail::invariant target by the service
                        (StatusCode::INTERNAL_SERVER_ERROR, kind.as_str(), "Internal consistency check failed".to_string())
                    }
                    ErrorKind::Storage => {
                        (StatusCode::SERVICE_UNAVAILABLE, kind.as_str(), "Storage unavailable".to_string())
                    }
                }
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err)
    }
}

// Malformed requests are caller errors like any other invalid argument

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Ledger(LedgerError::InvalidArgument(rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Ledger(LedgerError::InvalidArgument(rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Ledger(LedgerError::InvalidArgument(rejection.body_text()))
    }
}
