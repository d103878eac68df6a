//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use core_kernel::PortError;
use domain_ledger::LedgerError;
use domain_payables::SettlementError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg),
            ApiError::Internal(msg) => {
                error!(message = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

fn from_port(error: PortError) -> ApiError {
    match error {
        PortError::NotFound { .. } => ApiError::NotFound(error.to_string()),
        PortError::Validation { message, .. } => ApiError::Validation(message),
        PortError::Conflict { message } => ApiError::Conflict(message),
        other => ApiError::Internal(other.to_string()),
    }
}

impl From<SettlementError> for ApiError {
    fn from(error: SettlementError) -> Self {
        match error {
            SettlementError::Validation(msg) => ApiError::Validation(msg),
            SettlementError::StateConflict(msg) => ApiError::Conflict(msg),
            SettlementError::NotFound { .. } => ApiError::NotFound(error.to_string()),
            SettlementError::Port(port) => from_port(port),
            SettlementError::Ledger(ledger) => ledger.into(),
            SettlementError::Money(money) => ApiError::Validation(money.to_string()),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::Port(port) => from_port(port),
            LedgerError::AccountNotInitialized(_) => ApiError::Internal(error.to_string()),
            other => ApiError::Validation(other.to_string()),
        }
    }
}
