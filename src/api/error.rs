use axum::{Json, extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use super::models::ErrorResponse;
use crate::engine::EngineError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("payload invalid: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(err) => match err {
                EngineError::InvalidAmount(_) | EngineError::TooManyCandidates { .. } => {
                    StatusCode::BAD_REQUEST
                }
                EngineError::InsufficientBalance { .. } => StatusCode::PAYMENT_REQUIRED,
                EngineError::EmployerMismatch { .. } => StatusCode::FORBIDDEN,
                EngineError::JobNotFound(_) => StatusCode::NOT_FOUND,
                EngineError::NoEmployerProfile
                | EngineError::EmployerAlreadyRegistered(_)
                | EngineError::InvalidTransition { .. } => StatusCode::CONFLICT,
                EngineError::PersistenceFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
                EngineError::CorruptRecord { .. } | EngineError::Serialization(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ApiError::Engine(err) => match err {
                EngineError::InvalidAmount(_) => "INVALID_AMOUNT",
                EngineError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
                EngineError::NoEmployerProfile => "NO_EMPLOYER_PROFILE",
                EngineError::EmployerMismatch { .. } => "EMPLOYER_MISMATCH",
                EngineError::EmployerAlreadyRegistered(_) => "EMPLOYER_ALREADY_REGISTERED",
                EngineError::TooManyCandidates { .. } => "TOO_MANY_CANDIDATES",
                EngineError::JobNotFound(_) => "JOB_NOT_FOUND",
                EngineError::InvalidTransition { .. } => "INVALID_TRANSITION",
                EngineError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
                EngineError::CorruptRecord { .. } => "CORRUPT_RECORD",
                EngineError::Serialization(_) => "INTERNAL_ERROR",
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "Request failed");
        }

        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::InvalidPayload(value.body_text())
    }
}
