//! Custom error types for the API service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pomo_common::{error::DatabaseError, web::error_response};
use thiserror::Error;
use tracing::error;

/// Pomodoro engine failures
#[derive(Error, Debug)]
pub enum PomodoroError {
    /// Absent, or owned by someone else
    #[error("Pomodoro not found")]
    NotFound,

    #[error("Pomodoro is already in progress")]
    AlreadyActive,

    /// Another session of the same user is running
    #[error("You already have an active pomodoro. Please finish or cancel it first.")]
    ConflictActiveSession,

    #[error("Pomodoro is already completed")]
    AlreadyCompleted,

    /// Transition not allowed from the current status
    #[error("{0}")]
    InvalidState(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Type alias for engine results
pub type PomodoroResult<T> = Result<T, PomodoroError>;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed request (body, query or path)
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Pomodoro(#[from] PomodoroError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::BadRequest(message) => {
                return error_response(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message);
            }
            ApiError::Pomodoro(err) => err,
        };

        let (status, code) = match &err {
            PomodoroError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            PomodoroError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            PomodoroError::AlreadyActive | PomodoroError::ConflictActiveSession => {
                (StatusCode::CONFLICT, "CONFLICT")
            }
            PomodoroError::AlreadyCompleted | PomodoroError::InvalidState(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_STATE")
            }
            PomodoroError::Database(e) => {
                error!("Database error: {}", e);
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error",
                );
            }
        };

        error_response(status, code, err.to_string())
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
