//! Error types for the authentication service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pomo_common::{CacheError, DatabaseError, TokenError, web::error_response};
use thiserror::Error;
use tracing::error;

use crate::notifier::NotifierError;

/// Identity service failures
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Email already in use")]
    DuplicateEmail,

    /// Unknown email and wrong password are deliberately the same variant
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Missing refresh token")]
    MissingToken,

    #[error("Invalid refresh token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token signing failed: {0}")]
    Signing(TokenError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AuthError::DuplicateEmail => (StatusCode::CONFLICT, "CONFLICT"),
            AuthError::InvalidCredentials | AuthError::MissingToken | AuthError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED")
            }
            AuthError::UserNotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AuthError::Hashing(_)
            | AuthError::Signing(_)
            | AuthError::Database(_)
            | AuthError::Cache(_) => {
                error!("Authentication service failure: {}", self);
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error",
                );
            }
        };

        error_response(status, code, self.to_string())
    }
}

/// OTP workflow failures
#[derive(Debug, Error)]
pub enum OtpError {
    #[error("{0}")]
    Validation(String),

    #[error("Too many verification attempts, try again later")]
    TooManyAttempts,

    #[error(transparent)]
    Notifier(#[from] NotifierError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub type OtpResult<T> = Result<T, OtpError>;

impl IntoResponse for OtpError {
    fn into_response(self) -> Response {
        match &self {
            OtpError::Validation(message) => {
                error_response(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message.clone())
            }
            OtpError::TooManyAttempts => error_response(
                StatusCode::TOO_MANY_REQUESTS,
                "TOO_MANY_ATTEMPTS",
                self.to_string(),
            ),
            OtpError::Notifier(_) | OtpError::Cache(_) => {
                error!("OTP service failure: {}", self);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error",
                )
            }
        }
    }
}
