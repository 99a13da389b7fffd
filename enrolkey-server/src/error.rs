//! Server error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use enrolkey_core::SignupError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Username already exists")]
    UsernameTaken,

    #[error("Email already exists")]
    EmailTaken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Account not confirmed")]
    AccountNotConfirmed,

    #[error("Password too short (minimum 8 characters)")]
    PasswordTooShort,

    #[error("Password too long (maximum 80 characters)")]
    PasswordTooLong,

    #[error("Enrolment key does not match any course")]
    InvalidKey,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Account could not be confirmed")]
    ConfirmationFailed,

    #[error("Confirmation email could not be sent for account {account_id}: {reason}")]
    Notification { account_id: u64, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<enrolkey_core::Error> for ServerError {
    fn from(e: enrolkey_core::Error) -> Self {
        match e {
            enrolkey_core::Error::UsernameTaken => ServerError::UsernameTaken,
            enrolkey_core::Error::EmailTaken => ServerError::EmailTaken,
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<SignupError> for ServerError {
    fn from(e: SignupError) -> Self {
        match e {
            SignupError::Validation(msg) => ServerError::ValidationError(msg),
            SignupError::PasswordTooShort => ServerError::PasswordTooShort,
            SignupError::PasswordTooLong => ServerError::PasswordTooLong,
            SignupError::InvalidKey => ServerError::InvalidKey,
            SignupError::Provisioning(inner) | SignupError::Store(inner) => inner.into(),
            SignupError::Notification { account_id, reason } => ServerError::Notification {
                account_id: account_id.0,
                reason,
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::UsernameTaken => (StatusCode::CONFLICT, "Username already exists"),
            ServerError::EmailTaken => (StatusCode::CONFLICT, "Email already exists"),
            ServerError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials"),
            ServerError::NotAuthenticated => (StatusCode::UNAUTHORIZED, "Not authenticated"),
            ServerError::AccountNotConfirmed => (StatusCode::FORBIDDEN, "Account not confirmed"),
            ServerError::PasswordTooShort => {
                (StatusCode::BAD_REQUEST, "Password too short (minimum 8 characters)")
            }
            ServerError::PasswordTooLong => {
                (StatusCode::BAD_REQUEST, "Password too long (maximum 80 characters)")
            }
            ServerError::InvalidKey => {
                (StatusCode::BAD_REQUEST, "Enrolment key does not match any course")
            }
            ServerError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            ServerError::ConfirmationFailed => {
                (StatusCode::BAD_REQUEST, "Account could not be confirmed")
            }
            ServerError::Notification { account_id, reason } => {
                tracing::error!(account = account_id, "Confirmation email failed: {}", reason);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Confirmation email could not be sent",
                )
            }
            ServerError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "success": false, "reason": message });
        (status, axum::Json(body)).into_response()
    }
}
