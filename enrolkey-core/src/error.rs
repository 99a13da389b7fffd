//! Error types for enrolment-key signup

use thiserror::Error;

use crate::types::{AccountId, OfferId};

/// Failures reported by host collaborators (stores, enrolment plugin)
#[derive(Debug, Error)]
pub enum Error {
    #[error("Username already exists")]
    UsernameTaken,

    #[error("Email already exists")]
    EmailTaken,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Offer {0} not found")]
    OfferNotFound(OfferId),

    #[error("Enrolment into offer {offer} failed: {reason}")]
    Enrolment { offer: OfferId, reason: String },

    #[error("Store error: {0}")]
    Store(String),
}

/// Failures of the signup flow as seen by the registrant
#[derive(Debug, Error)]
pub enum SignupError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Password too short (minimum 8 characters)")]
    PasswordTooShort,

    #[error("Password too long (maximum 80 characters)")]
    PasswordTooLong,

    #[error("Invalid enrolment key")]
    InvalidKey,

    #[error("Account provisioning failed: {0}")]
    Provisioning(#[source] Error),

    /// The account exists but the confirmation email never left
    #[error("Confirmation email for account {account_id} could not be sent: {reason}")]
    Notification { account_id: AccountId, reason: String },

    #[error(transparent)]
    Store(#[from] Error),
}
