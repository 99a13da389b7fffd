//! Account confirmation
//!
//! `Unconfirmed -> Confirmed`, with `AlreadyConfirmed` for repeated
//! confirmation and `Error` for everything that does not check out.

use serde::Serialize;

use crate::repository::AccountStore;
use crate::Result;

/// Outcome of a confirmation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmOutcome {
    /// The account was unconfirmed and is now confirmed
    Confirmed,
    /// The account was already confirmed; nothing changed
    AlreadyConfirmed,
    /// Unknown username, foreign auth type or wrong secret
    Error,
}

impl ConfirmOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmOutcome::Confirmed => "confirmed",
            ConfirmOutcome::AlreadyConfirmed => "already_confirmed",
            ConfirmOutcome::Error => "error",
        }
    }
}

/// Run the confirmation transition for `username`.
///
/// Only accounts whose auth type equals `auth_type` can be confirmed here.
/// Store failures propagate; every other rejection is `ConfirmOutcome::Error`.
pub fn confirm_account<S>(
    store: &S,
    auth_type: &str,
    username: &str,
    secret: &str,
) -> Result<ConfirmOutcome>
where
    S: AccountStore + ?Sized,
{
    let Some(account) = store.get_account_by_username(username)? else {
        tracing::debug!(username, "Confirmation for unknown username");
        return Ok(ConfirmOutcome::Error);
    };

    if account.auth_type != auth_type {
        tracing::warn!(
            username,
            auth_type = %account.auth_type,
            "Confirmation for account of another auth type"
        );
        return Ok(ConfirmOutcome::Error);
    }

    if account.secret != secret {
        tracing::warn!(username, "Confirmation secret mismatch");
        return Ok(ConfirmOutcome::Error);
    }

    if account.confirmed {
        return Ok(ConfirmOutcome::AlreadyConfirmed);
    }

    store.set_confirmed(account.id, true)?;
    tracing::info!(username, account = %account.id, "Account confirmed");

    Ok(ConfirmOutcome::Confirmed)
}
