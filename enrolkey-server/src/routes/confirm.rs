//! Account confirmation link

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use enrolkey_core::{AccountStore, AuthProvider, ConfirmOutcome};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use super::session::set_session_cookie;
use crate::email::EmailSender;
use crate::error::ServerError;
use crate::state::AppState;
use crate::store::{SessionStore, Store};

/// Either `data=<secret>/<username>` or `p=<secret>&s=<username>`
#[derive(Deserialize)]
pub struct ConfirmQuery {
    pub data: Option<String>,
    pub p: Option<String>,
    pub s: Option<String>,
}

impl ConfirmQuery {
    /// `(username, secret)`; the secret is everything before the first `/`
    fn credentials(self) -> Option<(String, String)> {
        if let Some(data) = self.data {
            let (secret, username) = data.split_once('/')?;
            return Some((username.to_string(), secret.to_string()));
        }
        Some((self.s?, self.p?))
    }
}

#[derive(Serialize)]
pub struct ConfirmResponse {
    pub success: bool,
    pub status: ConfirmOutcome,
}

/// GET /confirm
pub async fn confirm<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    cookies: Cookies,
    Query(query): Query<ConfirmQuery>,
) -> Result<Json<ConfirmResponse>, ServerError>
where
    S: Store,
    E: EmailSender,
{
    let (username, secret) = query
        .credentials()
        .ok_or_else(|| ServerError::ValidationError("Missing confirmation data".to_string()))?;

    let outcome = state.auth.user_confirm(&username, &secret)?;
    tracing::info!(username = %username, status = outcome.as_str(), "Confirmation attempt");

    match outcome {
        ConfirmOutcome::Error => Err(ServerError::ConfirmationFailed),
        ConfirmOutcome::Confirmed => {
            if let Some(account) = state.store.get_account_by_username(&username)? {
                let session = state.store.create_session(account.id)?;
                set_session_cookie(&cookies, &session.id.0);
            }
            Ok(Json(ConfirmResponse {
                success: true,
                status: outcome,
            }))
        }
        ConfirmOutcome::AlreadyConfirmed => Ok(Json(ConfirmResponse {
            success: true,
            status: outcome,
        })),
    }
}
