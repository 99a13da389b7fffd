//! Login, logout and session introspection

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use enrolkey_core::{AccountStore, AuthProvider};
use serde::{Deserialize, Serialize};
use tower_cookies::{Cookie, Cookies};

use crate::email::EmailSender;
use crate::error::ServerError;
use crate::state::AppState;
use crate::store::{Session, SessionId, SessionStore, Store};

pub const SESSION_COOKIE: &str = "enrolkey_session";

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub userid: u64,
}

/// POST /login
pub async fn login<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    cookies: Cookies,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServerError>
where
    S: Store,
    E: EmailSender,
{
    let account = state
        .store
        .get_account_by_username(&req.username)?
        .ok_or(ServerError::InvalidCredentials)?;

    if !state.auth.user_login(&req.username, &req.password)? {
        // Right password on an account still waiting for its confirmation link
        if account.auth_type == state.auth.auth_type()
            && !account.confirmed
            && state.store.check_password(account.id, &req.password)?
        {
            return Err(ServerError::AccountNotConfirmed);
        }
        return Err(ServerError::InvalidCredentials);
    }

    let session = state.store.create_session(account.id)?;
    set_session_cookie(&cookies, &session.id.0);
    tracing::info!(account = %account.id, "Logged in");

    Ok(Json(LoginResponse {
        success: true,
        userid: account.id.0,
    }))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// POST /logout
pub async fn logout<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    cookies: Cookies,
) -> Json<LogoutResponse>
where
    S: Store,
    E: EmailSender,
{
    if let Some(session) = get_session_from_cookies(&cookies, state.store.as_ref()) {
        let _ = state.store.delete_session(&session.id);
    }

    clear_session_cookie(&cookies);

    Json(LogoutResponse { success: true })
}

#[derive(Serialize)]
pub struct SessionContext {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub userid: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
    pub server_time: i64,
}

/// GET /session
pub async fn get_session<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    cookies: Cookies,
) -> Result<Json<SessionContext>, ServerError>
where
    S: Store,
    E: EmailSender,
{
    let server_time = chrono::Utc::now().timestamp();

    let Some(session) = get_session_from_cookies(&cookies, state.store.as_ref()) else {
        return Ok(Json(SessionContext {
            authenticated: false,
            userid: None,
            username: None,
            csrf_token: None,
            server_time,
        }));
    };

    let username = state
        .store
        .get_account(session.account)?
        .map(|account| account.username);

    Ok(Json(SessionContext {
        authenticated: true,
        userid: Some(session.account.0),
        username,
        csrf_token: Some(session.csrf_token),
        server_time,
    }))
}

/// Helper to get current session from cookies
pub fn get_session_from_cookies<S: SessionStore + ?Sized>(
    cookies: &Cookies,
    store: &S,
) -> Option<Session> {
    cookies.get(SESSION_COOKIE).and_then(|c| {
        let session_id = SessionId(c.value().to_string());
        store.get_session(&session_id).ok().flatten()
    })
}

/// Helper to set session cookie
pub fn set_session_cookie(cookies: &Cookies, session_id: &str) {
    let cookie = Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .build();
    cookies.add(cookie);
}

/// Helper to clear session cookie
pub fn clear_session_cookie(cookies: &Cookies) {
    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .max_age(tower_cookies::cookie::time::Duration::ZERO)
        .build();
    cookies.add(cookie);
}
