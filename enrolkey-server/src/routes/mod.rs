//! HTTP routes for the signup service

mod confirm;
mod session;
mod signup;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::email::EmailSender;
use crate::state::AppState;
use crate::store::Store;

pub use session::SESSION_COOKIE;

/// Create the router with all routes
pub fn create_router<S, E>(state: Arc<AppState<S, E>>) -> Router
where
    S: Store,
    E: EmailSender + 'static,
{
    Router::new()
        .route("/signup", post(signup::signup))
        .route("/enrolled", get(signup::enrolled))
        .route("/confirm", get(confirm::confirm))
        .route("/login", post(session::login))
        .route("/logout", post(session::logout))
        .route("/session", get(session::get_session))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
