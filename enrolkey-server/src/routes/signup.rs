//! Self-registration and the results view

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::{Form, Json};
use enrolkey_core::{AppliedOffers, AuthProvider, RegistrationRequest, RequestContext};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use super::session::set_session_cookie;
use crate::email::EmailSender;
use crate::error::ServerError;
use crate::state::AppState;
use crate::store::{CatalogStore, SessionStore, Store};

#[derive(Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(default)]
    pub signup_token: String,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
}

impl SignupForm {
    fn into_request(self) -> RegistrationRequest {
        let mut profile = BTreeMap::new();
        for (name, value) in [("firstname", self.firstname), ("lastname", self.lastname)] {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                profile.insert(name.to_string(), value);
            }
        }

        RegistrationRequest {
            username: self.username.trim().to_string(),
            password: self.password,
            email: self.email.trim().to_string(),
            signup_token: self.signup_token,
            profile,
        }
    }
}

/// POST /signup
///
/// Creates the account, applies every offer the token unlocks and redirects
/// to the results view with the applied offer ids.
pub async fn signup<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    cookies: Cookies,
    Form(form): Form<SignupForm>,
) -> Result<Redirect, ServerError>
where
    S: Store,
    E: EmailSender,
{
    let mut ctx = RequestContext::new();
    let outcome = state.auth.user_signup(&mut ctx, form.into_request())?;

    if let Some(account) = ctx.identity() {
        let session = state.store.create_session(account)?;
        set_session_cookie(&cookies, &session.id.0);
    }

    tracing::info!(
        account = %outcome.account,
        applied = %outcome.applied,
        confirmation_pending = outcome.confirmation_pending,
        "Signup complete"
    );

    Ok(Redirect::to(&format!("/enrolled?ids={}", outcome.applied)))
}

#[derive(Deserialize)]
pub struct EnrolledQuery {
    #[serde(default)]
    pub ids: String,
}

#[derive(Serialize)]
pub struct EnrolledOffer {
    pub offer_id: u64,
    pub course_id: u64,
    pub course_name: String,
}

#[derive(Serialize)]
pub struct EnrolledResponse {
    pub success: bool,
    pub offers: Vec<EnrolledOffer>,
}

/// GET /enrolled
pub async fn enrolled<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    Query(query): Query<EnrolledQuery>,
) -> Result<Json<EnrolledResponse>, ServerError>
where
    S: Store,
    E: EmailSender,
{
    let mut offers = Vec::new();

    for id in AppliedOffers::parse(&query.ids).ids() {
        let Some(record) = state.store.get_offer(*id)? else {
            continue;
        };
        let course_id = record.settings.course_id;
        let course_name = state
            .store
            .get_course(course_id)?
            .map(|course| course.name)
            .unwrap_or_default();

        offers.push(EnrolledOffer {
            offer_id: id.0,
            course_id: course_id.0,
            course_name,
        });
    }

    Ok(Json(EnrolledResponse {
        success: true,
        offers,
    }))
}
