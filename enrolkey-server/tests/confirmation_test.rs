//! Email confirmation through the `/confirm` link

mod common;

use std::sync::Arc;

use axum_test::TestServer;
use common::{create_confirming_server, signup, test_config, PUBLIC_URL};
use enrolkey_core::AccountStore;
use enrolkey_server::{routes, AppState, CatalogStore, EmailSender, InMemoryStore, OfferSettings};
use serde_json::{json, Value};

#[tokio::test]
async fn test_signup_mails_confirmation_link() {
    let (server, email_sender, state) = create_confirming_server();

    signup(&server, "ada", "nothing").await;

    let account = state.store.get_account_by_username("ada").unwrap().unwrap();
    assert!(!account.confirmed);

    let link = email_sender.get_link("ada@example.com").expect("No link sent");
    assert_eq!(
        link,
        format!("{}/confirm?data={}/ada", PUBLIC_URL, account.secret)
    );
}

#[tokio::test]
async fn test_confirm_then_login() {
    let (server, email_sender, state) = create_confirming_server();
    signup(&server, "ada", "nothing").await;

    // Unconfirmed accounts cannot log in
    let response = server
        .post("/login")
        .json(&json!({ "username": "ada", "password": "password1" }))
        .await;
    assert_eq!(response.status_code(), 403);

    let path = email_sender.get_confirm_path("ada@example.com").unwrap();
    let response = server.get(&path).await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "confirmed");
    assert!(response.maybe_cookie("enrolkey_session").is_some());

    let account = state.store.get_account_by_username("ada").unwrap().unwrap();
    assert!(account.confirmed);

    let response = server
        .post("/login")
        .json(&json!({ "username": "ada", "password": "password1" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["userid"], account.id.0);
}

#[tokio::test]
async fn test_mailed_link_confirms_username_with_reserved_characters() {
    let (server, email_sender, state) = create_confirming_server();
    signup(&server, "ann+lee&co", "nothing").await;

    let link = email_sender.get_link("ann+lee&co@example.com").expect("No link sent");
    assert!(link.ends_with("/ann%2Blee%26co"));

    let path = email_sender.get_confirm_path("ann+lee&co@example.com").unwrap();
    let response = server.get(&path).await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "confirmed");

    let account = state.store.get_account_by_username("ann+lee&co").unwrap().unwrap();
    assert!(account.confirmed);

    let response = server
        .post("/login")
        .json(&json!({ "username": "ann+lee&co", "password": "password1" }))
        .await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_confirm_twice_reports_already_confirmed() {
    let (server, email_sender, _state) = create_confirming_server();
    signup(&server, "ada", "nothing").await;
    let path = email_sender.get_confirm_path("ada@example.com").unwrap();

    server.get(&path).await;
    let response = server.get(&path).await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "already_confirmed");
    assert!(response.maybe_cookie("enrolkey_session").is_none());
}

#[tokio::test]
async fn test_confirm_with_split_parameters() {
    let (server, _email_sender, state) = create_confirming_server();
    signup(&server, "ada", "nothing").await;
    let account = state.store.get_account_by_username("ada").unwrap().unwrap();

    let response = server
        .get("/confirm")
        .add_query_param("p", &account.secret)
        .add_query_param("s", "ada")
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "confirmed");
}

#[tokio::test]
async fn test_wrong_secret_rejected() {
    let (server, _email_sender, state) = create_confirming_server();
    signup(&server, "ada", "nothing").await;

    let response = server
        .get("/confirm")
        .add_query_param("data", "not-the-secret/ada")
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["reason"], "Account could not be confirmed");

    let account = state.store.get_account_by_username("ada").unwrap().unwrap();
    assert!(!account.confirmed);
}

#[tokio::test]
async fn test_unknown_user_rejected() {
    let (server, _email_sender, _state) = create_confirming_server();

    let response = server
        .get("/confirm")
        .add_query_param("data", "abc/nobody")
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_missing_confirmation_data() {
    let (server, _email_sender, _state) = create_confirming_server();

    let response = server.get("/confirm").await;
    assert_eq!(response.status_code(), 400);

    let response = server.get("/confirm").add_query_param("data", "noslash").await;
    assert_eq!(response.status_code(), 400);
}

// =============================================================================
// Notification failure
// =============================================================================

struct FailingEmailSender;

impl EmailSender for FailingEmailSender {
    fn send_confirmation(&self, _email: &str, _username: &str, _link: &str) -> Result<(), String> {
        Err("relay unavailable".to_string())
    }
}

#[tokio::test]
async fn test_failed_email_keeps_account_and_enrolments() {
    let state = Arc::new(AppState::new(
        InMemoryStore::new(),
        FailingEmailSender,
        &test_config(true),
    ));
    let course = state.store.add_course("Algebra").unwrap();
    state
        .store
        .add_offer(OfferSettings::course(course, "alg"))
        .unwrap();
    let server = TestServer::new(routes::create_router(state.clone())).unwrap();

    let response = server
        .post("/signup")
        .form(&common::signup_form("ada", "alg"))
        .await;

    assert_eq!(response.status_code(), 500);
    let body: Value = response.json();
    assert_eq!(body["reason"], "Confirmation email could not be sent");

    let account = state.store.get_account_by_username("ada").unwrap().unwrap();
    assert!(!account.confirmed);
    assert_eq!(state.store.list_enrolments(account.id).unwrap().len(), 1);
}
