//! Common test utilities for signup service integration tests

#![allow(dead_code)]

use std::sync::{Arc, RwLock};

use axum_test::TestServer;
use enrolkey_server::{routes, AppState, Config, EmailSender, InMemoryStore, Store};
use serde_json::Value;

pub const PUBLIC_URL: &str = "http://localhost:3000";

/// Mock email sender that captures confirmation links
#[derive(Default, Clone)]
pub struct MockEmailSender {
    /// Captured (email, username, link) triples
    pub sent: Arc<RwLock<Vec<(String, String, String)>>>,
}

impl MockEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the last confirmation link sent to an email
    pub fn get_link(&self, email: &str) -> Option<String> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|(e, _, _)| e == email)
            .map(|(_, _, link)| link.clone())
    }

    /// Path and query of the last confirmation link sent to an email,
    /// exactly as mailed
    pub fn get_confirm_path(&self, email: &str) -> Option<String> {
        self.get_link(email)?
            .strip_prefix(PUBLIC_URL)
            .map(|path| path.to_string())
    }

    pub fn count(&self) -> usize {
        self.sent.read().unwrap().len()
    }
}

impl EmailSender for MockEmailSender {
    fn send_confirmation(&self, email: &str, username: &str, link: &str) -> Result<(), String> {
        self.sent
            .write()
            .unwrap()
            .push((email.to_string(), username.to_string(), link.to_string()));
        Ok(())
    }
}

pub type TestState<S> = Arc<AppState<S, MockEmailSender>>;

pub fn test_config(require_confirmation: bool) -> Config {
    Config {
        require_confirmation,
        public_url: PUBLIC_URL.to_string(),
        ..Config::default()
    }
}

/// Create a test server over any store
pub fn create_server_with<S: Store>(
    store: S,
    config: &Config,
) -> (TestServer, MockEmailSender, TestState<S>) {
    let email_sender = MockEmailSender::new();
    let state = Arc::new(AppState::new(store, email_sender.clone(), config));

    let app = routes::create_router(state.clone());
    let server = TestServer::new(app).expect("Failed to create test server");

    (server, email_sender, state)
}

/// Create an in-memory test server without email confirmation
pub fn create_test_server() -> (TestServer, MockEmailSender, TestState<InMemoryStore>) {
    create_server_with(InMemoryStore::new(), &test_config(false))
}

/// Create an in-memory test server that requires email confirmation
pub fn create_confirming_server() -> (TestServer, MockEmailSender, TestState<InMemoryStore>) {
    create_server_with(InMemoryStore::new(), &test_config(true))
}

/// Signup form fields for a user
pub fn signup_form(username: &str, token: &str) -> Vec<(&'static str, String)> {
    vec![
        ("username", username.to_string()),
        ("password", "password1".to_string()),
        ("email", format!("{}@example.com", username)),
        ("signup_token", token.to_string()),
        ("firstname", "Test".to_string()),
        ("lastname", "User".to_string()),
    ]
}

/// Submit the signup form and return the redirect location
pub async fn signup(server: &TestServer, username: &str, token: &str) -> String {
    let response = server
        .post("/signup")
        .form(&signup_form(username, token))
        .await;
    assert_eq!(response.status_code(), 303);

    response
        .header("location")
        .to_str()
        .expect("Location is not ASCII")
        .to_string()
}

/// Fetch the results view for a redirect location
pub async fn enrolled(server: &TestServer, location: &str) -> Value {
    let ids = location
        .strip_prefix("/enrolled?ids=")
        .expect("Unexpected redirect target");
    let response = server.get("/enrolled").add_query_param("ids", ids).await;
    assert_eq!(response.status_code(), 200);
    response.json()
}

/// Applied offer ids of a redirect location
pub fn redirect_ids(location: &str) -> Vec<u64> {
    location
        .strip_prefix("/enrolled?ids=")
        .expect("Unexpected redirect target")
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().expect("Bad offer id"))
        .collect()
}
