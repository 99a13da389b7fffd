//! Application state shared by the HTTP handlers

use std::sync::Arc;

use enrolkey_core::EnrolKeyAuth;

use crate::config::Config;
use crate::email::{EmailSender, MailNotifier};
use crate::events::TracingEvents;
use crate::store::Store;

/// The signup provider as wired up by the server
pub type ServerAuth<S, E> = EnrolKeyAuth<S, MailNotifier<E>, TracingEvents>;

/// Application state
pub struct AppState<S, E> {
    pub store: Arc<S>,
    pub auth: ServerAuth<S, E>,
}

impl<S: Store, E: EmailSender> AppState<S, E> {
    pub fn new(store: S, email_sender: E, config: &Config) -> Self {
        let store = Arc::new(store);
        let notifier = MailNotifier::new(email_sender, config.public_url.clone());
        let auth = EnrolKeyAuth::new(store.clone(), notifier, TracingEvents, config.policy());

        Self { store, auth }
    }
}
