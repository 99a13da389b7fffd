//! Enrolment-key signup service
//!
//! HTTP front end for self-registration: a new user submits a signup token
//! and is enrolled in every course or group the token unlocks.

pub mod config;
pub mod crypto;
pub mod email;
pub mod error;
pub mod events;
pub mod routes;
pub mod state;
pub mod store;

pub use config::Config;
pub use email::{ConsoleEmailSender, EmailSender, MailNotifier, SmtpConfig, SmtpEmailSender};
pub use error::ServerError;
pub use events::TracingEvents;
pub use state::{AppState, ServerAuth};
pub use store::{CatalogStore, InMemoryStore, OfferSettings, SessionStore, SqliteStore, Store};
