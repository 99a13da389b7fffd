//! Notifications emitted to the host's event system

use serde::Serialize;

use crate::types::{AccountId, OfferId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    AccountCreated {
        account: AccountId,
        username: String,
    },
    EnrolmentsApplied {
        account: AccountId,
        offers: Vec<OfferId>,
    },
}

/// Receives events; delivery failures are the sink's own concern
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}
