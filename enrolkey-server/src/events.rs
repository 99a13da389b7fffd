//! Event sink that writes signup events to the log

use enrolkey_core::{Event, EventSink};

/// Logs every event as a structured tracing record
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEvents;

impl EventSink for TracingEvents {
    fn emit(&self, event: Event) {
        match serde_json::to_string(&event) {
            Ok(payload) => tracing::info!(target: "enrolkey_server::events", %payload, "Event"),
            Err(e) => tracing::warn!(error = %e, ?event, "Could not serialize event"),
        }
    }
}
