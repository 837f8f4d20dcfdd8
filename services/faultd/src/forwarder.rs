//! Outbound notification implementations.

use fault_model::{DomainEvent, EventForwarder};
use tracing::{info, warn};

/// Forwarder that surfaces domain events on the log stream as JSON.
///
/// Deployments with a message bus implement `EventForwarder` against it;
/// the daemon only requires fire-and-forget semantics.
pub struct LoggingEventForwarder;

impl EventForwarder for LoggingEventForwarder {
    fn forward(&self, event: DomainEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => info!(payload = %payload, "Domain event"),
            Err(e) => warn!(error = %e, "Failed to encode domain event"),
        }
    }
}
