//! Inbound events and outbound domain notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AlarmId, Severity};

/// A decoded inbound event, ready to be reduced into an alarm.
///
/// Transport and protocol decoding happen upstream; by the time an event
/// reaches this crate it carries a reduction key and a severity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmEvent {
    /// Identity of the recurring condition
    pub reduction_key: String,
    /// For resolution events: the reduction key being cleared
    pub clear_key: Option<String>,
    /// Severity implied by the event
    pub severity: Severity,
    /// Event timestamp
    pub time: DateTime<Utc>,
    /// Human-readable description
    pub message: String,
}

/// Outbound notification of an alarm lifecycle transition.
///
/// Forwarded fire-and-forget after the transition has been committed; the
/// transport that carries these to other systems lives outside this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DomainEvent {
    AlarmCreated { id: AlarmId, reduction_key: String },
    AlarmUpdated { id: AlarmId },
    AlarmCleared { id: AlarmId },
    AlarmUncleared { id: AlarmId },
    AlarmAcknowledged { id: AlarmId, user: String },
    AlarmUnacknowledged { id: AlarmId },
    AlarmDeleted { id: AlarmId, reduction_key: String },
    TicketCreateRequested { id: AlarmId },
    TicketUpdateRequested { id: AlarmId },
    TicketCloseRequested { id: AlarmId },
    /// The rule engine hit a fatal failure and rebuilt its session
    EngineRecovered { reason: String },
}

/// Fire-and-forget outbound notification seam.
pub trait EventForwarder: Send + Sync {
    fn forward(&self, event: DomainEvent);
}
