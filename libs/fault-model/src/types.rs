use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::event::AlarmEvent;

/// Store-assigned alarm identifier; 0 means "not yet saved"
pub type AlarmId = i64;

/// Alarm severity, ordered from least to most severe.
///
/// `Cleared` sits just above `Indeterminate` so that `severity > Cleared`
/// selects alarms that still describe a live problem.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Severity {
    #[default]
    Indeterminate,
    Cleared,
    Normal,
    Warning,
    Minor,
    Major,
    Critical,
}

impl Severity {
    /// True for severities describing an unresolved problem
    pub fn is_live(self) -> bool {
        self > Severity::Cleared
    }
}

/// Trouble-ticket sub-state of an alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TicketState {
    /// No ticket has been requested
    #[default]
    None,
    /// Ticket creation requested, awaiting the ticketing system
    CreatePending,
    /// Ticket exists and is open
    Open,
    /// Ticket update requested, awaiting the ticketing system
    UpdatePending,
    /// Ticket has been closed
    Closed,
}

/// An alarm: the reduced, persistent view of a recurring condition.
///
/// Identity is twofold: the store-assigned `id` and the `reduction_key`
/// computed from event content. Events carrying an already-known reduction
/// key fold into the existing alarm instead of creating a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alarm {
    /// Store-assigned id (0 until saved)
    pub id: AlarmId,
    /// Identity of the recurring condition this alarm tracks
    pub reduction_key: String,
    /// For resolution alarms: the reduction key this alarm clears
    pub clear_key: Option<String>,
    /// Current severity
    pub severity: Severity,
    /// Severity implied by the most recent event; `unclear` restores this
    pub last_event_severity: Severity,
    /// Number of events folded into this alarm
    pub counter: u32,
    /// Time of the first event
    pub first_event_time: DateTime<Utc>,
    /// Time of the most recent event
    pub last_event_time: DateTime<Utc>,
    /// Human-readable description from the latest event
    pub message: String,
    /// Acknowledging user, if any
    pub ack_user: Option<String>,
    /// Acknowledgment time, if any
    pub ack_time: Option<DateTime<Utc>>,
    /// Trouble-ticket sub-state
    pub ticket_state: TicketState,
    /// Identifier assigned by the ticketing system
    pub ticket_id: Option<String>,
    /// Timestamp of the last automation-driven transition
    pub last_automation_time: Option<DateTime<Utc>>,
    /// Ids of alarms that cause this one
    pub caused_by: BTreeSet<AlarmId>,
    /// Ids of alarms this one impacts
    pub impacts: BTreeSet<AlarmId>,
}

impl Alarm {
    /// Build a fresh alarm from the first event of a new reduction key
    pub fn from_event(event: &AlarmEvent) -> Self {
        Self {
            id: 0,
            reduction_key: event.reduction_key.clone(),
            clear_key: event.clear_key.clone(),
            severity: event.severity,
            last_event_severity: event.severity,
            counter: 1,
            first_event_time: event.time,
            last_event_time: event.time,
            message: event.message.clone(),
            ack_user: None,
            ack_time: None,
            ticket_state: TicketState::None,
            ticket_id: None,
            last_automation_time: None,
            caused_by: BTreeSet::new(),
            impacts: BTreeSet::new(),
        }
    }

    /// Fold a subsequent event for the same reduction key into this alarm
    pub fn record_event(&mut self, event: &AlarmEvent) {
        self.counter += 1;
        self.last_event_time = event.time;
        self.severity = event.severity;
        self.last_event_severity = event.severity;
        self.message = event.message.clone();
    }

    /// Acknowledge this alarm
    pub fn acknowledge(&mut self, user: &str, when: DateTime<Utc>) {
        self.ack_user = Some(user.to_string());
        self.ack_time = Some(when);
    }

    /// Remove the acknowledgment
    pub fn unacknowledge(&mut self) {
        self.ack_user = None;
        self.ack_time = None;
    }

    /// True when someone has acknowledged the alarm
    pub fn is_acknowledged(&self) -> bool {
        self.ack_time.is_some()
    }

    /// True once the alarm has been cleared
    pub fn is_cleared(&self) -> bool {
        self.severity == Severity::Cleared
    }

    /// True when this alarm is recorded as the cause of another
    pub fn is_cause(&self) -> bool {
        !self.impacts.is_empty()
    }

    /// True when another alarm is recorded as causing this one
    pub fn is_impacted(&self) -> bool {
        !self.caused_by.is_empty()
    }

    /// Record `cause` as a cause of this alarm
    pub fn add_cause(&mut self, cause: AlarmId) -> Result<(), ModelError> {
        self.check_relation_endpoint(cause)?;
        self.caused_by.insert(cause);
        Ok(())
    }

    /// Record this alarm as impacting `impacted`
    pub fn add_impact(&mut self, impacted: AlarmId) -> Result<(), ModelError> {
        self.check_relation_endpoint(impacted)?;
        self.impacts.insert(impacted);
        Ok(())
    }

    fn check_relation_endpoint(&self, other: AlarmId) -> Result<(), ModelError> {
        if self.id == 0 || other == 0 {
            return Err(ModelError::UnsavedRelationEndpoint);
        }
        if other == self.id {
            return Err(ModelError::SelfReferentialRelation(self.id));
        }
        Ok(())
    }
}
