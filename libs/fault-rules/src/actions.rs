//! Rule actions and the seam through which they execute.
//!
//! Rules decide; the [`AlarmActions`] implementor (the alarm service facade)
//! performs the store transaction, pushes the result back into working
//! memory and emits the outbound notification. Actions must stay idempotent:
//! a condition can remain true for several cycles until its own side effect
//! disables it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fault_model::{Alarm, AlarmId};

/// A mutation requested by a rule, carrying the fact's view of the alarm
#[derive(Debug, Clone)]
pub enum RuleAction {
    Clear { alarm: Alarm },
    Delete { alarm: Alarm },
    CreateTicket { alarm: Alarm },
    UpdateTicket { alarm: Alarm },
    CloseTicket { alarm: Alarm },
}

impl RuleAction {
    pub fn alarm_id(&self) -> AlarmId {
        self.alarm().id
    }

    pub fn alarm(&self) -> &Alarm {
        match self {
            RuleAction::Clear { alarm }
            | RuleAction::Delete { alarm }
            | RuleAction::CreateTicket { alarm }
            | RuleAction::UpdateTicket { alarm }
            | RuleAction::CloseTicket { alarm } => alarm,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RuleAction::Clear { .. } => "clear",
            RuleAction::Delete { .. } => "delete",
            RuleAction::CreateTicket { .. } => "create-ticket",
            RuleAction::UpdateTicket { .. } => "update-ticket",
            RuleAction::CloseTicket { .. } => "close-ticket",
        }
    }
}

/// Transitions the rule engine can drive.
///
/// Implemented by the alarm service facade and installed on the engine after
/// construction; the engine holds the implementor weakly.
#[async_trait]
pub trait AlarmActions: Send + Sync {
    /// Whether the deployment has a ticketing system wired up
    fn is_ticketing_enabled(&self) -> bool;

    /// Set the alarm's severity to Cleared
    async fn clear_alarm(&self, alarm: &Alarm, when: DateTime<Utc>) -> anyhow::Result<()>;

    /// Remove the alarm from the store and working memory
    async fn delete_alarm(&self, alarm: &Alarm) -> anyhow::Result<()>;

    /// Request a trouble ticket for the alarm
    async fn create_ticket(&self, alarm: &Alarm, when: DateTime<Utc>) -> anyhow::Result<()>;

    /// Push the alarm's latest state into its ticket
    async fn update_ticket(&self, alarm: &Alarm, when: DateTime<Utc>) -> anyhow::Result<()>;

    /// Close the alarm's ticket
    async fn close_ticket(&self, alarm: &Alarm, when: DateTime<Utc>) -> anyhow::Result<()>;
}
