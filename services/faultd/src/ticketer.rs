//! Trouble-ticket system abstraction.

use anyhow::Result;
use async_trait::async_trait;
use fault_model::Alarm;
use tracing::debug;

/// External trouble-ticket system seam.
///
/// Calls are requests: the ticketing integration reports completion back
/// through the alarm service callbacks (`on_ticket_created` and friends),
/// which advance the alarm's ticket sub-state.
#[async_trait]
pub trait Ticketer: Send + Sync + 'static {
    /// Whether a ticketing system is wired up at all
    fn is_enabled(&self) -> bool;

    /// Request a new ticket for the alarm
    async fn create_ticket(&self, alarm: &Alarm) -> Result<()>;

    /// Push the alarm's latest state into its ticket
    async fn update_ticket(&self, alarm: &Alarm) -> Result<()>;

    /// Request closure of the alarm's ticket
    async fn close_ticket(&self, alarm: &Alarm) -> Result<()>;
}

/// Ticketer used when no integration is configured
pub struct NullTicketer;

#[async_trait]
impl Ticketer for NullTicketer {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn create_ticket(&self, alarm: &Alarm) -> Result<()> {
        debug!(id = alarm.id, "Ticketing disabled; ignoring create request");
        Ok(())
    }

    async fn update_ticket(&self, alarm: &Alarm) -> Result<()> {
        debug!(id = alarm.id, "Ticketing disabled; ignoring update request");
        Ok(())
    }

    async fn close_ticket(&self, alarm: &Alarm) -> Result<()> {
        debug!(id = alarm.id, "Ticketing disabled; ignoring close request");
        Ok(())
    }
}
