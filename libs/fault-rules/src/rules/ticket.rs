//! Trouble-ticket escalation rules.

use fault_model::{Severity, TicketState};

use crate::actions::RuleAction;
use crate::error::RuleResult;
use crate::facts::FactTable;
use crate::rules::{EvalContext, TemporalRule};
use crate::settings::RuleSettings;

/// Unacknowledged live alarms at or above the severity threshold get a
/// ticket once they have been outstanding long enough; Critical alarms use
/// the shorter window.
pub struct CreateTicketRule;

impl TemporalRule for CreateTicketRule {
    fn name(&self) -> &'static str {
        "ticket-create"
    }

    fn evaluate(
        &self,
        facts: &FactTable,
        settings: &RuleSettings,
        ctx: &EvalContext,
    ) -> RuleResult<Vec<RuleAction>> {
        let ticketing = &settings.ticketing;
        if !ticketing.enabled || !ctx.ticketing_enabled {
            return Ok(Vec::new());
        }

        let actions = facts
            .iter()
            .filter(|f| {
                let alarm = &f.alarm;
                if alarm.is_acknowledged()
                    || !alarm.severity.is_live()
                    || alarm.severity < ticketing.severity_threshold
                    || alarm.ticket_state != TicketState::None
                {
                    return false;
                }
                let window = if alarm.severity == Severity::Critical {
                    ticketing.create_after_critical()
                } else {
                    ticketing.create_after()
                };
                ctx.now - alarm.last_event_time >= window
            })
            .map(|f| RuleAction::CreateTicket {
                alarm: f.alarm.clone(),
            })
            .collect();
        Ok(actions)
    }
}

/// Open tickets are refreshed when the alarm saw a newer event than the
/// last automation stamp.
pub struct UpdateTicketRule;

impl TemporalRule for UpdateTicketRule {
    fn name(&self) -> &'static str {
        "ticket-update"
    }

    fn evaluate(
        &self,
        facts: &FactTable,
        settings: &RuleSettings,
        ctx: &EvalContext,
    ) -> RuleResult<Vec<RuleAction>> {
        if !settings.ticketing.enabled || !ctx.ticketing_enabled {
            return Ok(Vec::new());
        }

        let actions = facts
            .iter()
            .filter(|f| {
                f.alarm.ticket_state == TicketState::Open
                    && f.alarm
                        .last_automation_time
                        .is_some_and(|stamp| f.alarm.last_event_time > stamp)
            })
            .map(|f| RuleAction::UpdateTicket {
                alarm: f.alarm.clone(),
            })
            .collect();
        Ok(actions)
    }
}

/// Tickets still open for a cleared alarm are closed.
pub struct CloseTicketOnClearRule;

impl TemporalRule for CloseTicketOnClearRule {
    fn name(&self) -> &'static str {
        "ticket-close-on-clear"
    }

    fn evaluate(
        &self,
        facts: &FactTable,
        settings: &RuleSettings,
        ctx: &EvalContext,
    ) -> RuleResult<Vec<RuleAction>> {
        if !settings.ticketing.enabled || !ctx.ticketing_enabled {
            return Ok(Vec::new());
        }

        let actions = facts
            .iter()
            .filter(|f| {
                f.alarm.is_cleared()
                    && matches!(
                        f.alarm.ticket_state,
                        TicketState::Open | TicketState::UpdatePending
                    )
            })
            .map(|f| RuleAction::CloseTicket {
                alarm: f.alarm.clone(),
            })
            .collect();
        Ok(actions)
    }
}
