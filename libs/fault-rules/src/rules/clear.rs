//! Clearing rules: resolution alarms and externally-closed tickets.

use std::collections::HashSet;

use fault_model::TicketState;

use crate::actions::RuleAction;
use crate::error::RuleResult;
use crate::facts::FactTable;
use crate::rules::{EvalContext, TemporalRule};
use crate::settings::RuleSettings;

/// A resolution alarm carrying `clear_key = K` clears every live alarm
/// whose `reduction_key` is K.
pub struct ClearByKeyRule;

impl TemporalRule for ClearByKeyRule {
    fn name(&self) -> &'static str {
        "clear-by-key"
    }

    fn evaluate(
        &self,
        facts: &FactTable,
        _settings: &RuleSettings,
        _ctx: &EvalContext,
    ) -> RuleResult<Vec<RuleAction>> {
        let clear_keys: HashSet<&str> = facts
            .iter()
            .filter_map(|f| f.alarm.clear_key.as_deref())
            .collect();
        if clear_keys.is_empty() {
            return Ok(Vec::new());
        }

        let actions = facts
            .iter()
            .filter(|f| {
                f.alarm.severity.is_live() && clear_keys.contains(f.alarm.reduction_key.as_str())
            })
            .map(|f| RuleAction::Clear {
                alarm: f.alarm.clone(),
            })
            .collect();
        Ok(actions)
    }
}

/// Reverse coupling: when an alarm's ticket was closed on the ticketing
/// side, the alarm itself is considered resolved and is cleared.
pub struct ClearOnTicketClosedRule;

impl TemporalRule for ClearOnTicketClosedRule {
    fn name(&self) -> &'static str {
        "clear-on-ticket-closed"
    }

    fn evaluate(
        &self,
        facts: &FactTable,
        _settings: &RuleSettings,
        _ctx: &EvalContext,
    ) -> RuleResult<Vec<RuleAction>> {
        let actions = facts
            .iter()
            .filter(|f| f.alarm.ticket_state == TicketState::Closed && f.alarm.severity.is_live())
            .map(|f| RuleAction::Clear {
                alarm: f.alarm.clone(),
            })
            .collect();
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use fault_model::{Alarm, AlarmEvent, AlarmId, Severity};

    fn ctx() -> EvalContext {
        EvalContext {
            now: Utc.timestamp_millis_opt(1_000).unwrap(),
            ticketing_enabled: false,
        }
    }

    fn trigger(id: AlarmId, key: &str, millis: i64) -> Alarm {
        let mut a = Alarm::from_event(&AlarmEvent {
            reduction_key: key.to_string(),
            clear_key: None,
            severity: Severity::Warning,
            time: Utc.timestamp_millis_opt(millis).unwrap(),
            message: "trigger".to_string(),
        });
        a.id = id;
        a
    }

    fn resolution(id: AlarmId, clears: &str, millis: i64) -> Alarm {
        let mut a = Alarm::from_event(&AlarmEvent {
            reduction_key: format!("clear:{clears}"),
            clear_key: Some(clears.to_string()),
            severity: Severity::Cleared,
            time: Utc.timestamp_millis_opt(millis).unwrap(),
            message: "resolution".to_string(),
        });
        a.id = id;
        a
    }

    #[test]
    fn test_clear_by_key_matches_live_alarm() {
        let mut facts = FactTable::new();
        facts.insert(trigger(1, "n1:oops", 100));
        facts.insert(resolution(2, "n1:oops", 101));

        let actions = ClearByKeyRule
            .evaluate(&facts, &RuleSettings::default(), &ctx())
            .unwrap();
        assert_eq!(actions.len(), 1);
        assert!(matches!(&actions[0], RuleAction::Clear { alarm } if alarm.id == 1));
    }

    #[test]
    fn test_clear_by_key_ignores_other_keys() {
        let mut facts = FactTable::new();
        facts.insert(trigger(1, "n1:oops", 100));
        facts.insert(resolution(2, "n2:other", 101));

        let actions = ClearByKeyRule
            .evaluate(&facts, &RuleSettings::default(), &ctx())
            .unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn test_clear_by_key_skips_already_cleared() {
        let mut facts = FactTable::new();
        let mut a = trigger(1, "n1:oops", 100);
        a.severity = Severity::Cleared;
        facts.insert(a);
        facts.insert(resolution(2, "n1:oops", 101));

        let actions = ClearByKeyRule
            .evaluate(&facts, &RuleSettings::default(), &ctx())
            .unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn test_closed_ticket_clears_live_alarm() {
        let mut facts = FactTable::new();
        let mut a = trigger(1, "n1:oops", 100);
        a.ticket_state = TicketState::Closed;
        facts.insert(a);

        let actions = ClearOnTicketClosedRule
            .evaluate(&facts, &RuleSettings::default(), &ctx())
            .unwrap();
        assert_eq!(actions.len(), 1);
        assert!(matches!(&actions[0], RuleAction::Clear { alarm } if alarm.id == 1));

        // Once cleared the rule goes quiet
        let mut facts = FactTable::new();
        let mut a = trigger(1, "n1:oops", 100);
        a.ticket_state = TicketState::Closed;
        a.severity = Severity::Cleared;
        facts.insert(a);
        let actions = ClearOnTicketClosedRule
            .evaluate(&facts, &RuleSettings::default(), &ctx())
            .unwrap();
        assert!(actions.is_empty());
    }
}
