//! Garbage collection of cleared alarms.

use crate::actions::RuleAction;
use crate::error::RuleResult;
use crate::facts::FactTable;
use crate::rules::{EvalContext, TemporalRule};
use crate::settings::RuleSettings;

/// Cleared alarms past their retention window are deleted.
///
/// The window branches on acknowledgment state at evaluation time, not at
/// insertion time: an ack arriving as an in-place update still moves the
/// alarm to the longer window.
pub struct GarbageCollectRule;

impl TemporalRule for GarbageCollectRule {
    fn name(&self) -> &'static str {
        "garbage-collection"
    }

    fn evaluate(
        &self,
        facts: &FactTable,
        settings: &RuleSettings,
        ctx: &EvalContext,
    ) -> RuleResult<Vec<RuleAction>> {
        let gc = &settings.garbage_collection;
        if !gc.enabled {
            return Ok(Vec::new());
        }

        let actions = facts
            .iter()
            .filter(|f| {
                if !f.alarm.is_cleared() {
                    return false;
                }
                let window = if f.alarm.is_acknowledged() {
                    gc.cleared_acked_after()
                } else {
                    gc.cleared_after()
                };
                ctx.now - f.alarm.last_event_time >= window
            })
            .map(|f| RuleAction::Delete {
                alarm: f.alarm.clone(),
            })
            .collect();
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use fault_model::{Alarm, AlarmEvent, Severity};

    fn cleared_alarm(acked: bool) -> Alarm {
        let mut a = Alarm::from_event(&AlarmEvent {
            reduction_key: "n1:oops".to_string(),
            clear_key: None,
            severity: Severity::Cleared,
            time: Utc.timestamp_millis_opt(100).unwrap(),
            message: "cleared".to_string(),
        });
        a.id = 1;
        if acked {
            a.acknowledge("me", Utc.timestamp_millis_opt(110).unwrap());
        }
        a
    }

    fn ctx_after(duration: Duration) -> EvalContext {
        EvalContext {
            now: Utc.timestamp_millis_opt(100).unwrap() + duration,
            ticketing_enabled: false,
        }
    }

    #[test]
    fn test_unacked_survives_short_advance() {
        let mut facts = FactTable::new();
        facts.insert(cleared_alarm(false));

        let actions = GarbageCollectRule
            .evaluate(&facts, &RuleSettings::default(), &ctx_after(Duration::hours(1)))
            .unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn test_unacked_collected_after_window() {
        let mut facts = FactTable::new();
        facts.insert(cleared_alarm(false));

        let actions = GarbageCollectRule
            .evaluate(&facts, &RuleSettings::default(), &ctx_after(Duration::days(3)))
            .unwrap();
        assert_eq!(actions.len(), 1);
        assert!(matches!(&actions[0], RuleAction::Delete { alarm } if alarm.id == 1));
    }

    #[test]
    fn test_acked_gets_the_longer_window() {
        let mut facts = FactTable::new();
        facts.insert(cleared_alarm(true));

        let settings = RuleSettings::default();
        let actions = GarbageCollectRule
            .evaluate(&facts, &settings, &ctx_after(Duration::days(1)))
            .unwrap();
        assert!(actions.is_empty());

        let actions = GarbageCollectRule
            .evaluate(&facts, &settings, &ctx_after(Duration::days(9)))
            .unwrap();
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn test_live_alarms_are_never_collected() {
        let mut facts = FactTable::new();
        let mut a = cleared_alarm(false);
        a.severity = Severity::Critical;
        facts.insert(a);

        let actions = GarbageCollectRule
            .evaluate(&facts, &RuleSettings::default(), &ctx_after(Duration::days(30)))
            .unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn test_disabled_gc_collects_nothing() {
        let mut facts = FactTable::new();
        facts.insert(cleared_alarm(false));

        let mut settings = RuleSettings::default();
        settings.garbage_collection.enabled = false;
        let actions = GarbageCollectRule
            .evaluate(&facts, &settings, &ctx_after(Duration::days(30)))
            .unwrap();
        assert!(actions.is_empty());
    }
}
