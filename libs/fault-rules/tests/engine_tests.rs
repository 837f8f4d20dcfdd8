//! Engine lifecycle and failure-containment tests

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use fault_model::{Alarm, AlarmEvent, DomainEvent, EventForwarder, Severity};
use fault_rules::{
    EvalContext, FactTable, PseudoClock, RuleAction, RuleError, RuleResult, RuleSettings,
    TemporalRule, TemporalRuleEngine, UpdateOutcome,
};
use parking_lot::Mutex;

struct RecordingForwarder {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingForwarder {
    fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }
}

impl EventForwarder for RecordingForwarder {
    fn forward(&self, event: DomainEvent) {
        self.events.lock().push(event);
    }
}

struct PanickingRule;

impl TemporalRule for PanickingRule {
    fn name(&self) -> &'static str {
        "panicking"
    }

    fn evaluate(
        &self,
        _facts: &FactTable,
        _settings: &RuleSettings,
        _ctx: &EvalContext,
    ) -> RuleResult<Vec<RuleAction>> {
        panic!("boom");
    }
}

struct FailingRule;

impl TemporalRule for FailingRule {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn evaluate(
        &self,
        _facts: &FactTable,
        _settings: &RuleSettings,
        _ctx: &EvalContext,
    ) -> RuleResult<Vec<RuleAction>> {
        Err(RuleError::Evaluation {
            rule: "failing",
            message: "synthetic failure".to_string(),
        })
    }
}

fn alarm(id: i64, millis: i64) -> Alarm {
    let mut a = Alarm::from_event(&AlarmEvent {
        reduction_key: format!("n{id}:oops"),
        clear_key: None,
        severity: Severity::Warning,
        time: Utc.timestamp_millis_opt(millis).unwrap(),
        message: "test".to_string(),
    });
    a.id = id;
    a
}

fn engine_with(rules: Vec<Box<dyn TemporalRule>>) -> (Arc<TemporalRuleEngine>, Arc<RecordingForwarder>) {
    let clock = Arc::new(PseudoClock::starting_at(Utc.timestamp_millis_opt(0).unwrap()));
    let forwarder = Arc::new(RecordingForwarder::new());
    let engine = Arc::new(TemporalRuleEngine::with_rules(
        clock,
        RuleSettings::default(),
        forwarder.clone(),
        Duration::from_millis(100),
        rules,
    ));
    (engine, forwarder)
}

#[tokio::test]
async fn test_repeated_update_keeps_one_fact_handle() {
    let (engine, _) = engine_with(Vec::new());

    engine.handle_new_or_updated(alarm(1, 100)).await;
    let handle = engine.reconciler().facts().handle_of(1).unwrap();

    for _ in 0..3 {
        let outcome = engine.handle_new_or_updated(alarm(1, 100)).await;
        assert_eq!(outcome, UpdateOutcome::UpdatedInPlace);
    }
    assert_eq!(engine.reconciler().fact_count(), 1);
    assert_eq!(engine.reconciler().facts().handle_of(1), Some(handle));
}

#[tokio::test]
async fn test_snapshot_convergence_through_engine() {
    let (engine, _) = engine_with(Vec::new());

    engine
        .handle_snapshot(vec![alarm(1, 100), alarm(2, 100)])
        .await;
    engine.handle_new_or_updated(alarm(3, 120)).await;

    engine
        .handle_snapshot(vec![alarm(2, 100), alarm(4, 130)])
        .await;

    let facts = engine.reconciler().facts();
    let mut ids: Vec<i64> = facts.ids().collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![2, 4]);
}

#[tokio::test]
async fn test_panicking_rule_rebuilds_from_last_snapshot() {
    let (engine, forwarder) = engine_with(vec![Box::new(PanickingRule)]);

    // The snapshot is recorded before the rule panics, so recovery has
    // something to rebuild from.
    engine
        .handle_snapshot(vec![alarm(1, 100), alarm(2, 100)])
        .await;

    let events = forwarder.events();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, DomainEvent::EngineRecovered { .. })),
        "expected an EngineRecovered notification, got {events:?}"
    );
    assert_eq!(engine.reconciler().fact_count(), 2);

    // The engine keeps reconciling after recovery; each pass that hits the
    // bad rule recovers onto the latest recorded snapshot
    engine
        .handle_snapshot(vec![alarm(1, 100), alarm(2, 100), alarm(3, 110)])
        .await;
    assert_eq!(engine.reconciler().fact_count(), 3);
}

#[tokio::test]
async fn test_failing_rule_is_isolated() {
    let (engine, forwarder) = engine_with(vec![Box::new(FailingRule)]);

    engine.handle_snapshot(vec![alarm(1, 100)]).await;

    // An Err from a rule is not fatal: no recovery event, facts intact
    assert!(forwarder.events().is_empty());
    assert_eq!(engine.reconciler().fact_count(), 1);
}

#[tokio::test]
async fn test_start_stop_joins_firing_loop() {
    let (engine, _) = engine_with(Vec::new());

    engine.start().await;
    assert!(engine.is_running());

    engine.stop().await;
    assert!(!engine.is_running());

    // Stopping twice is harmless
    engine.stop().await;
}

#[tokio::test]
async fn test_deleted_alarm_leaves_working_memory() {
    let (engine, _) = engine_with(Vec::new());

    engine.handle_new_or_updated(alarm(1, 100)).await;
    assert!(engine.handle_deleted(1).await);
    assert!(!engine.handle_deleted(1).await);
    assert_eq!(engine.reconciler().fact_count(), 0);
}
