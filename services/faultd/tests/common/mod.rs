//! Shared fixtures for faultd integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use fault_model::{Alarm, AlarmEvent, AlarmId, DomainEvent, EventForwarder, Severity};
use fault_rules::{PseudoClock, RuleSettings, TemporalRuleEngine};
use fault_store::{AlarmStore, MemoryAlarmStore};
use parking_lot::Mutex;

use faultd::{AlarmService, ListenerManager, RuleEngineListener, Ticketer};

/// Ticketer double recording every request
pub struct RecordingTicketer {
    enabled: AtomicBool,
    creates: Mutex<Vec<AlarmId>>,
    updates: Mutex<Vec<AlarmId>>,
    closes: Mutex<Vec<AlarmId>>,
}

impl RecordingTicketer {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            creates: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            closes: Mutex::new(Vec::new()),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn creates(&self) -> Vec<AlarmId> {
        self.creates.lock().clone()
    }

    pub fn updates(&self) -> Vec<AlarmId> {
        self.updates.lock().clone()
    }

    pub fn closes(&self) -> Vec<AlarmId> {
        self.closes.lock().clone()
    }
}

#[async_trait]
impl Ticketer for RecordingTicketer {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn create_ticket(&self, alarm: &Alarm) -> Result<()> {
        self.creates.lock().push(alarm.id);
        Ok(())
    }

    async fn update_ticket(&self, alarm: &Alarm) -> Result<()> {
        self.updates.lock().push(alarm.id);
        Ok(())
    }

    async fn close_ticket(&self, alarm: &Alarm) -> Result<()> {
        self.closes.lock().push(alarm.id);
        Ok(())
    }
}

/// Forwarder double recording every domain event
pub struct RecordingForwarder {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingForwarder {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }
}

impl EventForwarder for RecordingForwarder {
    fn forward(&self, event: DomainEvent) {
        self.events.lock().push(event);
    }
}

/// Fully wired daemon core against a pseudo clock.
///
/// Background loops are not started; tests drive the engine and poller
/// explicitly for deterministic assertions.
pub struct Harness {
    pub clock: Arc<PseudoClock>,
    pub store: Arc<MemoryAlarmStore>,
    pub ticketer: Arc<RecordingTicketer>,
    pub forwarder: Arc<RecordingForwarder>,
    pub manager: Arc<ListenerManager>,
    pub engine: Arc<TemporalRuleEngine>,
    pub service: Arc<AlarmService>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_settings(RuleSettings::default()).await
    }

    pub async fn with_settings(settings: RuleSettings) -> Self {
        let clock = Arc::new(PseudoClock::starting_at(epoch()));
        let store = Arc::new(MemoryAlarmStore::new());
        let ticketer = Arc::new(RecordingTicketer::new());
        let forwarder = Arc::new(RecordingForwarder::new());

        let manager = Arc::new(ListenerManager::new(
            store.clone() as Arc<dyn AlarmStore>,
            Duration::from_secs(5),
        ));
        let engine = Arc::new(TemporalRuleEngine::new(
            clock.clone(),
            settings,
            forwarder.clone(),
            Duration::from_millis(50),
        ));
        let service = AlarmService::new(
            store.clone() as Arc<dyn AlarmStore>,
            ticketer.clone(),
            forwarder.clone(),
            manager.clone(),
        );
        service.register_rule_actions(&engine);
        manager
            .add_listener(Arc::new(RuleEngineListener::new(engine.clone())))
            .await;

        Self {
            clock,
            store,
            ticketer,
            forwarder,
            manager,
            engine,
            service,
        }
    }

    /// Move the session clock and run one evaluation pass
    pub async fn advance_and_tick(&self, duration: chrono::Duration) {
        self.clock.advance(duration);
        self.engine.tick().await;
    }

    pub async fn reduce(&self, event: &AlarmEvent) -> Alarm {
        self.service.reduce_event(event).await.unwrap()
    }

    pub async fn stored(&self, id: AlarmId) -> Option<Alarm> {
        self.store.get(id).await.unwrap()
    }
}

/// Session epoch all fixture timestamps hang off
pub fn epoch() -> DateTime<Utc> {
    Utc.timestamp_millis_opt(0).unwrap()
}

pub fn at_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

/// A problem event for the given reduction key
pub fn trigger_event(key: &str, severity: Severity, millis: i64) -> AlarmEvent {
    AlarmEvent {
        reduction_key: key.to_string(),
        clear_key: None,
        severity,
        time: at_millis(millis),
        message: format!("problem on {key}"),
    }
}

/// A resolution event clearing the given reduction key
pub fn clear_event(clears: &str, millis: i64) -> AlarmEvent {
    AlarmEvent {
        reduction_key: format!("clear:{clears}"),
        clear_key: Some(clears.to_string()),
        severity: Severity::Cleared,
        time: at_millis(millis),
        message: format!("resolution for {clears}"),
    }
}
