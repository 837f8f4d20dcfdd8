//! The temporal rule engine.
//!
//! Entry points reconcile working memory first, then fire. Firing collects
//! actions from every rule in stable order while holding the fact-table
//! lock, releases the lock, and executes the actions through the installed
//! [`AlarmActions`] service. A transition performed by an action feeds back
//! into the engine through the normal listener path; the in-progress pass
//! absorbs that nested fire request and re-evaluates until quiescent.
//!
//! Failure containment: a rule returning an error is skipped for the cycle;
//! a panicking rule tears the session down, emits a self-describing
//! notification and rebuilds working memory from the last known snapshot.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use fault_model::{Alarm, AlarmId, DomainEvent, EventForwarder};
use parking_lot::RwLock;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::actions::{AlarmActions, RuleAction};
use crate::clock::Clock;
use crate::error::RuleResult;
use crate::reconcile::{ReconciliationEngine, UpdateOutcome};
use crate::rules::{default_rules, EvalContext, TemporalRule};
use crate::settings::RuleSettings;

/// Upper bound on evaluate-execute passes per firing
const MAX_FIRING_PASSES: usize = 8;

/// Stateful evaluator of the temporal rule set over reconciled facts
pub struct TemporalRuleEngine {
    reconciler: ReconciliationEngine,
    rules: Vec<Box<dyn TemporalRule>>,
    settings: RwLock<RuleSettings>,
    clock: Arc<dyn Clock>,
    forwarder: Arc<dyn EventForwarder>,
    service: RwLock<Option<Weak<dyn AlarmActions>>>,
    firing: AtomicBool,
    tick_interval: Duration,
    shutdown: Notify,
    running: AtomicBool,
    loop_handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl TemporalRuleEngine {
    /// Create an engine with the standard rule set
    pub fn new(
        clock: Arc<dyn Clock>,
        settings: RuleSettings,
        forwarder: Arc<dyn EventForwarder>,
        tick_interval: Duration,
    ) -> Self {
        Self::with_rules(clock, settings, forwarder, tick_interval, default_rules())
    }

    /// Create an engine with an explicit rule list (kept in firing order)
    pub fn with_rules(
        clock: Arc<dyn Clock>,
        settings: RuleSettings,
        forwarder: Arc<dyn EventForwarder>,
        tick_interval: Duration,
        rules: Vec<Box<dyn TemporalRule>>,
    ) -> Self {
        Self {
            reconciler: ReconciliationEngine::new(),
            rules,
            settings: RwLock::new(settings),
            clock,
            forwarder,
            service: RwLock::new(None),
            firing: AtomicBool::new(false),
            tick_interval,
            shutdown: Notify::new(),
            running: AtomicBool::new(false),
            loop_handle: tokio::sync::Mutex::new(None),
        }
    }

    /// Install the service that executes rule actions.
    ///
    /// Held weakly: the facade owns the engine, not the other way around.
    pub fn set_service(&self, service: &Arc<dyn AlarmActions>) {
        *self.service.write() = Some(Arc::downgrade(service));
    }

    /// Access the reconciliation layer (diagnostics and tests)
    pub fn reconciler(&self) -> &ReconciliationEngine {
        &self.reconciler
    }

    /// Current settings (synchronized copy)
    pub fn settings(&self) -> RuleSettings {
        self.settings.read().clone()
    }

    /// Swap in new rule settings
    pub fn reload_settings(&self, settings: RuleSettings) {
        *self.settings.write() = settings;
        info!("Rule settings reloaded");
    }

    /// Re-read rule settings from their YAML file and swap them in
    pub fn reload_settings_from_file(&self, path: &Path) -> RuleResult<()> {
        let settings = RuleSettings::from_yaml_file(path)?;
        self.reload_settings(settings);
        Ok(())
    }

    /// Reconcile a full store snapshot, then fire
    pub async fn handle_snapshot(&self, alarms: Vec<Alarm>) {
        self.reconciler.apply_snapshot(alarms);
        self.fire_all().await;
    }

    /// Reconcile a single created/updated alarm, then fire
    pub async fn handle_new_or_updated(&self, alarm: Alarm) -> UpdateOutcome {
        let outcome = self.reconciler.apply_update(alarm);
        self.fire_all().await;
        outcome
    }

    /// Drop a deleted alarm from working memory, then fire
    pub async fn handle_deleted(&self, id: AlarmId) -> bool {
        let removed = self.reconciler.apply_delete(id);
        if removed {
            self.fire_all().await;
        }
        removed
    }

    /// Force one synchronous evaluation pass; blocks until it completes
    pub async fn tick(&self) {
        self.fire_all().await;
    }

    /// Spawn the autonomous firing loop
    pub async fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Rule engine already running");
            return;
        }
        info!(
            tick_ms = self.tick_interval.as_millis() as u64,
            rules = self.rules.len(),
            "Starting temporal rule engine"
        );

        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(engine.tick_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        engine.fire_all().await;
                    }
                    _ = engine.shutdown.notified() => {
                        break;
                    }
                }
            }
            debug!("Rule engine firing loop exited");
        });
        *self.loop_handle.lock().await = Some(handle);
    }

    /// Halt the firing loop and join it before returning
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("Stopping temporal rule engine...");
        self.shutdown.notify_one();
        if let Some(handle) = self.loop_handle.lock().await.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "Rule engine firing loop ended abnormally");
            }
        }
        info!("Temporal rule engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn fire_all(&self) {
        // A pass already in flight re-evaluates after executing its actions,
        // so a nested or concurrent request has nothing left to do.
        if self
            .firing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        self.run_passes().await;
        self.firing.store(false, Ordering::SeqCst);
    }

    async fn run_passes(&self) {
        for _ in 0..MAX_FIRING_PASSES {
            let actions = match self.collect_actions() {
                Ok(actions) => actions,
                Err(reason) => {
                    self.recover(reason);
                    return;
                }
            };
            if actions.is_empty() {
                return;
            }
            let Some(service) = self.current_service() else {
                debug!(
                    pending = actions.len(),
                    "No alarm service installed; dropping pending rule actions"
                );
                return;
            };

            let mut any_applied = false;
            for action in actions {
                any_applied |= self.execute_action(&service, action).await;
            }
            if !any_applied {
                // Every action failed; leave the conditions for a later cycle
                return;
            }
        }
        warn!(
            passes = MAX_FIRING_PASSES,
            "Rule firing did not quiesce; continuing next cycle"
        );
    }

    /// Evaluate all rules against the current facts. `Err` carries the
    /// description of a fatal (panicking) rule.
    fn collect_actions(&self) -> Result<Vec<RuleAction>, String> {
        let settings = self.settings.read().clone();
        let ctx = EvalContext {
            now: self.clock.now(),
            ticketing_enabled: self
                .current_service()
                .map(|s| s.is_ticketing_enabled())
                .unwrap_or(false),
        };

        let facts = self.reconciler.facts();
        let mut actions = Vec::new();
        for rule in &self.rules {
            match catch_unwind(AssertUnwindSafe(|| rule.evaluate(&facts, &settings, &ctx))) {
                Ok(Ok(mut found)) => actions.append(&mut found),
                Ok(Err(e)) => {
                    warn!(rule = rule.name(), error = %e, "Rule evaluation failed; skipping rule for this cycle");
                }
                Err(_) => {
                    return Err(format!("rule '{}' panicked during evaluation", rule.name()));
                }
            }
        }
        Ok(actions)
    }

    async fn execute_action(&self, service: &Arc<dyn AlarmActions>, action: RuleAction) -> bool {
        let now = self.clock.now();
        debug!(
            kind = action.kind(),
            alarm_id = action.alarm_id(),
            "Executing rule action"
        );
        let result = match &action {
            RuleAction::Clear { alarm } => service.clear_alarm(alarm, now).await,
            RuleAction::Delete { alarm } => service.delete_alarm(alarm).await,
            RuleAction::CreateTicket { alarm } => service.create_ticket(alarm, now).await,
            RuleAction::UpdateTicket { alarm } => service.update_ticket(alarm, now).await,
            RuleAction::CloseTicket { alarm } => service.close_ticket(alarm, now).await,
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    kind = action.kind(),
                    alarm_id = action.alarm_id(),
                    error = %e,
                    "Rule action failed; will retry on a later cycle"
                );
                false
            }
        }
    }

    fn recover(&self, reason: String) {
        error!(
            reason = %reason,
            "Fatal failure during rule firing; rebuilding working memory from the last snapshot"
        );
        let delta = self.reconciler.rebuild();
        info!(
            facts = self.reconciler.fact_count(),
            added = delta.added,
            "Working memory rebuilt"
        );
        self.forwarder.forward(DomainEvent::EngineRecovered { reason });
    }

    fn current_service(&self) -> Option<Arc<dyn AlarmActions>> {
        self.service.read().as_ref().and_then(Weak::upgrade)
    }
}
