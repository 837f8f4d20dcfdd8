//! Alarm lifecycle listener registry and snapshot poller.
//!
//! Subscribers receive every alarm transition twice over: synchronously as
//! it happens, and through a periodic full snapshot that reconverges any
//! state a subscriber may have missed. Broadcast runs under the registry
//! read lock; registry mutation takes the write lock. A failing subscriber
//! is logged and never blocks delivery to the others.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use fault_model::{Alarm, AlarmId};
use fault_rules::TemporalRuleEngine;
use fault_store::AlarmStore;
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Subscriber to alarm lifecycle transitions
#[async_trait]
pub trait AlarmLifecycleListener: Send + Sync {
    /// Converge on a full snapshot of the store
    async fn handle_snapshot(&self, alarms: Vec<Alarm>) -> Result<()>;

    /// One alarm was created or updated
    async fn handle_new_or_updated(&self, alarm: Alarm) -> Result<()>;

    /// One alarm was deleted
    async fn handle_deleted(&self, id: AlarmId, reduction_key: &str) -> Result<()>;
}

/// Listener registry plus fixed-period snapshot poller
pub struct ListenerManager {
    listeners: RwLock<Vec<Arc<dyn AlarmLifecycleListener>>>,
    store: Arc<dyn AlarmStore>,
    poll_interval: Duration,
    shutdown: Notify,
    running: AtomicBool,
    poll_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ListenerManager {
    pub fn new(store: Arc<dyn AlarmStore>, poll_interval: Duration) -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            store,
            poll_interval,
            shutdown: Notify::new(),
            running: AtomicBool::new(false),
            poll_handle: Mutex::new(None),
        }
    }

    /// Register a subscriber; registering the same one twice is a no-op
    pub async fn add_listener(&self, listener: Arc<dyn AlarmLifecycleListener>) {
        let mut listeners = self.listeners.write().await;
        if listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            return;
        }
        listeners.push(listener);
    }

    /// Deregister a subscriber; unknown subscribers are ignored
    pub async fn remove_listener(&self, listener: &Arc<dyn AlarmLifecycleListener>) {
        let mut listeners = self.listeners.write().await;
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
    }

    pub async fn listener_count(&self) -> usize {
        self.listeners.read().await.len()
    }

    /// Load the full alarm set and push it to every subscriber.
    ///
    /// Skips the store read entirely when nobody is subscribed. A transient
    /// store failure surfaces as `Err`; the poller logs it and the next tick
    /// proceeds independently.
    pub async fn snapshot_tick(&self) -> Result<()> {
        let listeners = self.current_listeners().await;
        if listeners.is_empty() {
            return Ok(());
        }

        let alarms = self.store.find_all().await?;
        debug!(alarms = alarms.len(), "Pushing snapshot to subscribers");
        for listener in &listeners {
            if let Err(e) = listener.handle_snapshot(alarms.clone()).await {
                error!(error = %e, "Subscriber failed to handle snapshot");
            }
        }
        Ok(())
    }

    /// Fan out one created/updated alarm
    pub async fn broadcast_new_or_updated(&self, alarm: &Alarm) {
        for listener in &self.current_listeners().await {
            if let Err(e) = listener.handle_new_or_updated(alarm.clone()).await {
                error!(id = alarm.id, error = %e, "Subscriber failed to handle alarm update");
            }
        }
    }

    /// Fan out one deletion
    pub async fn broadcast_deleted(&self, id: AlarmId, reduction_key: &str) {
        for listener in &self.current_listeners().await {
            if let Err(e) = listener.handle_deleted(id, reduction_key).await {
                error!(id, error = %e, "Subscriber failed to handle alarm deletion");
            }
        }
    }

    /// Snapshot of the registry; fan-out never holds the lock across a
    /// subscriber call, so a subscriber re-entering the manager cannot
    /// wedge on registry mutation
    async fn current_listeners(&self) -> Vec<Arc<dyn AlarmLifecycleListener>> {
        self.listeners.read().await.clone()
    }

    /// Spawn the snapshot polling loop
    pub async fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Listener manager already running");
            return;
        }
        info!(
            interval_s = self.poll_interval.as_secs(),
            "Starting alarm snapshot poller"
        );

        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(manager.poll_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = manager.snapshot_tick().await {
                            error!(error = %e, "Snapshot tick failed; retrying next cycle");
                        }
                    }
                    _ = manager.shutdown.notified() => {
                        break;
                    }
                }
            }
            debug!("Snapshot poller exited");
        });
        *self.poll_handle.lock().await = Some(handle);
    }

    /// Halt the polling loop and join it before returning
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("Stopping alarm snapshot poller...");
        self.shutdown.notify_one();
        if let Some(handle) = self.poll_handle.lock().await.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "Snapshot poller ended abnormally");
            }
        }
        info!("Alarm snapshot poller stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Subscribes a temporal rule engine to the lifecycle stream
pub struct RuleEngineListener {
    engine: Arc<TemporalRuleEngine>,
}

impl RuleEngineListener {
    pub fn new(engine: Arc<TemporalRuleEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl AlarmLifecycleListener for RuleEngineListener {
    async fn handle_snapshot(&self, alarms: Vec<Alarm>) -> Result<()> {
        self.engine.handle_snapshot(alarms).await;
        Ok(())
    }

    async fn handle_new_or_updated(&self, alarm: Alarm) -> Result<()> {
        self.engine.handle_new_or_updated(alarm).await;
        Ok(())
    }

    async fn handle_deleted(&self, id: AlarmId, _reduction_key: &str) -> Result<()> {
        self.engine.handle_deleted(id).await;
        Ok(())
    }
}
