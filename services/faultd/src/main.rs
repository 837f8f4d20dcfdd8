//! Fault management daemon (faultd)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use fault_model::EventForwarder;
use fault_rules::{Clock, RuleSettings, SystemClock, TemporalRuleEngine};
use fault_store::{AlarmStore, MemoryAlarmStore};
use tracing::{info, warn};

use faultd::{
    AlarmService, FaultdConfig, ListenerManager, LoggingEventForwarder, NullTicketer,
    RuleEngineListener, Ticketer,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting fault management daemon...");

    let config = FaultdConfig::load()?;

    let rule_settings = match &config.engine.settings_file {
        Some(path) => RuleSettings::from_yaml_file(path)?,
        None => RuleSettings::default(),
    };

    let store: Arc<dyn AlarmStore> = Arc::new(MemoryAlarmStore::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let forwarder: Arc<dyn EventForwarder> = Arc::new(LoggingEventForwarder);

    let ticketer: Arc<dyn Ticketer> = Arc::new(NullTicketer);
    if config.ticketing.enabled {
        warn!("Ticketing enabled in config but no integration is wired; tickets stay disabled");
    }

    let manager = Arc::new(ListenerManager::new(
        store.clone(),
        Duration::from_secs(config.poller.interval_secs),
    ));
    let engine = Arc::new(TemporalRuleEngine::new(
        clock,
        rule_settings,
        forwarder.clone(),
        Duration::from_secs(config.engine.tick_interval_secs),
    ));
    let service = AlarmService::new(store, ticketer, forwarder, manager.clone());
    service.register_rule_actions(&engine);

    manager
        .add_listener(Arc::new(RuleEngineListener::new(engine.clone())))
        .await;

    engine.start().await;
    manager.start().await;

    info!("Fault management daemon started");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    manager.stop().await;
    engine.stop().await;

    info!("Fault management daemon stopped");
    Ok(())
}
