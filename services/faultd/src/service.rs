//! Alarm service facade.
//!
//! Every operator- or automation-driven transition runs the same way: take
//! the action lock, load the persisted alarm, mutate, commit, then push the
//! result into the lifecycle listeners and forward the outbound event. An
//! alarm that vanished between the caller's read and the transition is
//! treated as already deleted, never as an error.
//!
//! The lock covers only the load-mutate-commit section; fan-out happens
//! after it is released so a rule action re-entering the service cannot
//! wedge on its own transition.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fault_model::{
    Alarm, AlarmEvent, AlarmId, DomainEvent, EventForwarder, Severity, TicketState,
};
use fault_rules::{AlarmActions, TemporalRuleEngine};
use fault_store::AlarmStore;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::listener::ListenerManager;
use crate::ticketer::Ticketer;

/// Serializes alarm transitions across store, working memory and
/// outbound notification
pub struct AlarmService {
    store: Arc<dyn AlarmStore>,
    ticketer: Arc<dyn Ticketer>,
    forwarder: Arc<dyn EventForwarder>,
    listeners: Arc<ListenerManager>,
    action_lock: Mutex<()>,
}

impl AlarmService {
    pub fn new(
        store: Arc<dyn AlarmStore>,
        ticketer: Arc<dyn Ticketer>,
        forwarder: Arc<dyn EventForwarder>,
        listeners: Arc<ListenerManager>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            ticketer,
            forwarder,
            listeners,
            action_lock: Mutex::new(()),
        })
    }

    /// Install this service as the engine's rule action executor
    pub fn register_rule_actions(self: &Arc<Self>, engine: &TemporalRuleEngine) {
        let actions: Arc<dyn AlarmActions> = Arc::clone(self) as Arc<dyn AlarmActions>;
        engine.set_service(&actions);
    }

    /// Reduce one inbound event: create an alarm on first sight of its
    /// reduction key, fold into the existing alarm otherwise.
    pub async fn reduce_event(&self, event: &AlarmEvent) -> Result<Alarm> {
        let (alarm, created) = {
            let _guard = self.action_lock.lock().await;
            match self.store.find_by_reduction_key(&event.reduction_key).await? {
                Some(mut alarm) => {
                    alarm.record_event(event);
                    self.store.update(&alarm).await?;
                    (alarm, false)
                }
                None => {
                    let alarm = self.store.save(Alarm::from_event(event)).await?;
                    (alarm, true)
                }
            }
        };

        if created {
            info!(
                id = alarm.id,
                reduction_key = %alarm.reduction_key,
                severity = ?alarm.severity,
                "Created alarm"
            );
        } else {
            debug!(
                id = alarm.id,
                reduction_key = %alarm.reduction_key,
                counter = alarm.counter,
                "Folded event into existing alarm"
            );
        }

        self.listeners.broadcast_new_or_updated(&alarm).await;
        self.forwarder.forward(if created {
            DomainEvent::AlarmCreated {
                id: alarm.id,
                reduction_key: alarm.reduction_key.clone(),
            }
        } else {
            DomainEvent::AlarmUpdated { id: alarm.id }
        });
        Ok(alarm)
    }

    /// Set the alarm's severity to Cleared
    pub async fn clear_alarm(&self, alarm: &Alarm, when: DateTime<Utc>) -> Result<()> {
        info!(id = alarm.id, severity = ?alarm.severity, "Clearing alarm");
        if let Some(current) = self
            .apply_transition(alarm, "clear", |a| {
                a.severity = Severity::Cleared;
                a.last_automation_time = Some(when);
            })
            .await?
        {
            self.forwarder
                .forward(DomainEvent::AlarmCleared { id: current.id });
        }
        Ok(())
    }

    /// Restore the severity implied by the alarm's latest event
    pub async fn unclear_alarm(&self, alarm: &Alarm) -> Result<()> {
        info!(id = alarm.id, "Un-clearing alarm");
        if let Some(current) = self
            .apply_transition(alarm, "unclear", |a| {
                a.severity = a.last_event_severity;
            })
            .await?
        {
            self.forwarder
                .forward(DomainEvent::AlarmUncleared { id: current.id });
        }
        Ok(())
    }

    /// Acknowledge the alarm for the given user
    pub async fn acknowledge_alarm(
        &self,
        alarm: &Alarm,
        user: &str,
        when: DateTime<Utc>,
    ) -> Result<()> {
        info!(id = alarm.id, user, "Acknowledging alarm");
        if let Some(current) = self
            .apply_transition(alarm, "acknowledge", |a| {
                a.acknowledge(user, when);
            })
            .await?
        {
            self.forwarder.forward(DomainEvent::AlarmAcknowledged {
                id: current.id,
                user: user.to_string(),
            });
        }
        Ok(())
    }

    /// Drop the alarm's acknowledgment
    pub async fn unacknowledge_alarm(&self, alarm: &Alarm) -> Result<()> {
        info!(id = alarm.id, "Un-acknowledging alarm");
        if let Some(current) = self
            .apply_transition(alarm, "unacknowledge", |a| {
                a.unacknowledge();
            })
            .await?
        {
            self.forwarder
                .forward(DomainEvent::AlarmUnacknowledged { id: current.id });
        }
        Ok(())
    }

    /// Remove the alarm from the store and working memory
    pub async fn delete_alarm(&self, alarm: &Alarm) -> Result<()> {
        info!(id = alarm.id, severity = ?alarm.severity, "Deleting alarm");
        let existed = {
            let _guard = self.action_lock.lock().await;
            self.store.delete(alarm.id).await?
        };
        if !existed {
            debug!(id = alarm.id, "Alarm was already gone");
        }
        self.listeners
            .broadcast_deleted(alarm.id, &alarm.reduction_key)
            .await;
        self.forwarder.forward(DomainEvent::AlarmDeleted {
            id: alarm.id,
            reduction_key: alarm.reduction_key.clone(),
        });
        Ok(())
    }

    /// Record a cause/impact relation between two alarms; both sides are
    /// committed in one transaction
    pub async fn associate(&self, cause_id: AlarmId, impacted_id: AlarmId) -> Result<()> {
        info!(cause_id, impacted_id, "Associating cause and impact");
        let (cause, impacted) = {
            let _guard = self.action_lock.lock().await;
            let Some(mut cause) = self.store.get(cause_id).await? else {
                bail!("cannot associate: alarm {cause_id} does not exist");
            };
            let Some(mut impacted) = self.store.get(impacted_id).await? else {
                bail!("cannot associate: alarm {impacted_id} does not exist");
            };
            cause.add_impact(impacted_id)?;
            impacted.add_cause(cause_id)?;
            self.store
                .update_all(&[cause.clone(), impacted.clone()])
                .await?;
            (cause, impacted)
        };

        self.listeners.broadcast_new_or_updated(&cause).await;
        self.listeners.broadcast_new_or_updated(&impacted).await;
        self.forwarder
            .forward(DomainEvent::AlarmUpdated { id: cause_id });
        self.forwarder
            .forward(DomainEvent::AlarmUpdated { id: impacted_id });
        Ok(())
    }

    /// Request a trouble ticket for the alarm
    pub async fn create_ticket(&self, alarm: &Alarm, when: DateTime<Utc>) -> Result<()> {
        if !self.ticketer.is_enabled() {
            warn!(id = alarm.id, "No ticketing system enabled; skipping ticket creation");
            return Ok(());
        }
        info!(id = alarm.id, "Requesting trouble ticket");
        let Some(current) = self
            .apply_transition(alarm, "create-ticket", |a| {
                a.ticket_state = TicketState::CreatePending;
                a.last_automation_time = Some(when);
            })
            .await?
        else {
            return Ok(());
        };
        if let Err(e) = self.ticketer.create_ticket(&current).await {
            warn!(id = current.id, error = %e, "Ticket creation request failed; state stays pending");
        }
        self.forwarder
            .forward(DomainEvent::TicketCreateRequested { id: current.id });
        Ok(())
    }

    /// Push the alarm's latest state into its open ticket
    pub async fn update_ticket(&self, alarm: &Alarm, when: DateTime<Utc>) -> Result<()> {
        if !self.ticketer.is_enabled() {
            warn!(id = alarm.id, "No ticketing system enabled; skipping ticket update");
            return Ok(());
        }
        info!(id = alarm.id, "Requesting ticket update");
        let Some(current) = self
            .apply_transition(alarm, "update-ticket", |a| {
                a.ticket_state = TicketState::UpdatePending;
                a.last_automation_time = Some(when);
            })
            .await?
        else {
            return Ok(());
        };
        if let Err(e) = self.ticketer.update_ticket(&current).await {
            warn!(id = current.id, error = %e, "Ticket update request failed");
        }
        self.forwarder
            .forward(DomainEvent::TicketUpdateRequested { id: current.id });
        Ok(())
    }

    /// Close the alarm's ticket
    pub async fn close_ticket(&self, alarm: &Alarm, when: DateTime<Utc>) -> Result<()> {
        if !self.ticketer.is_enabled() {
            warn!(id = alarm.id, "No ticketing system enabled; skipping ticket close");
            return Ok(());
        }
        info!(id = alarm.id, "Closing trouble ticket");
        let Some(current) = self
            .apply_transition(alarm, "close-ticket", |a| {
                a.ticket_state = TicketState::Closed;
                a.last_automation_time = Some(when);
            })
            .await?
        else {
            return Ok(());
        };
        if let Err(e) = self.ticketer.close_ticket(&current).await {
            warn!(id = current.id, error = %e, "Ticket close request failed");
        }
        self.forwarder
            .forward(DomainEvent::TicketCloseRequested { id: current.id });
        Ok(())
    }

    /// Ticketing-system callback: the ticket now exists
    pub async fn on_ticket_created(&self, id: AlarmId, ticket_id: &str) -> Result<()> {
        info!(id, ticket_id, "Ticket created");
        self.apply_callback(id, |a| {
            a.ticket_state = TicketState::Open;
            a.ticket_id = Some(ticket_id.to_string());
        })
        .await
    }

    /// Ticketing-system callback: the ticket absorbed the update
    pub async fn on_ticket_updated(&self, id: AlarmId) -> Result<()> {
        info!(id, "Ticket updated");
        self.apply_callback(id, |a| {
            a.ticket_state = TicketState::Open;
        })
        .await
    }

    /// Ticketing-system callback: the ticket was closed (possibly by an
    /// operator on the ticketing side)
    pub async fn on_ticket_closed(&self, id: AlarmId) -> Result<()> {
        info!(id, "Ticket closed");
        self.apply_callback(id, |a| {
            a.ticket_state = TicketState::Closed;
        })
        .await
    }

    /// Load, mutate and commit one alarm, then broadcast the result.
    /// Returns `None` when the alarm vanished, after converging working
    /// memory on the deletion.
    async fn apply_transition<F>(
        &self,
        alarm: &Alarm,
        op: &'static str,
        mutate: F,
    ) -> Result<Option<Alarm>>
    where
        F: FnOnce(&mut Alarm),
    {
        let updated = {
            let _guard = self.action_lock.lock().await;
            match self.store.get(alarm.id).await? {
                None => None,
                Some(mut current) => {
                    mutate(&mut current);
                    self.store.update(&current).await?;
                    Some(current)
                }
            }
        };

        match &updated {
            Some(current) => self.listeners.broadcast_new_or_updated(current).await,
            None => {
                warn!(id = alarm.id, op, "Alarm disappeared; treating as already deleted");
                self.listeners
                    .broadcast_deleted(alarm.id, &alarm.reduction_key)
                    .await;
            }
        }
        Ok(updated)
    }

    /// Like `apply_transition`, for callbacks that only carry the alarm id
    async fn apply_callback<F>(&self, id: AlarmId, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Alarm),
    {
        let updated = {
            let _guard = self.action_lock.lock().await;
            match self.store.get(id).await? {
                None => None,
                Some(mut current) => {
                    mutate(&mut current);
                    self.store.update(&current).await?;
                    Some(current)
                }
            }
        };

        match updated {
            Some(current) => {
                self.listeners.broadcast_new_or_updated(&current).await;
                self.forwarder.forward(DomainEvent::AlarmUpdated { id });
            }
            None => warn!(id, "Ticket callback for vanished alarm; ignoring"),
        }
        Ok(())
    }
}

#[async_trait]
impl AlarmActions for AlarmService {
    fn is_ticketing_enabled(&self) -> bool {
        self.ticketer.is_enabled()
    }

    async fn clear_alarm(&self, alarm: &Alarm, when: DateTime<Utc>) -> Result<()> {
        AlarmService::clear_alarm(self, alarm, when).await
    }

    async fn delete_alarm(&self, alarm: &Alarm) -> Result<()> {
        AlarmService::delete_alarm(self, alarm).await
    }

    async fn create_ticket(&self, alarm: &Alarm, when: DateTime<Utc>) -> Result<()> {
        AlarmService::create_ticket(self, alarm, when).await
    }

    async fn update_ticket(&self, alarm: &Alarm, when: DateTime<Utc>) -> Result<()> {
        AlarmService::update_ticket(self, alarm, when).await
    }

    async fn close_ticket(&self, alarm: &Alarm, when: DateTime<Utc>) -> Result<()> {
        AlarmService::close_ticket(self, alarm, when).await
    }
}
