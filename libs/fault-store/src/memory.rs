//! In-memory alarm store implementation.
//!
//! A single lock guards the alarm table and the reduction-key index so the
//! uniqueness invariant holds across both. Suited to embedded deployments
//! and tests; durable backends implement the same trait.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use fault_model::{Alarm, AlarmId};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::AlarmStore;

#[derive(Default)]
struct Tables {
    alarms: HashMap<AlarmId, Alarm>,
    by_reduction_key: HashMap<String, AlarmId>,
    next_id: AlarmId,
}

/// In-memory alarm store
pub struct MemoryAlarmStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl MemoryAlarmStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                alarms: HashMap::new(),
                by_reduction_key: HashMap::new(),
                next_id: 1,
            }),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Simulate a backend outage (useful for testing transient failures)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        let mut tables = self.tables.write();
        tables.alarms.clear();
        tables.by_reduction_key.clear();
    }

    /// Number of stored alarms
    pub fn len(&self) -> usize {
        self.tables.read().alarms.len()
    }

    /// True when no alarms are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryAlarmStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlarmStore for MemoryAlarmStore {
    async fn find_all(&self) -> StoreResult<Vec<Alarm>> {
        self.check_available()?;
        Ok(self.tables.read().alarms.values().cloned().collect())
    }

    async fn get(&self, id: AlarmId) -> StoreResult<Option<Alarm>> {
        self.check_available()?;
        Ok(self.tables.read().alarms.get(&id).cloned())
    }

    async fn find_by_reduction_key(&self, key: &str) -> StoreResult<Option<Alarm>> {
        self.check_available()?;
        let tables = self.tables.read();
        Ok(tables
            .by_reduction_key
            .get(key)
            .and_then(|id| tables.alarms.get(id))
            .cloned())
    }

    async fn save(&self, mut alarm: Alarm) -> StoreResult<Alarm> {
        self.check_available()?;
        if alarm.id != 0 {
            return Err(StoreError::InvalidAlarm(format!(
                "alarm already has id {}",
                alarm.id
            )));
        }

        let mut tables = self.tables.write();
        if tables.by_reduction_key.contains_key(&alarm.reduction_key) {
            return Err(StoreError::DuplicateReductionKey(
                alarm.reduction_key.clone(),
            ));
        }

        alarm.id = tables.next_id;
        tables.next_id += 1;
        tables
            .by_reduction_key
            .insert(alarm.reduction_key.clone(), alarm.id);
        tables.alarms.insert(alarm.id, alarm.clone());

        debug!(id = alarm.id, reduction_key = %alarm.reduction_key, "Stored new alarm");
        Ok(alarm)
    }

    async fn update(&self, alarm: &Alarm) -> StoreResult<()> {
        self.check_available()?;
        let mut tables = self.tables.write();
        let Some(existing) = tables.alarms.get(&alarm.id) else {
            return Err(StoreError::NotFound(alarm.id));
        };

        if existing.reduction_key != alarm.reduction_key {
            if tables.by_reduction_key.contains_key(&alarm.reduction_key) {
                return Err(StoreError::DuplicateReductionKey(
                    alarm.reduction_key.clone(),
                ));
            }
            let old_key = existing.reduction_key.clone();
            tables.by_reduction_key.remove(&old_key);
            tables
                .by_reduction_key
                .insert(alarm.reduction_key.clone(), alarm.id);
        }

        tables.alarms.insert(alarm.id, alarm.clone());
        Ok(())
    }

    async fn update_all(&self, alarms: &[Alarm]) -> StoreResult<()> {
        self.check_available()?;
        let mut tables = self.tables.write();
        for alarm in alarms {
            if !tables.alarms.contains_key(&alarm.id) {
                return Err(StoreError::NotFound(alarm.id));
            }
        }
        for alarm in alarms {
            tables.alarms.insert(alarm.id, alarm.clone());
        }
        Ok(())
    }

    async fn delete(&self, id: AlarmId) -> StoreResult<bool> {
        self.check_available()?;
        let mut tables = self.tables.write();
        match tables.alarms.remove(&id) {
            Some(alarm) => {
                tables.by_reduction_key.remove(&alarm.reduction_key);
                debug!(id, reduction_key = %alarm.reduction_key, "Deleted alarm");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
