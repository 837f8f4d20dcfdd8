//! Trait definitions for the alarm store abstraction

use async_trait::async_trait;
use fault_model::{Alarm, AlarmId};

use crate::error::StoreResult;

/// Transactional CRUD over persisted alarms.
///
/// Each method executes as one transaction in the implementation, so callers
/// observe either the state before or after a call, never a partial write.
///
/// Implementations:
/// - `MemoryAlarmStore`: in-process table, the default backend and test double
#[async_trait]
pub trait AlarmStore: Send + Sync + 'static {
    /// Load every non-deleted alarm
    async fn find_all(&self) -> StoreResult<Vec<Alarm>>;

    /// Load one alarm by id; `None` when it no longer exists
    async fn get(&self, id: AlarmId) -> StoreResult<Option<Alarm>>;

    /// Load one alarm by reduction key
    async fn find_by_reduction_key(&self, key: &str) -> StoreResult<Option<Alarm>>;

    /// Persist a new alarm, assigning its id; returns the stored copy
    async fn save(&self, alarm: Alarm) -> StoreResult<Alarm>;

    /// Overwrite an existing alarm
    async fn update(&self, alarm: &Alarm) -> StoreResult<()>;

    /// Overwrite several existing alarms in one transaction
    async fn update_all(&self, alarms: &[Alarm]) -> StoreResult<()>;

    /// Delete an alarm; returns whether it existed
    async fn delete(&self, id: AlarmId) -> StoreResult<bool>;
}
