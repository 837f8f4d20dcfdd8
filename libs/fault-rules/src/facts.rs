//! The fact table: working memory of alarms under rule evaluation.
//!
//! Each alarm present in working memory is represented by exactly one live
//! [`FactHandle`]. Handles are never reused; retracting and reinserting an
//! alarm yields a fresh handle, which is how time-keyed state is invalidated
//! when `last_event_time` moves.

use std::collections::HashMap;

use fault_model::{Alarm, AlarmId};

/// Opaque token for one alarm's presence in working memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FactHandle(u64);

/// An alarm together with its working-memory handle
#[derive(Debug, Clone)]
pub struct AlarmFact {
    pub handle: FactHandle,
    pub alarm: Alarm,
}

/// Id-keyed table of alarm facts
#[derive(Debug, Default)]
pub struct FactTable {
    facts: HashMap<AlarmId, AlarmFact>,
    next_handle: u64,
}

impl FactTable {
    pub fn new() -> Self {
        Self {
            facts: HashMap::new(),
            next_handle: 1,
        }
    }

    /// Insert an alarm under a fresh handle, replacing any previous fact
    pub fn insert(&mut self, alarm: Alarm) -> FactHandle {
        let handle = FactHandle(self.next_handle);
        self.next_handle += 1;
        self.facts.insert(alarm.id, AlarmFact { handle, alarm });
        handle
    }

    /// Replace the alarm behind an existing fact, keeping its handle.
    /// Returns the retained handle, or `None` when the id is not present.
    pub fn update_in_place(&mut self, alarm: Alarm) -> Option<FactHandle> {
        let fact = self.facts.get_mut(&alarm.id)?;
        fact.alarm = alarm;
        Some(fact.handle)
    }

    /// Remove an alarm from working memory
    pub fn retract(&mut self, id: AlarmId) -> Option<AlarmFact> {
        self.facts.remove(&id)
    }

    pub fn get(&self, id: AlarmId) -> Option<&AlarmFact> {
        self.facts.get(&id)
    }

    pub fn contains(&self, id: AlarmId) -> bool {
        self.facts.contains_key(&id)
    }

    pub fn handle_of(&self, id: AlarmId) -> Option<FactHandle> {
        self.facts.get(&id).map(|f| f.handle)
    }

    pub fn ids(&self) -> impl Iterator<Item = AlarmId> + '_ {
        self.facts.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlarmFact> {
        self.facts.values()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn clear(&mut self) {
        self.facts.clear();
    }
}
