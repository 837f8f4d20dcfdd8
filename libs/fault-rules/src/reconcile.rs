//! Convergence of working memory against the authoritative alarm set.
//!
//! Two protocols keep the fact table in sync with the store: full snapshot
//! reconciliation (periodic poll) and single-alarm incremental updates
//! (synchronous notifications). Both serialize on one fact-table lock; the
//! table has a single logical writer.

use std::collections::{HashMap, HashSet};

use fault_model::{Alarm, AlarmId};
use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::facts::FactTable;

/// What a snapshot pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotDelta {
    pub added: usize,
    pub removed: usize,
    pub reinserted: usize,
    pub updated: usize,
}

/// How an incremental update was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The alarm was new to working memory
    Inserted,
    /// Same `last_event_time`: the fact was refreshed under its handle
    UpdatedInPlace,
    /// `last_event_time` moved: old fact retracted, new one inserted
    Reinserted,
}

/// Keeps the fact table converged with the alarm store
pub struct ReconciliationEngine {
    facts: Mutex<FactTable>,
    last_snapshot: Mutex<Vec<Alarm>>,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self {
            facts: Mutex::new(FactTable::new()),
            last_snapshot: Mutex::new(Vec::new()),
        }
    }

    /// Lock the fact table for rule evaluation or inspection
    pub fn facts(&self) -> MutexGuard<'_, FactTable> {
        self.facts.lock()
    }

    /// Converge working memory onto a full snapshot of the store.
    ///
    /// Removals are applied first, then insertions, then retouches of the
    /// ids present on both sides. A retouched alarm is retracted and
    /// reinserted only when its `last_event_time` changed; otherwise the
    /// fact is refreshed in place and keeps its handle.
    pub fn apply_snapshot(&self, alarms: Vec<Alarm>) -> SnapshotDelta {
        let mut delta = SnapshotDelta::default();
        let in_store: HashMap<AlarmId, &Alarm> = alarms
            .iter()
            .filter(|a| a.id != 0)
            .map(|a| (a.id, a))
            .collect();

        {
            let mut facts = self.facts.lock();
            let in_memory: HashSet<AlarmId> = facts.ids().collect();

            let to_remove: Vec<AlarmId> = in_memory
                .iter()
                .filter(|id| !in_store.contains_key(id))
                .copied()
                .collect();
            for id in to_remove {
                facts.retract(id);
                delta.removed += 1;
            }

            for (id, alarm) in &in_store {
                if !in_memory.contains(id) {
                    facts.insert((*alarm).clone());
                    delta.added += 1;
                }
            }

            for (id, alarm) in &in_store {
                if !in_memory.contains(id) {
                    continue;
                }
                let known_time = facts.get(*id).map(|f| f.alarm.last_event_time);
                if known_time == Some(alarm.last_event_time) {
                    facts.update_in_place((*alarm).clone());
                    delta.updated += 1;
                } else {
                    facts.retract(*id);
                    facts.insert((*alarm).clone());
                    delta.reinserted += 1;
                }
            }
        }

        debug!(
            snapshot = alarms.len(),
            added = delta.added,
            removed = delta.removed,
            reinserted = delta.reinserted,
            updated = delta.updated,
            "Reconciled snapshot"
        );
        *self.last_snapshot.lock() = alarms;
        delta
    }

    /// Converge working memory onto one updated alarm
    pub fn apply_update(&self, alarm: Alarm) -> UpdateOutcome {
        let mut facts = self.facts.lock();
        match facts.get(alarm.id) {
            None => {
                facts.insert(alarm);
                UpdateOutcome::Inserted
            }
            Some(fact) if fact.alarm.last_event_time == alarm.last_event_time => {
                facts.update_in_place(alarm);
                UpdateOutcome::UpdatedInPlace
            }
            Some(_) => {
                facts.retract(alarm.id);
                facts.insert(alarm);
                UpdateOutcome::Reinserted
            }
        }
    }

    /// Drop one alarm from working memory; returns whether it was present
    pub fn apply_delete(&self, id: AlarmId) -> bool {
        self.facts.lock().retract(id).is_some()
    }

    /// The most recent full snapshot seen (synchronized copy)
    pub fn last_known_snapshot(&self) -> Vec<Alarm> {
        self.last_snapshot.lock().clone()
    }

    /// Tear the fact table down and re-reconcile from the last known snapshot
    pub fn rebuild(&self) -> SnapshotDelta {
        let snapshot = self.last_known_snapshot();
        self.facts.lock().clear();
        self.apply_snapshot(snapshot)
    }

    /// Number of facts currently in working memory
    pub fn fact_count(&self) -> usize {
        self.facts.lock().len()
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}
