//! Working-memory reconciliation and temporal rule evaluation.
//!
//! The [`ReconciliationEngine`] keeps an id-keyed fact table converged
//! against the authoritative alarm store, via full snapshots or single-alarm
//! updates. The [`TemporalRuleEngine`] evaluates an ordered list of
//! condition/action rules over that table and a pluggable [`Clock`],
//! executing the resulting actions through the [`AlarmActions`] seam.

pub mod actions;
pub mod clock;
pub mod engine;
pub mod error;
pub mod facts;
pub mod reconcile;
pub mod rules;
pub mod settings;

pub use actions::{AlarmActions, RuleAction};
pub use clock::{Clock, PseudoClock, SystemClock};
pub use engine::TemporalRuleEngine;
pub use error::{RuleError, RuleResult};
pub use facts::{AlarmFact, FactHandle, FactTable};
pub use reconcile::{ReconciliationEngine, SnapshotDelta, UpdateOutcome};
pub use rules::{default_rules, EvalContext, TemporalRule};
pub use settings::RuleSettings;
