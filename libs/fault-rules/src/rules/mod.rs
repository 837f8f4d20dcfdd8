//! The temporal rule set.
//!
//! Each rule is a pure decision step: it inspects the fact table, the
//! current settings and the evaluation context, and returns the actions
//! whose conditions hold. Rules never mutate facts or touch the store
//! directly. The engine evaluates all rules every pass, in the stable order
//! returned by [`default_rules`].

pub mod clear;
pub mod gc;
pub mod ticket;

use chrono::{DateTime, Utc};

use crate::actions::RuleAction;
use crate::error::RuleResult;
use crate::facts::FactTable;
use crate::settings::RuleSettings;

pub use clear::{ClearByKeyRule, ClearOnTicketClosedRule};
pub use gc::GarbageCollectRule;
pub use ticket::{CloseTicketOnClearRule, CreateTicketRule, UpdateTicketRule};

/// Per-pass evaluation context
#[derive(Debug, Clone, Copy)]
pub struct EvalContext {
    /// Session time for this pass
    pub now: DateTime<Utc>,
    /// Whether a ticketing system is wired and enabled
    pub ticketing_enabled: bool,
}

/// One condition/action rule over the fact table
pub trait TemporalRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Return the actions whose conditions hold for the current facts
    fn evaluate(
        &self,
        facts: &FactTable,
        settings: &RuleSettings,
        ctx: &EvalContext,
    ) -> RuleResult<Vec<RuleAction>>;
}

/// The standard rule set, in firing order
pub fn default_rules() -> Vec<Box<dyn TemporalRule>> {
    vec![
        Box::new(ClearByKeyRule),
        Box::new(GarbageCollectRule),
        Box::new(CreateTicketRule),
        Box::new(UpdateTicketRule),
        Box::new(CloseTicketOnClearRule),
        Box::new(ClearOnTicketClosedRule),
    ]
}
