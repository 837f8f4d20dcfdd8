//! Store error types

use fault_model::AlarmId;
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Alarm store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend is temporarily unreachable; callers skip the cycle and retry
    #[error("Alarm store unavailable: {0}")]
    Unavailable(String),

    /// Update or delete referenced an alarm that no longer exists
    #[error("Alarm not found: {0}")]
    NotFound(AlarmId),

    /// Reduction keys are unique among non-deleted alarms
    #[error("Reduction key already in use: {0}")]
    DuplicateReductionKey(String),

    /// The alarm is in no state to be stored (e.g. saving an already-saved one)
    #[error("Invalid alarm for this operation: {0}")]
    InvalidAlarm(String),
}

impl StoreError {
    /// True for failures worth retrying on the next cycle
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}
