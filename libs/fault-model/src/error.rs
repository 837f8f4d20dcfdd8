//! Domain model error types

use thiserror::Error;

use crate::types::AlarmId;

/// Errors raised by alarm domain operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// An alarm may not cause or impact itself
    #[error("Alarm {0} cannot be related to itself")]
    SelfReferentialRelation(AlarmId),

    /// Relation endpoints must be persisted before they can be linked
    #[error("Alarm has no assigned id yet; save it before associating")]
    UnsavedRelationEndpoint,
}
