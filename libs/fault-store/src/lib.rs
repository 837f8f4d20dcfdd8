//! Alarm persistence for the fault management daemon.
//!
//! The [`AlarmStore`] trait is the seam between the reconciliation core and
//! whatever durable backend a deployment wires in. Every trait method is a
//! single transaction. [`MemoryAlarmStore`] is the in-process implementation
//! used by the daemon's default configuration and by tests.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryAlarmStore;
pub use traits::AlarmStore;
