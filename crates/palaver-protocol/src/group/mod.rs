//! Per-group coordination.
//!
//! One coordinator per active group, owning membership, roles, and mute
//! state. Pure state machine — no I/O; the runtime loop executes the
//! returned actions.

pub mod coordinator;
pub mod types;

pub use coordinator::GroupCoordinator;
pub use types::{GroupAction, GroupHandle, GroupOp};
