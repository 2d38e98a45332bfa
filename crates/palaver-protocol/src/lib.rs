//! Palaver coordination core.
//!
//! Implements the central user directory and per-group coordinators for a
//! chat service: connection identity, private routing, group membership,
//! roles (admin / co-admin), and muting.
//!
//! Each entity is a state machine driven by a single tokio task with a
//! bounded mailbox, so all state is mutated serially and without locks.
//! Transport, wire encoding, authentication, and persistence live outside
//! this crate; sessions plug in via channel endpoints.

pub mod directory;
pub mod envelope;
pub mod error;
pub mod group;
pub mod runtime;
pub mod types;

pub use directory::{Directory, DirectoryAction, DirectoryAddr, DirectoryMsg};
pub use envelope::{ClientEvent, EndpointHandle, Envelope, Request};
pub use error::{PalaverError, Reject};
pub use group::{GroupAction, GroupCoordinator, GroupHandle, GroupOp};
pub use runtime::{CoordinationRuntime, RuntimeConfig, Session};
pub use types::{FileRef, GroupName, UserName, DEFAULT_MAILBOX_CAPACITY};
