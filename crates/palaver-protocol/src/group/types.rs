use std::fmt;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::envelope::{ClientEvent, EndpointHandle};
use crate::types::{FileRef, UserName};

// ── GroupHandle ──────────────────────────────────────────────────────────

/// Address of a group coordinator's mailbox.
///
/// Cheap to clone; equality is by identity. The UUID lets the directory
/// distinguish a dissolved coordinator from a newer one registered under
/// the same group name.
#[derive(Clone)]
pub struct GroupHandle {
    id: Uuid,
    tx: mpsc::Sender<GroupOp>,
}

impl GroupHandle {
    /// Allocate a fresh coordinator mailbox.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<GroupOp>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Forward an operation to the coordinator.
    ///
    /// Never blocks: an op for a stopped or saturated coordinator is
    /// dropped.
    pub fn forward(&self, op: GroupOp) {
        match self.tx.try_send(op) {
            Ok(()) => {}
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(coordinator = %self.id, "dropped op for stopped coordinator");
            }
            Err(TrySendError::Full(_)) => {
                tracing::debug!(coordinator = %self.id, "dropped op for saturated coordinator");
            }
        }
    }
}

impl PartialEq for GroupHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GroupHandle {}

impl fmt::Debug for GroupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupHandle({})", self.id)
    }
}

// ── GroupOp ──────────────────────────────────────────────────────────────

/// Operations forwarded from the directory to a coordinator.
///
/// Enriched at forward time: the directory sets the sender identity and
/// reply address, and for targeted operations resolves the target's
/// endpoint from its registry. The coordinator performs authorization;
/// the directory performed only existence checks.
#[derive(Debug, Clone)]
pub enum GroupOp {
    Leave {
        sender: UserName,
        reply: EndpointHandle,
    },
    Text {
        sender: UserName,
        reply: EndpointHandle,
        body: String,
    },
    File {
        sender: UserName,
        reply: EndpointHandle,
        file: FileRef,
    },
    Invite {
        sender: UserName,
        reply: EndpointHandle,
        target: UserName,
        target_endpoint: EndpointHandle,
    },
    Remove {
        sender: UserName,
        reply: EndpointHandle,
        target: UserName,
        target_endpoint: EndpointHandle,
    },
    AddCoadmin {
        sender: UserName,
        reply: EndpointHandle,
        target: UserName,
        target_endpoint: EndpointHandle,
    },
    RemoveCoadmin {
        sender: UserName,
        reply: EndpointHandle,
        target: UserName,
        target_endpoint: EndpointHandle,
    },
    Mute {
        sender: UserName,
        reply: EndpointHandle,
        target: UserName,
        target_endpoint: EndpointHandle,
    },
    Unmute {
        sender: UserName,
        reply: EndpointHandle,
        target: UserName,
        target_endpoint: EndpointHandle,
    },
    /// Directory-initiated close; the registry entry is already gone.
    Close {
        sender: UserName,
        reply: EndpointHandle,
    },
}

// ── GroupAction ──────────────────────────────────────────────────────────

/// Actions returned by the coordinator — the runtime loop executes them.
///
/// Pure decision engine pattern, same as `Directory` → `DirectoryAction`.
#[derive(Debug)]
pub enum GroupAction {
    /// Deliver an event to a session endpoint.
    Deliver {
        to: EndpointHandle,
        event: ClientEvent,
    },
    /// The last member left; the loop must deregister the group and stop.
    Dissolve,
    /// The group was closed; the loop must stop.
    Stop,
}
