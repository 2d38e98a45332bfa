//! Envelopes — the unit of communication between entities.
//!
//! Every envelope carries the logical sender identity and an explicit
//! reply address. Replies never depend on transport context or an implicit
//! call stack: whoever forwards an envelope sets the sender field.

use std::fmt;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::directory::DirectoryAddr;
use crate::error::Reject;
use crate::group::GroupHandle;
use crate::types::{FileRef, GroupName, UserName};

// ── EndpointHandle ───────────────────────────────────────────────────────

/// The opaque deliverable address of one Session Endpoint.
///
/// Cheap to clone; equality is by identity, not by channel. Delivery is
/// best-effort at-most-once: an event for a closed endpoint is dropped.
#[derive(Clone)]
pub struct EndpointHandle {
    id: Uuid,
    tx: mpsc::Sender<ClientEvent>,
}

impl EndpointHandle {
    /// Allocate a fresh endpoint mailbox.
    ///
    /// Returns the address plus the receiving half the session transport
    /// drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ClientEvent>) {
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

    /// Deliver an event to the endpoint.
    ///
    /// Never blocks: an event for a closed or full mailbox is dropped so a
    /// slow session cannot stall the delivering loop.
    pub fn deliver(&self, event: ClientEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(endpoint = %self.id, "dropped event for closed endpoint");
            }
            Err(TrySendError::Full(_)) => {
                tracing::debug!(endpoint = %self.id, "dropped event for full endpoint");
            }
        }
    }
}

impl PartialEq for EndpointHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EndpointHandle {}

impl fmt::Debug for EndpointHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EndpointHandle({})", self.id)
    }
}

// ── Envelope ─────────────────────────────────────────────────────────────

/// A request envelope addressed to the directory.
///
/// `from` is the logical sender identity; `reply` is where rejections and
/// acknowledgements for this request go.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub from: UserName,
    pub reply: EndpointHandle,
    pub request: Request,
}

impl Envelope {
    pub fn new(from: impl Into<UserName>, reply: EndpointHandle, request: Request) -> Self {
        Self {
            from: from.into(),
            reply,
            request,
        }
    }
}

/// Request payloads a session endpoint may send to the directory.
///
/// For `Connect` and `Disconnect` the user name is the envelope's `from`;
/// the envelope's `reply` is the endpoint being registered.
#[derive(Debug, Clone)]
pub enum Request {
    Connect,
    Disconnect,
    PrivateText { target: UserName, body: String },
    PrivateFile { target: UserName, file: FileRef },
    CreateGroup { group: GroupName },
    LeaveGroup { group: GroupName },
    GroupText { group: GroupName, body: String },
    GroupFile { group: GroupName, file: FileRef },
    Invite { group: GroupName, target: UserName },
    RemoveFromGroup { group: GroupName, target: UserName },
    CloseGroup { group: GroupName },
    AddCoadmin { group: GroupName, target: UserName },
    RemoveCoadmin { group: GroupName, target: UserName },
    Mute { group: GroupName, target: UserName },
    Unmute { group: GroupName, target: UserName },
}

// ── ClientEvent ──────────────────────────────────────────────────────────

/// Events delivered to a session endpoint.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Connection accepted; carries the directory's own address for
    /// subsequent requests.
    ConnectAck { directory: DirectoryAddr },
    /// Disconnect echoed back to the departing session.
    Disconnected { user: UserName },
    /// A rejection or informational notice.
    Notification { text: String },
    PrivateText { from: UserName, body: String },
    PrivateFile { from: UserName, file: FileRef },
    GroupText {
        group: GroupName,
        from: UserName,
        body: String,
    },
    GroupFile {
        group: GroupName,
        from: UserName,
        file: FileRef,
    },
    /// Group creation confirmed; carries the coordinator address.
    CreateGroupApprove {
        group: GroupName,
        coordinator: GroupHandle,
    },
}

impl From<Reject> for ClientEvent {
    fn from(reject: Reject) -> Self {
        ClientEvent::Notification {
            text: reject.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_MAILBOX_CAPACITY;

    #[test]
    fn endpoint_equality_is_by_identity() {
        let (a, _rx_a) = EndpointHandle::channel(DEFAULT_MAILBOX_CAPACITY);
        let (b, _rx_b) = EndpointHandle::channel(DEFAULT_MAILBOX_CAPACITY);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn deliver_to_closed_endpoint_is_dropped() {
        let (endpoint, rx) = EndpointHandle::channel(1);
        drop(rx);
        // Must not panic or error — best-effort delivery.
        endpoint.deliver(ClientEvent::Notification {
            text: "late".into(),
        });
    }

    #[test]
    fn deliver_never_blocks_on_full_endpoint() {
        let (endpoint, mut rx) = EndpointHandle::channel(1);
        endpoint.deliver(ClientEvent::Notification {
            text: "first".into(),
        });
        // Mailbox is full; this must return immediately and drop.
        endpoint.deliver(ClientEvent::Notification {
            text: "second".into(),
        });

        match rx.try_recv() {
            Ok(ClientEvent::Notification { text }) => assert_eq!(text, "first"),
            other => panic!("expected first notification, got {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn reject_becomes_notification() {
        let event: ClientEvent = Reject::UserNotFound(UserName::from("bob")).into();
        match event {
            ClientEvent::Notification { text } => assert_eq!(text, "bob does not exist!"),
            other => panic!("expected Notification, got {other:?}"),
        }
    }
}
