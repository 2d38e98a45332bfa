//! Coordination runtime — hosts the directory and coordinator tasks.
//!
//! One tokio task per entity, each draining a bounded mailbox so its state
//! is mutated by exactly one task. The application talks to the runtime
//! through [`Session`], a channel-based API that never touches registry
//! internals.
mod r#loop;

use tokio::sync::mpsc;

use crate::directory::{Directory, DirectoryAddr, DirectoryMsg};
use crate::envelope::{ClientEvent, EndpointHandle, Envelope, Request};
use crate::error::PalaverError;
use crate::types::{FileRef, GroupName, UserName, DEFAULT_MAILBOX_CAPACITY};

// ── Configuration ─────────────────────────────────────────────────────

/// Configuration for the coordination runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Capacity of every entity mailbox (directory, coordinators,
    /// session endpoints spawned by the runtime).
    pub mailbox_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

// ── CoordinationRuntime ──────────────────────────────────────────────

/// The coordination runtime — spawn it and communicate via sessions.
pub struct CoordinationRuntime;

impl CoordinationRuntime {
    /// Start the directory task and return its address.
    ///
    /// Coordinators are spawned on demand when groups are created; they
    /// stop on close or dissolution. The directory stops when the last
    /// address clone is dropped.
    pub fn spawn(config: RuntimeConfig) -> DirectoryAddr {
        let (tx, rx) = mpsc::channel::<DirectoryMsg>(config.mailbox_capacity);
        let addr = DirectoryAddr::new(tx);
        let directory = Directory::new(addr.clone());
        tokio::spawn(r#loop::directory_loop(directory, rx, config));
        addr
    }
}

// ── Session (app-facing API) ─────────────────────────────────────────

/// One user's session: an identity, an endpoint to receive events on,
/// and the directory address to send requests to.
///
/// All methods are non-blocking channel sends; outcomes arrive on the
/// event receiver returned by [`Session::new`].
#[derive(Debug, Clone)]
pub struct Session {
    user: UserName,
    endpoint: EndpointHandle,
    directory: DirectoryAddr,
}

impl Session {
    /// Allocate a session for `user` with a fresh endpoint mailbox.
    ///
    /// Returns the session plus the receiver the caller drains for
    /// [`ClientEvent`]s. The name is not claimed until [`Session::connect`]
    /// succeeds.
    pub fn new(
        user: impl Into<UserName>,
        directory: DirectoryAddr,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (endpoint, rx) = EndpointHandle::channel(capacity);
        (
            Self {
                user: user.into(),
                endpoint,
                directory,
            },
            rx,
        )
    }

    pub fn user(&self) -> &UserName {
        &self.user
    }

    pub fn endpoint(&self) -> &EndpointHandle {
        &self.endpoint
    }

    async fn send(&self, request: Request) -> Result<(), PalaverError> {
        self.directory
            .send(Envelope::new(
                self.user.clone(),
                self.endpoint.clone(),
                request,
            ))
            .await
    }

    /// Claim this session's user name in the directory.
    pub async fn connect(&self) -> Result<(), PalaverError> {
        self.send(Request::Connect).await
    }

    /// Release this session's user name.
    pub async fn disconnect(&self) -> Result<(), PalaverError> {
        self.send(Request::Disconnect).await
    }

    /// Send a text message to another user.
    pub async fn private_text(
        &self,
        target: impl Into<UserName>,
        body: impl Into<String>,
    ) -> Result<(), PalaverError> {
        self.send(Request::PrivateText {
            target: target.into(),
            body: body.into(),
        })
        .await
    }

    /// Send a file reference to another user.
    pub async fn private_file(
        &self,
        target: impl Into<UserName>,
        file: FileRef,
    ) -> Result<(), PalaverError> {
        self.send(Request::PrivateFile {
            target: target.into(),
            file,
        })
        .await
    }

    /// Create a group with this user as admin and sole member.
    pub async fn create_group(&self, group: impl Into<GroupName>) -> Result<(), PalaverError> {
        self.send(Request::CreateGroup {
            group: group.into(),
        })
        .await
    }

    /// Leave a group this user belongs to.
    pub async fn leave_group(&self, group: impl Into<GroupName>) -> Result<(), PalaverError> {
        self.send(Request::LeaveGroup {
            group: group.into(),
        })
        .await
    }

    /// Broadcast a text message to a group.
    pub async fn group_text(
        &self,
        group: impl Into<GroupName>,
        body: impl Into<String>,
    ) -> Result<(), PalaverError> {
        self.send(Request::GroupText {
            group: group.into(),
            body: body.into(),
        })
        .await
    }

    /// Broadcast a file reference to a group.
    pub async fn group_file(
        &self,
        group: impl Into<GroupName>,
        file: FileRef,
    ) -> Result<(), PalaverError> {
        self.send(Request::GroupFile {
            group: group.into(),
            file,
        })
        .await
    }

    /// Add a connected user to a group (admin or co-admin only).
    pub async fn invite(
        &self,
        group: impl Into<GroupName>,
        target: impl Into<UserName>,
    ) -> Result<(), PalaverError> {
        self.send(Request::Invite {
            group: group.into(),
            target: target.into(),
        })
        .await
    }

    /// Remove a member from a group (admin or co-admin only).
    pub async fn remove_from_group(
        &self,
        group: impl Into<GroupName>,
        target: impl Into<UserName>,
    ) -> Result<(), PalaverError> {
        self.send(Request::RemoveFromGroup {
            group: group.into(),
            target: target.into(),
        })
        .await
    }

    /// Close a group, notifying its members and stopping its coordinator.
    pub async fn close_group(&self, group: impl Into<GroupName>) -> Result<(), PalaverError> {
        self.send(Request::CloseGroup {
            group: group.into(),
        })
        .await
    }

    /// Promote a member to co-admin (admin only).
    pub async fn add_coadmin(
        &self,
        group: impl Into<GroupName>,
        target: impl Into<UserName>,
    ) -> Result<(), PalaverError> {
        self.send(Request::AddCoadmin {
            group: group.into(),
            target: target.into(),
        })
        .await
    }

    /// Demote a co-admin back to plain member (admin only).
    pub async fn remove_coadmin(
        &self,
        group: impl Into<GroupName>,
        target: impl Into<UserName>,
    ) -> Result<(), PalaverError> {
        self.send(Request::RemoveCoadmin {
            group: group.into(),
            target: target.into(),
        })
        .await
    }

    /// Mute a member in a group (admin or co-admin only).
    pub async fn mute(
        &self,
        group: impl Into<GroupName>,
        target: impl Into<UserName>,
    ) -> Result<(), PalaverError> {
        self.send(Request::Mute {
            group: group.into(),
            target: target.into(),
        })
        .await
    }

    /// Lift a member's mute in a group (admin or co-admin only).
    pub async fn unmute(
        &self,
        group: impl Into<GroupName>,
        target: impl Into<UserName>,
    ) -> Result<(), PalaverError> {
        self.send(Request::Unmute {
            group: group.into(),
            target: target.into(),
        })
        .await
    }
}
