//! The directory — the single global entity owning the user and group
//! registries.
//!
//! Pure decision engine: `handle` validates one request against the
//! registries and returns actions for the runtime loop to execute (same
//! pattern as `GroupCoordinator` → `GroupAction`). The directory performs
//! existence checks and name→address resolution only; authorization is
//! the coordinator's job.

use std::collections::HashMap;
use std::fmt;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::envelope::{ClientEvent, EndpointHandle, Envelope, Request};
use crate::error::{PalaverError, Reject};
use crate::group::{GroupHandle, GroupOp};
use crate::types::{GroupName, UserName};

// ── Mailbox ──────────────────────────────────────────────────────────────

/// Messages the directory task processes, one at a time.
#[derive(Debug)]
pub enum DirectoryMsg {
    /// A client request envelope.
    Envelope(Envelope),
    /// Internal: a coordinator drained to zero members and stopped itself.
    CoordinatorDissolved {
        group: GroupName,
        coordinator: Uuid,
    },
}

/// Address of the directory task. Cheap to clone; all methods are
/// non-blocking channel sends.
#[derive(Clone)]
pub struct DirectoryAddr {
    tx: mpsc::Sender<DirectoryMsg>,
}

impl DirectoryAddr {
    pub(crate) fn new(tx: mpsc::Sender<DirectoryMsg>) -> Self {
        Self { tx }
    }

    /// Submit a request envelope to the directory.
    pub async fn send(&self, envelope: Envelope) -> Result<(), PalaverError> {
        self.tx
            .send(DirectoryMsg::Envelope(envelope))
            .await
            .map_err(|_| PalaverError::DirectoryClosed)
    }

    /// Report a self-dissolved coordinator. Best-effort: if the directory
    /// is gone there is nothing left to deregister from.
    pub(crate) async fn notify_dissolved(&self, group: GroupName, coordinator: Uuid) {
        let _ = self
            .tx
            .send(DirectoryMsg::CoordinatorDissolved { group, coordinator })
            .await;
    }
}

impl fmt::Debug for DirectoryAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DirectoryAddr")
    }
}

// ── DirectoryAction ──────────────────────────────────────────────────────

/// Actions returned by the directory — the runtime loop executes them.
#[derive(Debug)]
pub enum DirectoryAction {
    /// Deliver an event to a session endpoint.
    Deliver {
        to: EndpointHandle,
        event: ClientEvent,
    },
    /// Forward an enriched operation to a group coordinator.
    Forward { to: GroupHandle, op: GroupOp },
    /// Spawn a coordinator with the creator as admin, then hand its
    /// handle back via [`Directory::register_group`].
    SpawnCoordinator {
        group: GroupName,
        creator: UserName,
        creator_endpoint: EndpointHandle,
    },
}

// ── Directory ────────────────────────────────────────────────────────────

/// Registry state. Owned exclusively by the directory task; no other
/// entity reads or mutates it.
pub struct Directory {
    addr: DirectoryAddr,
    users: HashMap<UserName, EndpointHandle>,
    groups: HashMap<GroupName, GroupHandle>,
}

impl Directory {
    /// `addr` is the directory's own address, handed out in `ConnectAck`.
    pub fn new(addr: DirectoryAddr) -> Self {
        Self {
            addr,
            users: HashMap::new(),
            groups: HashMap::new(),
        }
    }

    /// The directory's own address, for handing to spawned coordinators.
    pub(crate) fn addr(&self) -> &DirectoryAddr {
        &self.addr
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Process one request envelope. Every failure becomes a Notification
    /// to the requester; the directory never aborts.
    pub fn handle(&mut self, envelope: Envelope) -> Vec<DirectoryAction> {
        let Envelope {
            from,
            reply,
            request,
        } = envelope;
        match request {
            Request::Connect => self.handle_connect(from, reply),
            Request::Disconnect => self.handle_disconnect(from, reply),
            Request::PrivateText { target, body } => {
                self.route_private(reply, target, ClientEvent::PrivateText { from, body })
            }
            Request::PrivateFile { target, file } => {
                self.route_private(reply, target, ClientEvent::PrivateFile { from, file })
            }
            Request::CreateGroup { group } => self.handle_create_group(from, reply, group),
            Request::LeaveGroup { group } => {
                let op = GroupOp::Leave {
                    sender: from,
                    reply: reply.clone(),
                };
                self.route_group(reply, group, op)
            }
            Request::GroupText { group, body } => {
                let op = GroupOp::Text {
                    sender: from,
                    reply: reply.clone(),
                    body,
                };
                self.route_group(reply, group, op)
            }
            Request::GroupFile { group, file } => {
                let op = GroupOp::File {
                    sender: from,
                    reply: reply.clone(),
                    file,
                };
                self.route_group(reply, group, op)
            }
            Request::Invite { group, target } => {
                self.route_targeted(from, reply, group, target, |s, r, t, te| GroupOp::Invite {
                    sender: s,
                    reply: r,
                    target: t,
                    target_endpoint: te,
                })
            }
            Request::RemoveFromGroup { group, target } => {
                self.route_targeted(from, reply, group, target, |s, r, t, te| GroupOp::Remove {
                    sender: s,
                    reply: r,
                    target: t,
                    target_endpoint: te,
                })
            }
            Request::AddCoadmin { group, target } => {
                self.route_targeted(from, reply, group, target, |s, r, t, te| {
                    GroupOp::AddCoadmin {
                        sender: s,
                        reply: r,
                        target: t,
                        target_endpoint: te,
                    }
                })
            }
            Request::RemoveCoadmin { group, target } => {
                self.route_targeted(from, reply, group, target, |s, r, t, te| {
                    GroupOp::RemoveCoadmin {
                        sender: s,
                        reply: r,
                        target: t,
                        target_endpoint: te,
                    }
                })
            }
            Request::Mute { group, target } => {
                self.route_targeted(from, reply, group, target, |s, r, t, te| GroupOp::Mute {
                    sender: s,
                    reply: r,
                    target: t,
                    target_endpoint: te,
                })
            }
            Request::Unmute { group, target } => {
                self.route_targeted(from, reply, group, target, |s, r, t, te| GroupOp::Unmute {
                    sender: s,
                    reply: r,
                    target: t,
                    target_endpoint: te,
                })
            }
            Request::CloseGroup { group } => self.handle_close_group(from, reply, group),
        }
    }

    // ── Connect / disconnect ─────────────────────────────────────────────

    fn handle_connect(&mut self, user: UserName, reply: EndpointHandle) -> Vec<DirectoryAction> {
        if self.users.contains_key(&user) {
            return reject(reply, Reject::NameInUse(user));
        }
        self.users.insert(user.clone(), reply.clone());
        tracing::info!(%user, "user connected");
        vec![DirectoryAction::Deliver {
            to: reply,
            event: ClientEvent::ConnectAck {
                directory: self.addr.clone(),
            },
        }]
    }

    fn handle_disconnect(&mut self, user: UserName, reply: EndpointHandle) -> Vec<DirectoryAction> {
        if self.users.remove(&user).is_none() {
            return reject(reply, Reject::AlreadyDisconnected(user));
        }
        tracing::info!(%user, "user disconnected");
        vec![DirectoryAction::Deliver {
            to: reply,
            event: ClientEvent::Disconnected { user },
        }]
    }

    // ── Private routing ──────────────────────────────────────────────────

    fn route_private(
        &mut self,
        reply: EndpointHandle,
        target: UserName,
        event: ClientEvent,
    ) -> Vec<DirectoryAction> {
        let Some(endpoint) = self.users.get(&target) else {
            return reject(reply, Reject::UserNotFound(target));
        };
        tracing::debug!(%target, "forwarding private payload");
        vec![DirectoryAction::Deliver {
            to: endpoint.clone(),
            event,
        }]
    }

    // ── Group lifecycle ──────────────────────────────────────────────────

    fn handle_create_group(
        &mut self,
        creator: UserName,
        reply: EndpointHandle,
        group: GroupName,
    ) -> Vec<DirectoryAction> {
        if self.groups.contains_key(&group) {
            return reject(reply, Reject::GroupExists(group));
        }
        vec![DirectoryAction::SpawnCoordinator {
            group,
            creator,
            creator_endpoint: reply,
        }]
    }

    /// Complete a `SpawnCoordinator` action: the loop has spawned the
    /// coordinator task and hands back its handle. Yields only deliveries.
    pub fn register_group(
        &mut self,
        group: GroupName,
        creator_endpoint: EndpointHandle,
        coordinator: GroupHandle,
    ) -> Vec<DirectoryAction> {
        tracing::info!(%group, "group created");
        self.groups.insert(group.clone(), coordinator.clone());
        vec![DirectoryAction::Deliver {
            to: creator_endpoint,
            event: ClientEvent::CreateGroupApprove { group, coordinator },
        }]
    }

    fn handle_close_group(
        &mut self,
        from: UserName,
        reply: EndpointHandle,
        group: GroupName,
    ) -> Vec<DirectoryAction> {
        let Some(handle) = self.groups.remove(&group) else {
            return reject(reply, Reject::GroupNotFound(group));
        };
        tracing::info!(%group, by = %from, "group closed");
        vec![DirectoryAction::Forward {
            to: handle,
            op: GroupOp::Close { sender: from, reply },
        }]
    }

    /// Deregister a group whose coordinator dissolved itself. Ignored when
    /// the name was already re-registered by a newer coordinator.
    pub fn remove_dissolved(&mut self, group: &GroupName, coordinator: Uuid) {
        if self
            .groups
            .get(group)
            .is_some_and(|handle| handle.id() == coordinator)
        {
            self.groups.remove(group);
            tracing::info!(%group, "group dissolved");
        }
    }

    // ── Group routing ────────────────────────────────────────────────────

    /// Leave / text / file: a group-existence check, then forward.
    fn route_group(
        &mut self,
        reply: EndpointHandle,
        group: GroupName,
        op: GroupOp,
    ) -> Vec<DirectoryAction> {
        let Some(handle) = self.groups.get(&group) else {
            return reject(reply, Reject::GroupNotFound(group));
        };
        tracing::debug!(%group, "forwarding group op");
        vec![DirectoryAction::Forward {
            to: handle.clone(),
            op,
        }]
    }

    /// The admin/role/mute family: both the group and the target user must
    /// exist; the target's endpoint is resolved and attached.
    fn route_targeted(
        &mut self,
        from: UserName,
        reply: EndpointHandle,
        group: GroupName,
        target: UserName,
        build: impl FnOnce(UserName, EndpointHandle, UserName, EndpointHandle) -> GroupOp,
    ) -> Vec<DirectoryAction> {
        let Some(handle) = self.groups.get(&group) else {
            return reject(reply, Reject::GroupNotFound(group));
        };
        let Some(target_endpoint) = self.users.get(&target) else {
            return reject(reply, Reject::UserNotFound(target));
        };
        tracing::debug!(%group, %target, "forwarding targeted group op");
        vec![DirectoryAction::Forward {
            to: handle.clone(),
            op: build(from, reply, target, target_endpoint.clone()),
        }]
    }
}

fn reject(reply: EndpointHandle, reject: Reject) -> Vec<DirectoryAction> {
    vec![DirectoryAction::Deliver {
        to: reply,
        event: reject.into(),
    }]
}
