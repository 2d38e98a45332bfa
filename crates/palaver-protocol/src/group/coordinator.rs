use std::collections::{BTreeMap, BTreeSet};

use crate::envelope::{ClientEvent, EndpointHandle};
use crate::error::Reject;
use crate::group::types::{GroupAction, GroupOp};
use crate::types::{GroupName, UserName};

/// Per-group coordinator — owns membership, roles, and mute state.
///
/// Pure state machine: `handle` applies one operation and returns the
/// deliveries (and possibly a terminal action) for the runtime loop to
/// execute. Invariants held throughout:
/// - the admin is always a member and is never in the muted set;
/// - coadmins and muted users are subsets of the members.
///
/// Membership maps are ordered so that broadcast order and admin
/// succession are deterministic.
pub struct GroupCoordinator {
    name: GroupName,
    admin: UserName,
    coadmins: BTreeSet<UserName>,
    members: BTreeMap<UserName, EndpointHandle>,
    muted: BTreeSet<UserName>,
}

impl GroupCoordinator {
    /// Initialize a freshly created group: the creator is admin and sole
    /// member.
    pub fn new(name: GroupName, admin: UserName, admin_endpoint: EndpointHandle) -> Self {
        let mut members = BTreeMap::new();
        members.insert(admin.clone(), admin_endpoint);
        Self {
            name,
            admin,
            coadmins: BTreeSet::new(),
            members,
            muted: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &GroupName {
        &self.name
    }

    pub fn admin(&self) -> &UserName {
        &self.admin
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_member(&self, user: &UserName) -> bool {
        self.members.contains_key(user)
    }

    pub fn is_coadmin(&self, user: &UserName) -> bool {
        self.coadmins.contains(user)
    }

    pub fn is_muted(&self, user: &UserName) -> bool {
        self.muted.contains(user)
    }

    /// Apply one operation. Invalid operations reject with a Notification
    /// to the caller; the coordinator never aborts.
    pub fn handle(&mut self, op: GroupOp) -> Vec<GroupAction> {
        match op {
            GroupOp::Leave { sender, reply } => self.handle_leave(sender, reply),
            GroupOp::Text {
                sender,
                reply,
                body,
            } => {
                let event = ClientEvent::GroupText {
                    group: self.name.clone(),
                    from: sender.clone(),
                    body,
                };
                self.handle_broadcast(sender, reply, event)
            }
            GroupOp::File {
                sender,
                reply,
                file,
            } => {
                let event = ClientEvent::GroupFile {
                    group: self.name.clone(),
                    from: sender.clone(),
                    file,
                };
                self.handle_broadcast(sender, reply, event)
            }
            GroupOp::Invite {
                sender,
                reply,
                target,
                target_endpoint,
            } => self.handle_invite(sender, reply, target, target_endpoint),
            GroupOp::Remove {
                sender,
                reply,
                target,
                target_endpoint,
            } => self.handle_remove(sender, reply, target, target_endpoint),
            GroupOp::AddCoadmin {
                sender,
                reply,
                target,
                target_endpoint,
            } => self.handle_add_coadmin(sender, reply, target, target_endpoint),
            GroupOp::RemoveCoadmin {
                sender,
                reply,
                target,
                target_endpoint,
            } => self.handle_remove_coadmin(sender, reply, target, target_endpoint),
            GroupOp::Mute {
                sender,
                reply,
                target,
                target_endpoint,
            } => self.handle_mute(sender, reply, target, target_endpoint),
            GroupOp::Unmute {
                sender,
                reply,
                target,
                target_endpoint,
            } => self.handle_unmute(sender, reply, target, target_endpoint),
            GroupOp::Close { sender, reply: _ } => self.handle_close(sender),
        }
    }

    // ── Broadcast (text / file) ──────────────────────────────────────────

    fn handle_broadcast(
        &mut self,
        sender: UserName,
        reply: EndpointHandle,
        event: ClientEvent,
    ) -> Vec<GroupAction> {
        if !self.members.contains_key(&sender) {
            return self.reject(
                &reply,
                Reject::NotMember {
                    user: sender,
                    group: self.name.clone(),
                },
            );
        }
        if self.muted.contains(&sender) {
            return self.reject(
                &reply,
                Reject::SenderMuted {
                    group: self.name.clone(),
                },
            );
        }
        self.broadcast_except(&sender, event)
    }

    // ── Invite ───────────────────────────────────────────────────────────

    fn handle_invite(
        &mut self,
        sender: UserName,
        reply: EndpointHandle,
        target: UserName,
        target_endpoint: EndpointHandle,
    ) -> Vec<GroupAction> {
        if !self.can_moderate(&sender) {
            return self.unauthorized(&reply);
        }
        if self.members.contains_key(&target) {
            return self.reject(
                &reply,
                Reject::AlreadyMember {
                    user: target,
                    group: self.name.clone(),
                },
            );
        }

        self.members.insert(target.clone(), target_endpoint.clone());

        // Announce the join to everyone else, then welcome the target.
        let mut actions = self.broadcast_except(
            &target,
            self.notice(format!("{target} has joined {}!", self.name)),
        );
        actions.push(GroupAction::Deliver {
            to: target_endpoint,
            event: self.notice(format!("you have been added to {} by {sender}!", self.name)),
        });
        actions
    }

    // ── Leave ────────────────────────────────────────────────────────────

    fn handle_leave(&mut self, sender: UserName, reply: EndpointHandle) -> Vec<GroupAction> {
        if self.members.remove(&sender).is_none() {
            return self.reject(
                &reply,
                Reject::NotMember {
                    user: sender,
                    group: self.name.clone(),
                },
            );
        }
        self.coadmins.remove(&sender);
        self.muted.remove(&sender);

        let confirm = GroupAction::Deliver {
            to: reply,
            event: self.notice(format!("you have left {}!", self.name)),
        };

        // Dissolve first so the directory hears about it before the
        // departing member does; the name must be free again by the time
        // the confirmation is observed.
        if self.members.is_empty() {
            return vec![GroupAction::Dissolve, confirm];
        }

        let mut actions = vec![confirm];

        actions.extend(
            self.broadcast_except(&sender, self.notice(format!("{sender} has left {}!", self.name))),
        );

        if sender == self.admin {
            let successor = self.promote_successor();
            actions.extend(self.broadcast_except(
                &sender,
                self.notice(format!("{successor} is now the admin of {}!", self.name)),
            ));
        }

        actions
    }

    /// Admin succession: the first coadmin by name, else the first member
    /// by name. The successor leaves the coadmin and muted sets — the
    /// admin is never muted.
    fn promote_successor(&mut self) -> UserName {
        let successor = self
            .coadmins
            .iter()
            .next()
            .cloned()
            .or_else(|| self.members.keys().next().cloned())
            .expect("succession requires at least one remaining member");
        self.coadmins.remove(&successor);
        self.muted.remove(&successor);
        self.admin = successor.clone();
        successor
    }

    // ── Remove ───────────────────────────────────────────────────────────

    fn handle_remove(
        &mut self,
        sender: UserName,
        reply: EndpointHandle,
        target: UserName,
        target_endpoint: EndpointHandle,
    ) -> Vec<GroupAction> {
        if !self.can_moderate(&sender) || target == self.admin {
            return self.unauthorized(&reply);
        }
        if self.members.remove(&target).is_none() {
            return self.reject(
                &reply,
                Reject::NotMember {
                    user: target,
                    group: self.name.clone(),
                },
            );
        }
        self.coadmins.remove(&target);
        self.muted.remove(&target);

        let mut actions = self.broadcast_except(
            &target,
            self.notice(format!("{target} was removed from {}!", self.name)),
        );
        actions.push(GroupAction::Deliver {
            to: target_endpoint,
            event: self.notice(format!(
                "you have been removed from {} by {sender}!",
                self.name
            )),
        });
        actions
    }

    // ── Coadmin management (admin only) ──────────────────────────────────

    fn handle_add_coadmin(
        &mut self,
        sender: UserName,
        reply: EndpointHandle,
        target: UserName,
        target_endpoint: EndpointHandle,
    ) -> Vec<GroupAction> {
        if sender != self.admin || target == self.admin {
            return self.unauthorized(&reply);
        }
        if !self.members.contains_key(&target) {
            return self.reject(
                &reply,
                Reject::NotMember {
                    user: target,
                    group: self.name.clone(),
                },
            );
        }
        if !self.coadmins.insert(target.clone()) {
            return self.reject(
                &reply,
                Reject::AlreadyCoadmin {
                    user: target,
                    group: self.name.clone(),
                },
            );
        }
        vec![GroupAction::Deliver {
            to: target_endpoint,
            event: self.notice(format!("you are now a coadmin of {}!", self.name)),
        }]
    }

    fn handle_remove_coadmin(
        &mut self,
        sender: UserName,
        reply: EndpointHandle,
        target: UserName,
        target_endpoint: EndpointHandle,
    ) -> Vec<GroupAction> {
        if sender != self.admin {
            return self.unauthorized(&reply);
        }
        if !self.coadmins.remove(&target) {
            return self.reject(
                &reply,
                Reject::NotCoadmin {
                    user: target,
                    group: self.name.clone(),
                },
            );
        }
        vec![GroupAction::Deliver {
            to: target_endpoint,
            event: self.notice(format!("you are no longer a coadmin of {}!", self.name)),
        }]
    }

    // ── Mute / unmute ────────────────────────────────────────────────────

    fn handle_mute(
        &mut self,
        sender: UserName,
        reply: EndpointHandle,
        target: UserName,
        target_endpoint: EndpointHandle,
    ) -> Vec<GroupAction> {
        if !self.can_moderate(&sender) || target == self.admin {
            return self.unauthorized(&reply);
        }
        if !self.members.contains_key(&target) {
            return self.reject(
                &reply,
                Reject::NotMember {
                    user: target,
                    group: self.name.clone(),
                },
            );
        }
        if !self.muted.insert(target.clone()) {
            return self.reject(
                &reply,
                Reject::AlreadyMuted {
                    user: target,
                    group: self.name.clone(),
                },
            );
        }
        vec![GroupAction::Deliver {
            to: target_endpoint,
            event: self.notice(format!("you have been muted in {} by {sender}!", self.name)),
        }]
    }

    fn handle_unmute(
        &mut self,
        sender: UserName,
        reply: EndpointHandle,
        target: UserName,
        target_endpoint: EndpointHandle,
    ) -> Vec<GroupAction> {
        if !self.can_moderate(&sender) {
            return self.unauthorized(&reply);
        }
        if !self.muted.remove(&target) {
            return self.reject(
                &reply,
                Reject::NotMuted {
                    user: target,
                    group: self.name.clone(),
                },
            );
        }
        vec![GroupAction::Deliver {
            to: target_endpoint,
            event: self.notice(format!("you have been unmuted in {}!", self.name)),
        }]
    }

    // ── Close ────────────────────────────────────────────────────────────

    fn handle_close(&mut self, sender: UserName) -> Vec<GroupAction> {
        let mut actions = self.broadcast_except(
            &sender,
            self.notice(format!("{} has been closed!", self.name)),
        );
        actions.push(GroupAction::Stop);
        actions
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    fn can_moderate(&self, user: &UserName) -> bool {
        *user == self.admin || self.coadmins.contains(user)
    }

    fn notice(&self, text: String) -> ClientEvent {
        ClientEvent::Notification { text }
    }

    fn reject(&self, reply: &EndpointHandle, reject: Reject) -> Vec<GroupAction> {
        vec![GroupAction::Deliver {
            to: reply.clone(),
            event: reject.into(),
        }]
    }

    fn unauthorized(&self, reply: &EndpointHandle) -> Vec<GroupAction> {
        self.reject(reply, Reject::Unauthorized(self.name.clone()))
    }

    /// One `Deliver` per member, skipping `except` — a sender never
    /// receives their own broadcast.
    fn broadcast_except(&self, except: &UserName, event: ClientEvent) -> Vec<GroupAction> {
        self.members
            .iter()
            .filter(|(name, _)| *name != except)
            .map(|(_, endpoint)| GroupAction::Deliver {
                to: endpoint.clone(),
                event: event.clone(),
            })
            .collect()
    }
}
