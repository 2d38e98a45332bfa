//! The runtime event loops.
//!
//! One task per entity: the directory loop owns the registries, each
//! coordinator loop owns one group's state. Loops drain a bounded mailbox
//! and execute the actions their state machine returns; they never touch
//! another entity's state directly.
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::directory::{Directory, DirectoryAction, DirectoryAddr, DirectoryMsg};
use crate::group::{GroupAction, GroupCoordinator, GroupHandle, GroupOp};
use crate::types::GroupName;

use super::RuntimeConfig;

/// Directory event loop — owns the user and group registries.
pub(super) async fn directory_loop(
    mut directory: Directory,
    mut rx: mpsc::Receiver<DirectoryMsg>,
    config: RuntimeConfig,
) {
    tracing::info!("directory started");
    while let Some(msg) = rx.recv().await {
        match msg {
            DirectoryMsg::Envelope(envelope) => {
                let actions = directory.handle(envelope);
                execute_directory_actions(&mut directory, actions, &config);
            }
            DirectoryMsg::CoordinatorDissolved { group, coordinator } => {
                directory.remove_dissolved(&group, coordinator);
            }
        }
    }
    tracing::info!("directory stopped");
}

fn execute_directory_actions(
    directory: &mut Directory,
    actions: Vec<DirectoryAction>,
    config: &RuntimeConfig,
) {
    for action in actions {
        match action {
            DirectoryAction::Deliver { to, event } => to.deliver(event),
            DirectoryAction::Forward { to, op } => to.forward(op),
            DirectoryAction::SpawnCoordinator {
                group,
                creator,
                creator_endpoint,
            } => {
                let (handle, op_rx) = GroupHandle::channel(config.mailbox_capacity);
                let coordinator =
                    GroupCoordinator::new(group.clone(), creator, creator_endpoint.clone());
                tokio::spawn(coordinator_loop(
                    coordinator,
                    op_rx,
                    handle.id(),
                    directory.addr().clone(),
                ));
                // register_group only yields deliveries, never another spawn.
                for follow_up in directory.register_group(group, creator_endpoint, handle) {
                    if let DirectoryAction::Deliver { to, event } = follow_up {
                        to.deliver(event);
                    }
                }
            }
        }
    }
}

/// Coordinator event loop — owns one group's membership, roles, and mutes.
///
/// Runs until the group is closed or dissolves; a dissolution is reported
/// back to the directory so the registry entry can be dropped.
pub(super) async fn coordinator_loop(
    mut coordinator: GroupCoordinator,
    mut rx: mpsc::Receiver<GroupOp>,
    id: Uuid,
    directory: DirectoryAddr,
) {
    let group: GroupName = coordinator.name().clone();
    tracing::info!(%group, admin = %coordinator.admin(), "coordinator started");
    while let Some(op) = rx.recv().await {
        let mut stopping = false;
        for action in coordinator.handle(op) {
            match action {
                GroupAction::Deliver { to, event } => to.deliver(event),
                GroupAction::Dissolve => {
                    tracing::info!(%group, "last member left, dissolving");
                    directory.notify_dissolved(group.clone(), id).await;
                    stopping = true;
                }
                GroupAction::Stop => {
                    tracing::info!(%group, "coordinator stopped");
                    stopping = true;
                }
            }
        }
        if stopping {
            return;
        }
    }
}
