use serde::{Deserialize, Serialize};

use crate::types::{GroupName, UserName};

/// Rejection taxonomy for the coordination core.
///
/// Every variant is recoverable-by-design: the rejecting entity sends the
/// `Display` text back to the requester as a `Notification` and keeps
/// serving. Nothing here terminates the directory or a coordinator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum Reject {
    #[error("{0} is in use!")]
    NameInUse(UserName),

    #[error("{0} is already disconnected!")]
    AlreadyDisconnected(UserName),

    #[error("{0} does not exist!")]
    UserNotFound(UserName),

    #[error("{0} does not exist!")]
    GroupNotFound(GroupName),

    #[error("{0} already exists!")]
    GroupExists(GroupName),

    /// Coordinator-side role violation (non-moderator action, targeting
    /// the admin, and so on).
    #[error("you are not authorized to do that in {0}!")]
    Unauthorized(GroupName),

    #[error("{user} is not a member of {group}!")]
    NotMember { user: UserName, group: GroupName },

    #[error("{user} is already a member of {group}!")]
    AlreadyMember { user: UserName, group: GroupName },

    #[error("{user} is not a coadmin of {group}!")]
    NotCoadmin { user: UserName, group: GroupName },

    #[error("{user} is already a coadmin of {group}!")]
    AlreadyCoadmin { user: UserName, group: GroupName },

    #[error("{user} is not muted in {group}!")]
    NotMuted { user: UserName, group: GroupName },

    #[error("{user} is already muted in {group}!")]
    AlreadyMuted { user: UserName, group: GroupName },

    /// A muted sender tried to broadcast.
    #[error("you are muted in {group}!")]
    SenderMuted { group: GroupName },
}

/// Runtime-facing errors — everything a caller of the async API can hit.
#[derive(Debug, thiserror::Error)]
pub enum PalaverError {
    /// The directory task is gone; its mailbox is closed.
    #[error("directory is no longer running")]
    DirectoryClosed,
}
