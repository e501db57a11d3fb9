//! Best-effort push of relationship events to connected devices.

use async_trait::async_trait;
use serde::Serialize;

use crate::types::UserId;

/// What happened to the relationship, from the recipient's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FriendEventKind {
    /// The actor sent the recipient a friend request.
    Request,
    /// The actor accepted the recipient's request.
    Accepted,
    /// The actor removed the relationship (unfriend or block).
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FriendEvent {
    #[serde(rename = "type")]
    pub kind: FriendEventKind,
    #[serde(rename = "userID")]
    pub actor: UserId,
}

impl FriendEvent {
    pub fn new(kind: FriendEventKind, actor: UserId) -> Self {
        Self { kind, actor }
    }
}

/// Delivery endpoint for [`FriendEvent`]s.
///
/// Implementations must not fail: a recipient without a live connection is
/// silently skipped.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    async fn push(&self, recipient: UserId, event: FriendEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
    async fn push(&self, _recipient: UserId, _event: FriendEvent) {}
}
