//! Friend-request state machine.
//!
//! An accepted friendship is two ACCEPTED edges (A→B and B→A) written
//! together; a pending request is a single edge from requester to
//! recipient. Blocks are separate directed records and forbid any edge
//! between the pair. Every multi-row transition runs inside one
//! [`RelationshipTx`](crate::store::RelationshipTx) that first locks the
//! pair, so conflicting transitions are serialized.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::notify::{FriendEvent, FriendEventKind, NotificationSink};
use crate::store::{CredentialStore, RelationshipStore};
use crate::types::UserId;
use crate::user::UserSummary;

/// Default cap on accepted relationships per user.
pub const DEFAULT_MAX_FRIENDS: i64 = 2500;

/// Status stored on a directed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipStatus {
    Pending,
    Accepted,
}

impl RelationshipStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationshipStatus::Pending => "pending",
            RelationshipStatus::Accepted => "accepted",
        }
    }
}

impl FromStr for RelationshipStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RelationshipStatus::Pending),
            "accepted" => Ok(RelationshipStatus::Accepted),
            other => Err(CoreError::Internal(format!(
                "unknown relationship status '{other}'"
            ))),
        }
    }
}

/// Logical state of the ordered pair (A, B), seen from A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipState {
    None,
    /// A asked B.
    PendingOutgoing,
    /// B asked A.
    PendingIncoming,
    Accepted,
    BlockedByA,
    BlockedByB,
}

impl RelationshipState {
    /// Derive the pair state from raw rows. Blocks take precedence over
    /// edges; A's own block takes precedence over B's.
    pub fn derive(
        forward: Option<RelationshipStatus>,
        backward: Option<RelationshipStatus>,
        a_blocks_b: bool,
        b_blocks_a: bool,
    ) -> Self {
        use RelationshipStatus::{Accepted, Pending};

        if a_blocks_b {
            return RelationshipState::BlockedByA;
        }
        if b_blocks_a {
            return RelationshipState::BlockedByB;
        }
        match (forward, backward) {
            (Some(Accepted), _) | (_, Some(Accepted)) => RelationshipState::Accepted,
            (Some(Pending), _) => RelationshipState::PendingOutgoing,
            (None, Some(Pending)) => RelationshipState::PendingIncoming,
            (None, None) => RelationshipState::None,
        }
    }
}

/// Successful result of [`RelationshipManager::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RequestOutcome {
    #[serde(rename = "REQUEST_SENT")]
    Sent,
    #[serde(rename = "REQUEST_ALREADY_SENT")]
    AlreadySent,
    #[serde(rename = "REQUEST_ACCEPTED")]
    Accepted,
}

impl RequestOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestOutcome::Sent => "REQUEST_SENT",
            RequestOutcome::AlreadySent => "REQUEST_ALREADY_SENT",
            RequestOutcome::Accepted => "REQUEST_ACCEPTED",
        }
    }
}

/// Direction of a pending edge relative to the user who asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestDirection {
    Incoming,
    Outgoing,
}

/// A pending edge touching the user, with the other party's card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub direction: RequestDirection,
    pub user: UserSummary,
}

/// Pending requests split by direction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FriendRequests {
    pub incoming: Vec<UserSummary>,
    pub outgoing: Vec<UserSummary>,
}

/// Implements friend request / accept / unfriend / block transitions.
#[derive(Clone)]
pub struct RelationshipManager {
    store: Arc<dyn RelationshipStore>,
    users: Arc<dyn CredentialStore>,
    sink: Arc<dyn NotificationSink>,
    max_friends: i64,
}

impl RelationshipManager {
    pub fn new(
        store: Arc<dyn RelationshipStore>,
        users: Arc<dyn CredentialStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            users,
            sink,
            max_friends: DEFAULT_MAX_FRIENDS,
        }
    }

    pub fn with_max_friends(mut self, max_friends: i64) -> Self {
        self.max_friends = max_friends;
        self
    }

    /// `a` asks `b` to be friends.
    ///
    /// A pending request in the opposite direction collapses into
    /// acceptance; repeating an outstanding request is idempotent.
    pub async fn request(&self, a: UserId, b: UserId) -> CoreResult<RequestOutcome> {
        if a == b {
            return Err(CoreError::SameUser);
        }
        self.ensure_user_exists(b).await?;

        let mut tx = self.store.begin().await?;
        tx.lock_pair(a, b).await?;
        tx.lock_user(a).await?;

        if tx.block_between(a, b).await? {
            return Err(CoreError::RecipientBlocked);
        }
        if tx.accepted_count(a).await? >= self.max_friends {
            return Err(CoreError::MaxFriends {
                limit: self.max_friends,
            });
        }

        let outcome = match tx.edge(b, a).await? {
            Some(RelationshipStatus::Pending) => {
                tx.upsert_edge(a, b, RelationshipStatus::Accepted).await?;
                tx.upsert_edge(b, a, RelationshipStatus::Accepted).await?;
                RequestOutcome::Accepted
            }
            Some(RelationshipStatus::Accepted) => return Err(CoreError::RelationshipExists),
            None => match tx.edge(a, b).await? {
                Some(RelationshipStatus::Pending) => RequestOutcome::AlreadySent,
                Some(RelationshipStatus::Accepted) => return Err(CoreError::RelationshipExists),
                None => {
                    tx.upsert_edge(a, b, RelationshipStatus::Pending).await?;
                    RequestOutcome::Sent
                }
            },
        };
        tx.commit().await?;

        tracing::debug!(from = %a, to = %b, outcome = outcome.as_str(), "Friend request handled");
        match outcome {
            RequestOutcome::Sent => self.notify(b, FriendEvent::new(FriendEventKind::Request, a)),
            RequestOutcome::Accepted => {
                self.notify(b, FriendEvent::new(FriendEventKind::Accepted, a))
            }
            RequestOutcome::AlreadySent => {}
        }
        Ok(outcome)
    }

    /// Remove the relationship (accepted or pending, either direction).
    /// Absence of edges is not an error.
    pub async fn unfriend(&self, a: UserId, b: UserId) -> CoreResult<()> {
        if a == b {
            return Err(CoreError::SameUser);
        }

        let mut tx = self.store.begin().await?;
        tx.lock_pair(a, b).await?;
        let removed = tx.delete_edges_between(a, b).await?;
        tx.commit().await?;

        tracing::debug!(from = %a, to = %b, removed, "Relationship removed");
        self.notify(b, FriendEvent::new(FriendEventKind::Removed, a));
        Ok(())
    }

    /// `a` blocks `b`: drop every edge between them and record the block.
    ///
    /// `b` is told the relationship was removed, never that it was blocked.
    pub async fn block(&self, a: UserId, b: UserId) -> CoreResult<()> {
        if a == b {
            return Err(CoreError::SameUser);
        }
        self.ensure_user_exists(b).await?;

        let mut tx = self.store.begin().await?;
        tx.lock_pair(a, b).await?;
        let removed = tx.delete_edges_between(a, b).await?;
        tx.insert_block(a, b).await?;
        tx.commit().await?;

        tracing::debug!(blocker = %a, blocked = %b, removed, "User blocked");
        self.notify(b, FriendEvent::new(FriendEventKind::Removed, a));
        Ok(())
    }

    /// Lift `a`'s block on `b`. Idempotent; emits nothing.
    pub async fn unblock(&self, a: UserId, b: UserId) -> CoreResult<()> {
        if a == b {
            return Err(CoreError::SameUser);
        }

        let mut tx = self.store.begin().await?;
        tx.lock_pair(a, b).await?;
        let removed = tx.delete_block(a, b).await?;
        tx.commit().await?;

        tracing::debug!(blocker = %a, blocked = %b, removed, "User unblocked");
        Ok(())
    }

    pub async fn friends(&self, user_id: UserId) -> CoreResult<Vec<UserSummary>> {
        self.store.fetch_friends(user_id).await
    }

    pub async fn requests(&self, user_id: UserId) -> CoreResult<FriendRequests> {
        let pending = self.store.fetch_pending(user_id).await?;
        let mut requests = FriendRequests::default();
        for p in pending {
            match p.direction {
                RequestDirection::Incoming => requests.incoming.push(p.user),
                RequestDirection::Outgoing => requests.outgoing.push(p.user),
            }
        }
        Ok(requests)
    }

    pub async fn blocked(&self, user_id: UserId) -> CoreResult<Vec<UserSummary>> {
        self.store.fetch_blocked(user_id).await
    }

    /// Current logical state of the ordered pair (a, b).
    pub async fn state(&self, a: UserId, b: UserId) -> CoreResult<RelationshipState> {
        if a == b {
            return Err(CoreError::SameUser);
        }
        let forward = self.store.edge(a, b).await?;
        let backward = self.store.edge(b, a).await?;
        let a_blocks_b = self.store.block_exists(a, b).await?;
        let b_blocks_a = self.store.block_exists(b, a).await?;
        Ok(RelationshipState::derive(
            forward, backward, a_blocks_b, b_blocks_a,
        ))
    }

    async fn ensure_user_exists(&self, user_id: UserId) -> CoreResult<()> {
        match self.users.find_by_id(user_id).await? {
            Some(_) => Ok(()),
            None => Err(CoreError::UserNotFound(user_id)),
        }
    }

    /// Fire-and-forget: the mutation has already committed and delivery
    /// failures never reach the caller.
    fn notify(&self, recipient: UserId, event: FriendEvent) {
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            sink.push(recipient, event).await;
        });
    }
}
