//! Persistence contracts consumed by the managers.
//!
//! Implementations live in `iris-db` (PostgreSQL) and [`crate::memory`]
//! (in-process). Every method maps backend failures to
//! [`CoreError::Internal`](crate::error::CoreError::Internal).

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::relationship::{PendingRequest, RelationshipStatus};
use crate::session::{NewSession, Session};
use crate::types::{SessionId, Timestamp, UserId};
use crate::user::{NewUser, UpdateProfile, User, UserSummary};

/// User records with unique email and username.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a user. Fails with `DuplicateEmail` or `DuplicateUsername`.
    async fn create_user(&self, input: &NewUser) -> CoreResult<User>;

    async fn find_by_id(&self, id: UserId) -> CoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> CoreResult<Option<User>>;

    /// Users whose username starts with `prefix` (case-sensitive), ordered by
    /// username, at most `limit` rows.
    async fn find_by_username_prefix(&self, prefix: &str, limit: i64) -> CoreResult<Vec<User>>;

    /// Apply the non-`None` fields of `input`. Returns `None` if the user
    /// does not exist.
    async fn update_profile(&self, id: UserId, input: &UpdateProfile)
        -> CoreResult<Option<User>>;

    /// Replace the stored password hash. Returns `true` if the row was updated.
    async fn update_password(&self, id: UserId, password_hash: &str) -> CoreResult<bool>;
}

/// One row per logged-in device.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &NewSession) -> CoreResult<()>;

    async fn find(&self, id: SessionId) -> CoreResult<Option<Session>>;

    /// Atomically replace the refresh token hash and expiry, but only if the
    /// stored hash still equals `current_hash`. Returns `false` when no row
    /// matched (the token was already rotated or the session was deleted).
    async fn swap_refresh_token(
        &self,
        id: SessionId,
        current_hash: &str,
        next_hash: &str,
        expires_at: Timestamp,
    ) -> CoreResult<bool>;

    /// Delete the session only if both id and token hash match.
    async fn delete(&self, id: SessionId, token_hash: &str) -> CoreResult<u64>;

    async fn delete_all_for_user(&self, user_id: UserId) -> CoreResult<u64>;

    /// Sessions of `user_id` that have not expired, newest first.
    async fn list_active_for_user(&self, user_id: UserId) -> CoreResult<Vec<Session>>;

    /// Purge rows whose expiry has passed.
    async fn delete_expired(&self) -> CoreResult<u64>;
}

/// Directed relationship edges and block records.
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Start a transaction. Dropping the returned handle without calling
    /// [`RelationshipTx::commit`] rolls it back.
    async fn begin(&self) -> CoreResult<Box<dyn RelationshipTx>>;

    /// Users with an ACCEPTED edge from `user_id`.
    async fn fetch_friends(&self, user_id: UserId) -> CoreResult<Vec<UserSummary>>;

    /// PENDING edges touching `user_id` in either direction.
    async fn fetch_pending(&self, user_id: UserId) -> CoreResult<Vec<PendingRequest>>;

    /// Users blocked by `user_id`.
    async fn fetch_blocked(&self, user_id: UserId) -> CoreResult<Vec<UserSummary>>;

    async fn edge(&self, from: UserId, to: UserId) -> CoreResult<Option<RelationshipStatus>>;

    async fn block_exists(&self, blocker: UserId, blocked: UserId) -> CoreResult<bool>;
}

/// A unit of work over the relationship tables.
///
/// Conflicting transactions on the same user pair are serialized by
/// [`lock_pair`](RelationshipTx::lock_pair); the first one to take the lock
/// wins and the other observes its committed result.
#[async_trait]
pub trait RelationshipTx: Send {
    /// Serialize against every other transaction touching the unordered pair.
    async fn lock_pair(&mut self, a: UserId, b: UserId) -> CoreResult<()>;

    /// Serialize against other transactions that may grow `user_id`'s friend
    /// count. Taken after the pair lock, and at most once per transaction.
    async fn lock_user(&mut self, user_id: UserId) -> CoreResult<()>;

    /// Whether a block record exists in either direction.
    async fn block_between(&mut self, a: UserId, b: UserId) -> CoreResult<bool>;

    async fn accepted_count(&mut self, user_id: UserId) -> CoreResult<i64>;

    async fn edge(&mut self, from: UserId, to: UserId) -> CoreResult<Option<RelationshipStatus>>;

    /// Insert the edge or overwrite its status.
    async fn upsert_edge(
        &mut self,
        from: UserId,
        to: UserId,
        status: RelationshipStatus,
    ) -> CoreResult<()>;

    /// Delete both directional edges. Returns the number of rows removed.
    async fn delete_edges_between(&mut self, a: UserId, b: UserId) -> CoreResult<u64>;

    /// Insert a block record; an existing identical record is left as is.
    async fn insert_block(&mut self, blocker: UserId, blocked: UserId) -> CoreResult<()>;

    async fn delete_block(&mut self, blocker: UserId, blocked: UserId) -> CoreResult<u64>;

    async fn commit(self: Box<Self>) -> CoreResult<()>;
}
