//! [`PgStore`]: the core store traits over a PostgreSQL pool.

use async_trait::async_trait;
use iris_core::error::CoreResult;
use iris_core::relationship::{PendingRequest, RelationshipStatus};
use iris_core::session::{NewSession, Session};
use iris_core::store::{CredentialStore, RelationshipStore, RelationshipTx, SessionStore};
use iris_core::types::{new_id, SessionId, Timestamp, UserId};
use iris_core::user::{NewUser, UpdateProfile, User, UserSummary};
use sqlx::{Postgres, Transaction};

use crate::error::{internal, user_insert};
use crate::repositories::{BlockRepo, RelationshipRepo, SessionRepo, UserRepo};
use crate::DbPool;

/// Cheaply cloneable handle implementing every store trait.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn parse_status(raw: Option<String>) -> CoreResult<Option<RelationshipStatus>> {
    raw.map(|s| s.parse()).transpose()
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn create_user(&self, input: &NewUser) -> CoreResult<User> {
        UserRepo::create(&self.pool, new_id(), input)
            .await
            .map(User::from)
            .map_err(user_insert)
    }

    async fn find_by_id(&self, id: UserId) -> CoreResult<Option<User>> {
        let row = UserRepo::find_by_id(&self.pool, id).await.map_err(internal)?;
        Ok(row.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let row = UserRepo::find_by_email(&self.pool, email)
            .await
            .map_err(internal)?;
        Ok(row.map(User::from))
    }

    async fn find_by_username_prefix(&self, prefix: &str, limit: i64) -> CoreResult<Vec<User>> {
        let rows = UserRepo::find_by_username_prefix(&self.pool, prefix, limit)
            .await
            .map_err(internal)?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn update_profile(
        &self,
        id: UserId,
        input: &UpdateProfile,
    ) -> CoreResult<Option<User>> {
        let row = UserRepo::update_profile(&self.pool, id, input)
            .await
            .map_err(internal)?;
        Ok(row.map(User::from))
    }

    async fn update_password(&self, id: UserId, password_hash: &str) -> CoreResult<bool> {
        UserRepo::update_password(&self.pool, id, password_hash)
            .await
            .map_err(internal)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert(&self, session: &NewSession) -> CoreResult<()> {
        SessionRepo::create(&self.pool, session)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn find(&self, id: SessionId) -> CoreResult<Option<Session>> {
        let row = SessionRepo::find_by_id(&self.pool, id)
            .await
            .map_err(internal)?;
        Ok(row.map(Session::from))
    }

    async fn swap_refresh_token(
        &self,
        id: SessionId,
        current_hash: &str,
        next_hash: &str,
        expires_at: Timestamp,
    ) -> CoreResult<bool> {
        SessionRepo::swap_refresh_token(&self.pool, id, current_hash, next_hash, expires_at)
            .await
            .map_err(internal)
    }

    async fn delete(&self, id: SessionId, token_hash: &str) -> CoreResult<u64> {
        SessionRepo::delete_matching(&self.pool, id, token_hash)
            .await
            .map_err(internal)
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> CoreResult<u64> {
        SessionRepo::delete_all_for_user(&self.pool, user_id)
            .await
            .map_err(internal)
    }

    async fn list_active_for_user(&self, user_id: UserId) -> CoreResult<Vec<Session>> {
        let rows = SessionRepo::list_active_for_user(&self.pool, user_id)
            .await
            .map_err(internal)?;
        Ok(rows.into_iter().map(Session::from).collect())
    }

    async fn delete_expired(&self) -> CoreResult<u64> {
        SessionRepo::cleanup_expired(&self.pool)
            .await
            .map_err(internal)
    }
}

#[async_trait]
impl RelationshipStore for PgStore {
    async fn begin(&self) -> CoreResult<Box<dyn RelationshipTx>> {
        let tx = self.pool.begin().await.map_err(internal)?;
        Ok(Box::new(PgRelationshipTx { tx }))
    }

    async fn fetch_friends(&self, user_id: UserId) -> CoreResult<Vec<UserSummary>> {
        let rows = RelationshipRepo::list_friends(&self.pool, user_id)
            .await
            .map_err(internal)?;
        Ok(rows.into_iter().map(UserSummary::from).collect())
    }

    async fn fetch_pending(&self, user_id: UserId) -> CoreResult<Vec<PendingRequest>> {
        let rows = RelationshipRepo::list_pending(&self.pool, user_id)
            .await
            .map_err(internal)?;
        rows.into_iter().map(PendingRequest::try_from).collect()
    }

    async fn fetch_blocked(&self, user_id: UserId) -> CoreResult<Vec<UserSummary>> {
        let rows = BlockRepo::list_blocked(&self.pool, user_id)
            .await
            .map_err(internal)?;
        Ok(rows.into_iter().map(UserSummary::from).collect())
    }

    async fn edge(&self, from: UserId, to: UserId) -> CoreResult<Option<RelationshipStatus>> {
        let raw = RelationshipRepo::find_status(&self.pool, from, to)
            .await
            .map_err(internal)?;
        parse_status(raw)
    }

    async fn block_exists(&self, blocker: UserId, blocked: UserId) -> CoreResult<bool> {
        BlockRepo::exists(&self.pool, blocker, blocked)
            .await
            .map_err(internal)
    }
}

/// A relationship unit of work. Dropping it without
/// [`commit`](RelationshipTx::commit) rolls back.
pub struct PgRelationshipTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl RelationshipTx for PgRelationshipTx {
    async fn lock_pair(&mut self, a: UserId, b: UserId) -> CoreResult<()> {
        RelationshipRepo::lock_pair(&mut *self.tx, a, b)
            .await
            .map_err(internal)
    }

    async fn lock_user(&mut self, user_id: UserId) -> CoreResult<()> {
        RelationshipRepo::lock_user(&mut *self.tx, user_id)
            .await
            .map_err(internal)
    }

    async fn block_between(&mut self, a: UserId, b: UserId) -> CoreResult<bool> {
        BlockRepo::exists_between(&mut *self.tx, a, b)
            .await
            .map_err(internal)
    }

    async fn accepted_count(&mut self, user_id: UserId) -> CoreResult<i64> {
        RelationshipRepo::count_accepted(&mut *self.tx, user_id)
            .await
            .map_err(internal)
    }

    async fn edge(&mut self, from: UserId, to: UserId) -> CoreResult<Option<RelationshipStatus>> {
        let raw = RelationshipRepo::find_status(&mut *self.tx, from, to)
            .await
            .map_err(internal)?;
        parse_status(raw)
    }

    async fn upsert_edge(
        &mut self,
        from: UserId,
        to: UserId,
        status: RelationshipStatus,
    ) -> CoreResult<()> {
        RelationshipRepo::upsert(&mut *self.tx, from, to, status.as_str())
            .await
            .map_err(internal)
    }

    async fn delete_edges_between(&mut self, a: UserId, b: UserId) -> CoreResult<u64> {
        RelationshipRepo::delete_between(&mut *self.tx, a, b)
            .await
            .map_err(internal)
    }

    async fn insert_block(&mut self, blocker: UserId, blocked: UserId) -> CoreResult<()> {
        BlockRepo::insert(&mut *self.tx, blocker, blocked)
            .await
            .map_err(internal)
    }

    async fn delete_block(&mut self, blocker: UserId, blocked: UserId) -> CoreResult<u64> {
        BlockRepo::delete(&mut *self.tx, blocker, blocked)
            .await
            .map_err(internal)
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        self.tx.commit().await.map_err(internal)
    }
}
