//! Repository for the `blocks` table.

use iris_core::types::UserId;
use sqlx::{PgExecutor, PgPool};

use crate::models::user::UserSummaryRow;

pub struct BlockRepo;

impl BlockRepo {
    /// Whether `blocker` has blocked `blocked`.
    pub async fn exists<'e>(
        executor: impl PgExecutor<'e>,
        blocker: UserId,
        blocked: UserId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM blocks WHERE blocker_id = $1 AND blocked_id = $2)",
        )
        .bind(blocker)
        .bind(blocked)
        .fetch_one(executor)
        .await
    }

    /// Whether a block exists in either direction.
    pub async fn exists_between<'e>(
        executor: impl PgExecutor<'e>,
        a: UserId,
        b: UserId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM blocks
                WHERE (blocker_id = $1 AND blocked_id = $2)
                   OR (blocker_id = $2 AND blocked_id = $1)
             )",
        )
        .bind(a)
        .bind(b)
        .fetch_one(executor)
        .await
    }

    /// Insert a block record; an identical record is left untouched.
    pub async fn insert<'e>(
        executor: impl PgExecutor<'e>,
        blocker: UserId,
        blocked: UserId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO blocks (blocker_id, blocked_id) VALUES ($1, $2)
             ON CONFLICT (blocker_id, blocked_id) DO NOTHING",
        )
        .bind(blocker)
        .bind(blocked)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn delete<'e>(
        executor: impl PgExecutor<'e>,
        blocker: UserId,
        blocked: UserId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM blocks WHERE blocker_id = $1 AND blocked_id = $2")
            .bind(blocker)
            .bind(blocked)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Users blocked by `user_id`, by username.
    pub async fn list_blocked(
        pool: &PgPool,
        user_id: UserId,
    ) -> Result<Vec<UserSummaryRow>, sqlx::Error> {
        sqlx::query_as::<_, UserSummaryRow>(
            "SELECT u.id, u.username, u.display_name, u.avatar_url
             FROM blocks b
             JOIN users u ON u.id = b.blocked_id
             WHERE b.blocker_id = $1
             ORDER BY u.username",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
