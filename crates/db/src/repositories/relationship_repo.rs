//! Repository for the `relationships` table (directed edges).

use iris_core::types::UserId;
use sqlx::{PgExecutor, PgPool};

use crate::models::relationship::PendingRow;
use crate::models::user::UserSummaryRow;

pub struct RelationshipRepo;

impl RelationshipRepo {
    /// Take a transaction-scoped advisory lock on the unordered pair. Both
    /// orderings of the same pair map to the same key.
    pub async fn lock_pair<'e>(
        executor: impl PgExecutor<'e>,
        a: UserId,
        b: UserId,
    ) -> Result<(), sqlx::Error> {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("relationship:{lo}:{hi}"))
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Transaction-scoped advisory lock on one user's friend list.
    pub async fn lock_user<'e>(
        executor: impl PgExecutor<'e>,
        user_id: UserId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("friends:{user_id}"))
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Status of the edge `from -> to`, if any.
    pub async fn find_status<'e>(
        executor: impl PgExecutor<'e>,
        from: UserId,
        to: UserId,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT status FROM relationships WHERE user_from = $1 AND user_to = $2")
            .bind(from)
            .bind(to)
            .fetch_optional(executor)
            .await
    }

    pub async fn count_accepted<'e>(
        executor: impl PgExecutor<'e>,
        user_id: UserId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM relationships WHERE user_from = $1 AND status = 'accepted'",
        )
        .bind(user_id)
        .fetch_one(executor)
        .await
    }

    /// Insert the edge, or overwrite the status of an existing one.
    pub async fn upsert<'e>(
        executor: impl PgExecutor<'e>,
        from: UserId,
        to: UserId,
        status: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO relationships (user_from, user_to, status)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_from, user_to)
             DO UPDATE SET status = EXCLUDED.status, updated_at = NOW()",
        )
        .bind(from)
        .bind(to)
        .bind(status)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Delete both directional edges. Returns the count of deleted rows.
    pub async fn delete_between<'e>(
        executor: impl PgExecutor<'e>,
        a: UserId,
        b: UserId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM relationships
             WHERE (user_from = $1 AND user_to = $2) OR (user_from = $2 AND user_to = $1)",
        )
        .bind(a)
        .bind(b)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Users with an accepted edge from `user_id`, by username.
    pub async fn list_friends(
        pool: &PgPool,
        user_id: UserId,
    ) -> Result<Vec<UserSummaryRow>, sqlx::Error> {
        sqlx::query_as::<_, UserSummaryRow>(
            "SELECT u.id, u.username, u.display_name, u.avatar_url
             FROM relationships r
             JOIN users u ON u.id = r.user_to
             WHERE r.user_from = $1 AND r.status = 'accepted'
             ORDER BY u.username",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Pending edges touching `user_id` in either direction, joined with the
    /// other party.
    pub async fn list_pending(pool: &PgPool, user_id: UserId) -> Result<Vec<PendingRow>, sqlx::Error> {
        sqlx::query_as::<_, PendingRow>(
            "SELECT CASE WHEN r.user_to = $1 THEN 'incoming' ELSE 'outgoing' END AS direction,
                    u.id, u.username, u.display_name, u.avatar_url
             FROM relationships r
             JOIN users u
               ON u.id = CASE WHEN r.user_to = $1 THEN r.user_from ELSE r.user_to END
             WHERE r.status = 'pending' AND (r.user_from = $1 OR r.user_to = $1)
             ORDER BY u.username",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
