//! Repository for the `sessions` table.

use iris_core::session::NewSession;
use iris_core::types::{SessionId, Timestamp, UserId};
use sqlx::PgPool;

use crate::models::session::SessionRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, refresh_token_hash, device, os, ip_address, \
                        expires_at, created_at, updated_at";

/// Provides the session lifecycle queries.
pub struct SessionRepo;

impl SessionRepo {
    pub async fn create(pool: &PgPool, input: &NewSession) -> Result<SessionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO sessions (id, user_id, refresh_token_hash, device, os, ip_address, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(input.id)
            .bind(input.user_id)
            .bind(&input.refresh_token_hash)
            .bind(&input.device)
            .bind(&input.os)
            .bind(&input.ip_address)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Find a session by id, expired or not.
    pub async fn find_by_id(pool: &PgPool, id: SessionId) -> Result<Option<SessionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE id = $1");
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Compare-and-set rotation: replaces the hash only while it still equals
    /// `current_hash`. Returns `true` if this call won.
    pub async fn swap_refresh_token(
        pool: &PgPool,
        id: SessionId,
        current_hash: &str,
        next_hash: &str,
        expires_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sessions
             SET refresh_token_hash = $3, expires_at = $4, updated_at = NOW()
             WHERE id = $1 AND refresh_token_hash = $2",
        )
        .bind(id)
        .bind(current_hash)
        .bind(next_hash)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Delete a session by id and token hash together.
    pub async fn delete_matching(
        pool: &PgPool,
        id: SessionId,
        token_hash: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1 AND refresh_token_hash = $2")
            .bind(id)
            .bind(token_hash)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_all_for_user(pool: &PgPool, user_id: UserId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Unexpired sessions of a user, most recently used first.
    pub async fn list_active_for_user(
        pool: &PgPool,
        user_id: UserId,
    ) -> Result<Vec<SessionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sessions
             WHERE user_id = $1 AND expires_at > NOW()
             ORDER BY updated_at DESC"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Delete expired sessions. Returns the count of deleted rows.
    pub async fn cleanup_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
