//! `relationships` and `blocks` rows.

use iris_core::error::CoreError;
use iris_core::relationship::{PendingRequest, RequestDirection};
use iris_core::types::UserId;
use iris_core::user::UserSummary;
use sqlx::FromRow;

/// A pending edge joined with the other party's user columns.
#[derive(Debug, Clone, FromRow)]
pub struct PendingRow {
    /// `incoming` or `outgoing`, relative to the queried user.
    pub direction: String,
    pub id: UserId,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl TryFrom<PendingRow> for PendingRequest {
    type Error = CoreError;

    fn try_from(row: PendingRow) -> Result<Self, Self::Error> {
        let direction = match row.direction.as_str() {
            "incoming" => RequestDirection::Incoming,
            "outgoing" => RequestDirection::Outgoing,
            other => {
                return Err(CoreError::Internal(format!(
                    "unexpected request direction '{other}'"
                )))
            }
        };
        Ok(Self {
            direction,
            user: UserSummary {
                user_id: row.id,
                username: row.username,
                display_name: row.display_name,
                avatar_url: row.avatar_url,
            },
        })
    }
}
