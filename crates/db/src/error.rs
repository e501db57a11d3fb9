//! Translation of sqlx failures into [`CoreError`].

use iris_core::error::CoreError;

/// PostgreSQL unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

/// Any storage failure the caller cannot act on.
pub fn internal(err: sqlx::Error) -> CoreError {
    CoreError::Internal(format!("database error: {err}"))
}

/// Map a failed `users` insert, recognising the uniqueness constraints by
/// name.
pub fn user_insert(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            match db_err.constraint() {
                Some("uq_users_email") => return CoreError::DuplicateEmail,
                Some("uq_users_username") => return CoreError::DuplicateUsername,
                _ => {}
            }
        }
    }
    internal(err)
}
