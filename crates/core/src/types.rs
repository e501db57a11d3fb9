use uuid::Uuid;

/// User identifiers are UUIDv7, so they sort by creation time.
pub type UserId = Uuid;

/// Session identifiers are UUIDv7, so they sort by issuance time.
pub type SessionId = Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh, unique, time-ordered identifier.
pub fn new_id() -> Uuid {
    Uuid::now_v7()
}
