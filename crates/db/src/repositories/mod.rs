//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods.
//! Read paths that never run inside a transaction take `&PgPool`; the
//! relationship and block queries take any [`sqlx::PgExecutor`] so they can
//! run on a pool or inside a [`sqlx::Transaction`].

pub mod block_repo;
pub mod relationship_repo;
pub mod session_repo;
pub mod user_repo;

pub use block_repo::BlockRepo;
pub use relationship_repo::RelationshipRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
