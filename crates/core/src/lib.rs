//! Domain core for the Iris chat backend: session lifecycle, the
//! relationship state machine, and the store and collaborator contracts
//! they run against.

pub mod auth;
pub mod error;
pub mod memory;
pub mod notify;
pub mod relationship;
pub mod session;
pub mod store;
pub mod types;
pub mod user;
pub mod validation;
