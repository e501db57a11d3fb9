//! Row structs.
//!
//! Each submodule contains a `FromRow` struct matching the table layout and a
//! `From` conversion into the corresponding `iris_core` type.

pub mod relationship;
pub mod session;
pub mod user;
