pub mod auth;
pub mod profile;
pub mod relationships;
pub mod users;
