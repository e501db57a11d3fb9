//! Authentication primitives.
//!
//! - [`password`] -- Argon2id implementation of [`CredentialHasher`](iris_core::auth::CredentialHasher).
//! - [`jwt`] -- HS256 implementation of [`TokenCodec`](iris_core::auth::TokenCodec).

pub mod jwt;
pub mod password;
