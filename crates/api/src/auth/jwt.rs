//! JWT access-token generation and validation.
//!
//! Access tokens are HS256-signed JWTs containing a [`Claims`] payload that
//! binds the user to the session (device) the token was issued for.

use chrono::{Duration, Utc};
use iris_core::auth::{AccessClaims, TokenCodec, DEFAULT_ACCESS_EXPIRY_MINS};
use iris_core::error::{CoreError, CoreResult};
use iris_core::session::DEFAULT_REFRESH_EXPIRY_DAYS;
use iris_core::types::{SessionId, UserId};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the user id.
    pub sub: UserId,
    /// Session the token was issued for.
    pub sid: SessionId,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4).
    pub jti: String,
}

/// Configuration for access-token signing and session lifetime.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// Access token lifetime in minutes (default: 15).
    pub access_token_expiry_mins: i64,
    /// Refresh token (session) lifetime in days (default: 30).
    pub refresh_token_expiry_days: i64,
}

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                     | Required | Default |
    /// |-----------------------------|----------|---------|
    /// | `JWT_SECRET`                | **yes**  | --      |
    /// | `JWT_ACCESS_EXPIRY_MINS`    | no       | `15`    |
    /// | `REFRESH_TOKEN_EXPIRY_DAYS` | no       | `30`    |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let access_token_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");

        let refresh_token_expiry_days: i64 = std::env::var("REFRESH_TOKEN_EXPIRY_DAYS")
            .unwrap_or_else(|_| DEFAULT_REFRESH_EXPIRY_DAYS.to_string())
            .parse()
            .expect("REFRESH_TOKEN_EXPIRY_DAYS must be a valid i64");

        Self {
            secret,
            access_token_expiry_mins,
            refresh_token_expiry_days,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_expiry_mins)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::days(self.refresh_token_expiry_days)
    }
}

/// Generate an HS256 access token for the given user and session.
pub fn generate_access_token(
    user_id: UserId,
    session_id: SessionId,
    ttl: Duration,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        sid: session_id,
        exp: now + ttl.num_seconds(),
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validate and decode an access token, returning the embedded [`Claims`].
///
/// Validates the signature and expiration (with the library's default
/// 60-second leeway).
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// [`TokenCodec`] over a shared HMAC secret.
#[derive(Clone)]
pub struct JwtCodec {
    secret: String,
}

impl JwtCodec {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl TokenCodec for JwtCodec {
    fn sign(&self, user_id: UserId, session_id: SessionId, ttl: Duration) -> CoreResult<String> {
        generate_access_token(user_id, session_id, ttl, &self.secret)
            .map_err(|e| CoreError::Internal(format!("Token generation error: {e}")))
    }

    fn verify(&self, token: &str) -> CoreResult<AccessClaims> {
        let claims = validate_token(token, &self.secret).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => CoreError::TokenExpired,
            _ => CoreError::InvalidToken,
        })?;
        Ok(AccessClaims {
            user_id: claims.sub,
            session_id: claims.sid,
        })
    }
}
