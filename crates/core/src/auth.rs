//! Account registration, login, and token flows.
//!
//! [`AuthService`] composes the credential store with the
//! [`SessionManager`]; password hashing and access-token signing are
//! supplied by the transport layer through [`CredentialHasher`] and
//! [`TokenCodec`].

use std::sync::Arc;

use chrono::Duration;

use crate::error::{CoreError, CoreResult};
use crate::session::{DeviceInfo, SessionManager, SessionSummary};
use crate::store::CredentialStore;
use crate::types::{SessionId, UserId};
use crate::user::{NewUser, User};

/// Default access-token lifetime in minutes.
pub const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;

/// Black-box password hashing.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> CoreResult<String>;

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable.
    fn verify(&self, hash: &str, password: &str) -> CoreResult<bool>;
}

/// Identity carried by a verified access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessClaims {
    pub user_id: UserId,
    pub session_id: SessionId,
}

/// Signs and verifies short-lived access tokens.
pub trait TokenCodec: Send + Sync {
    fn sign(&self, user_id: UserId, session_id: SessionId, ttl: Duration) -> CoreResult<String>;

    /// Fails with `TokenExpired` or `InvalidToken`.
    fn verify(&self, token: &str) -> CoreResult<AccessClaims>;
}

/// Input for [`AuthService::register`]. Validated by the caller.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub device: DeviceInfo,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access-token lifetime in seconds.
    pub expires_in: i64,
}

/// Result of register and login.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub user: User,
    pub session_id: SessionId,
    pub tokens: TokenPair,
}

/// Result of a refresh.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    sessions: SessionManager,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<dyn TokenCodec>,
    access_ttl: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        sessions: SessionManager,
        hasher: Arc<dyn CredentialHasher>,
        tokens: Arc<dyn TokenCodec>,
    ) -> Self {
        Self {
            users,
            sessions,
            hasher,
            tokens,
            access_ttl: Duration::minutes(DEFAULT_ACCESS_EXPIRY_MINS),
        }
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Create the account and log the new user in on the given device.
    pub async fn register(&self, input: Registration) -> CoreResult<AuthOutcome> {
        let password_hash = self.hasher.hash(&input.password)?;
        let user = self
            .users
            .create_user(&NewUser {
                username: input.username,
                email: input.email,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        self.open_session(user, &input.device).await
    }

    /// Unknown email and wrong password are indistinguishable.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        device: &DeviceInfo,
    ) -> CoreResult<AuthOutcome> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(CoreError::InvalidCredentials)?;

        if !self.hasher.verify(&user.password_hash, password)? {
            tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
            return Err(CoreError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User logged in");
        self.open_session(user, device).await
    }

    /// Rotate the refresh token and sign a fresh access token.
    pub async fn refresh(
        &self,
        session_id: SessionId,
        refresh_token: &str,
    ) -> CoreResult<RefreshOutcome> {
        let rotation = self.sessions.rotate(session_id, refresh_token).await?;
        let access_token = self
            .tokens
            .sign(rotation.user_id, rotation.session_id, self.access_ttl)?;

        Ok(RefreshOutcome {
            user_id: rotation.user_id,
            session_id: rotation.session_id,
            tokens: TokenPair {
                access_token,
                refresh_token: rotation.refresh_token,
                expires_in: self.access_ttl.num_milliseconds(),
            },
        })
    }

    pub async fn logout(&self, session_id: SessionId, refresh_token: &str) -> CoreResult<()> {
        self.sessions.revoke(session_id, refresh_token).await
    }

    pub async fn logout_all(&self, user_id: UserId) -> CoreResult<u64> {
        self.sessions.revoke_all(user_id).await
    }

    pub fn authenticate(&self, access_token: &str) -> CoreResult<AccessClaims> {
        self.tokens.verify(access_token)
    }

    pub async fn list_sessions(
        &self,
        user_id: UserId,
        current: SessionId,
    ) -> CoreResult<Vec<SessionSummary>> {
        self.sessions.list(user_id, current).await
    }

    /// Replace the password after checking the old one. Existing sessions
    /// stay valid.
    pub async fn change_password(
        &self,
        user_id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> CoreResult<()> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(CoreError::UserNotFound(user_id))?;

        if !self.hasher.verify(&user.password_hash, old_password)? {
            return Err(CoreError::InvalidCredentials);
        }

        let password_hash = self.hasher.hash(new_password)?;
        if !self.users.update_password(user_id, &password_hash).await? {
            return Err(CoreError::UserNotFound(user_id));
        }
        tracing::info!(%user_id, "Password changed");
        Ok(())
    }

    async fn open_session(&self, user: User, device: &DeviceInfo) -> CoreResult<AuthOutcome> {
        let grant = self.sessions.issue(user.id, device).await?;
        let access_token = self
            .tokens
            .sign(user.id, grant.session_id, self.access_ttl)?;

        Ok(AuthOutcome {
            user,
            session_id: grant.session_id,
            tokens: TokenPair {
                access_token,
                refresh_token: grant.refresh_token,
                expires_in: self.access_ttl.num_milliseconds(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::memory::MemoryStore;

    struct PlainHasher;

    impl CredentialHasher for PlainHasher {
        fn hash(&self, password: &str) -> CoreResult<String> {
            Ok(format!("hashed:{password}"))
        }

        fn verify(&self, hash: &str, password: &str) -> CoreResult<bool> {
            Ok(hash == format!("hashed:{password}"))
        }
    }

    /// Encodes the claims as `user:session`; the literal `expired` fails.
    struct PlainCodec;

    impl TokenCodec for PlainCodec {
        fn sign(&self, user_id: UserId, session_id: SessionId, _ttl: Duration) -> CoreResult<String> {
            Ok(format!("{user_id}:{session_id}"))
        }

        fn verify(&self, token: &str) -> CoreResult<AccessClaims> {
            if token == "expired" {
                return Err(CoreError::TokenExpired);
            }
            let (user, session) = token.split_once(':').ok_or(CoreError::InvalidToken)?;
            Ok(AccessClaims {
                user_id: user.parse().map_err(|_| CoreError::InvalidToken)?,
                session_id: session.parse().map_err(|_| CoreError::InvalidToken)?,
            })
        }
    }

    fn service(store: &MemoryStore) -> AuthService {
        AuthService::new(
            Arc::new(store.clone()),
            SessionManager::new(Arc::new(store.clone())),
            Arc::new(PlainHasher),
            Arc::new(PlainCodec),
        )
    }

    fn registration(name: &str) -> Registration {
        Registration {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password: "password123".to_string(),
            device: DeviceInfo {
                device: "web".into(),
                os: "linux".into(),
                ip_address: None,
            },
        }
    }

    #[tokio::test]
    async fn register_issues_session_and_tokens() {
        let store = MemoryStore::new();
        let auth = service(&store);

        let outcome = auth.register(registration("ada")).await.unwrap();

        assert_eq!(outcome.user.username, "ada");
        assert_eq!(outcome.user.password_hash, "hashed:password123");
        assert_eq!(outcome.tokens.expires_in, 15 * 60 * 1000);
        let claims = auth.authenticate(&outcome.tokens.access_token).unwrap();
        assert_eq!(claims.user_id, outcome.user.id);
        assert_eq!(claims.session_id, outcome.session_id);
        assert_eq!(store.session_count(outcome.user.id).await, 1);
    }

    #[tokio::test]
    async fn duplicate_registration_is_conflict() {
        let store = MemoryStore::new();
        let auth = service(&store);
        auth.register(registration("ada")).await.unwrap();

        let mut again = registration("ada");
        again.email = "other@example.com".into();
        assert_matches!(auth.register(again).await, Err(CoreError::DuplicateUsername));
        assert_matches!(
            auth.register(registration("ada")).await,
            Err(CoreError::DuplicateEmail)
        );
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let store = MemoryStore::new();
        let auth = service(&store);
        auth.register(registration("ada")).await.unwrap();
        let device = DeviceInfo::default();

        assert_matches!(
            auth.login("ada@example.com", "wrong-password", &device).await,
            Err(CoreError::InvalidCredentials)
        );
        assert_matches!(
            auth.login("nobody@example.com", "password123", &device).await,
            Err(CoreError::InvalidCredentials)
        );

        let outcome = auth
            .login("ada@example.com", "password123", &device)
            .await
            .unwrap();
        assert_eq!(store.session_count(outcome.user.id).await, 2);
    }

    #[tokio::test]
    async fn refresh_then_replay_logs_out_everywhere() {
        let store = MemoryStore::new();
        let auth = service(&store);
        let first = auth.register(registration("ada")).await.unwrap();

        let refreshed = auth
            .refresh(first.session_id, &first.tokens.refresh_token)
            .await
            .unwrap();
        assert_eq!(refreshed.user_id, first.user.id);
        assert_ne!(refreshed.tokens.refresh_token, first.tokens.refresh_token);

        assert_matches!(
            auth.refresh(first.session_id, &first.tokens.refresh_token)
                .await,
            Err(CoreError::InvalidSession)
        );
        assert_eq!(store.session_count(first.user.id).await, 0);
    }

    #[tokio::test]
    async fn logout_removes_only_that_session() {
        let store = MemoryStore::new();
        let auth = service(&store);
        let first = auth.register(registration("ada")).await.unwrap();
        auth.login("ada@example.com", "password123", &DeviceInfo::default())
            .await
            .unwrap();

        auth.logout(first.session_id, &first.tokens.refresh_token)
            .await
            .unwrap();
        assert_eq!(store.session_count(first.user.id).await, 1);

        assert_eq!(auth.logout_all(first.user.id).await.unwrap(), 1);
        assert_eq!(store.session_count(first.user.id).await, 0);
    }

    #[test]
    fn authenticate_maps_codec_errors() {
        let auth = service(&MemoryStore::new());
        assert_matches!(auth.authenticate("expired"), Err(CoreError::TokenExpired));
        assert_matches!(auth.authenticate("garbage"), Err(CoreError::InvalidToken));
    }

    #[tokio::test]
    async fn change_password_requires_old_password() {
        let store = MemoryStore::new();
        let auth = service(&store);
        let user = auth.register(registration("ada")).await.unwrap().user;

        assert_matches!(
            auth.change_password(user.id, "nope", "new-password").await,
            Err(CoreError::InvalidCredentials)
        );
        auth.change_password(user.id, "password123", "new-password")
            .await
            .unwrap();

        let device = DeviceInfo::default();
        assert_matches!(
            auth.login("ada@example.com", "password123", &device).await,
            Err(CoreError::InvalidCredentials)
        );
        auth.login("ada@example.com", "new-password", &device)
            .await
            .unwrap();
        // Sessions opened before the change survive it.
        assert_eq!(store.session_count(user.id).await, 2);
    }
}
