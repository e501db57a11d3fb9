//! Session lifecycle: issuance, refresh-token rotation, replay detection,
//! and revocation.
//!
//! Refresh tokens are opaque random strings; only their SHA-256 hash is
//! stored, so a database leak does not expose live tokens. Rotation is a
//! compare-and-set on the stored hash: a token is single-use, and presenting
//! a token that no longer matches is treated as theft and revokes every
//! session of the owner.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::store::SessionStore;
use crate::types::{new_id, SessionId, Timestamp, UserId};

/// Default refresh token lifetime in days.
pub const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 30;

/// Device metadata recorded on each session.
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    pub device: String,
    pub os: String,
    pub ip_address: Option<String>,
}

/// A session row.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub refresh_token_hash: String,
    pub device: String,
    pub os: String,
    pub ip_address: Option<String>,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Session {
    /// A session past its expiry is dead even if the row still exists.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

/// Input for inserting a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub refresh_token_hash: String,
    pub device: String,
    pub os: String,
    pub ip_address: Option<String>,
    pub expires_at: Timestamp,
}

/// Result of [`SessionManager::issue`]. Carries the only plaintext copy of
/// the refresh token.
#[derive(Debug, Clone)]
pub struct SessionGrant {
    pub session_id: SessionId,
    pub refresh_token: String,
    pub expires_at: Timestamp,
}

/// Result of a successful [`SessionManager::rotate`].
#[derive(Debug, Clone)]
pub struct Rotation {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub refresh_token: String,
    pub expires_at: Timestamp,
}

/// Device-session listing entry; never contains the token hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    #[serde(rename = "sessionID")]
    pub session_id: SessionId,
    pub device: String,
    pub os: String,
    pub ip_address: Option<String>,
    pub expires_at: Timestamp,
    pub updated_at: Timestamp,
    pub current: bool,
}

/// Generate a cryptographically random refresh token.
///
/// Returns a tuple of `(plaintext_token, sha256_hex_hash)`. The plaintext is
/// sent to the client; only the hash is persisted.
pub fn generate_refresh_token() -> (String, String) {
    let plaintext = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    let hash = hash_refresh_token(&plaintext);
    (plaintext, hash)
}

/// Compute the SHA-256 hex digest of a refresh token.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Issues, rotates, and revokes device sessions.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self::with_ttl(store, Duration::days(DEFAULT_REFRESH_EXPIRY_DAYS))
    }

    pub fn with_ttl(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create a session for `user_id` on the given device.
    pub async fn issue(&self, user_id: UserId, device: &DeviceInfo) -> CoreResult<SessionGrant> {
        let (refresh_token, refresh_token_hash) = generate_refresh_token();
        let expires_at = Utc::now() + self.ttl;
        let session = NewSession {
            id: new_id(),
            user_id,
            refresh_token_hash,
            device: device.device.clone(),
            os: device.os.clone(),
            ip_address: device.ip_address.clone(),
            expires_at,
        };
        self.store.insert(&session).await?;

        tracing::debug!(%user_id, session_id = %session.id, "Session issued");
        Ok(SessionGrant {
            session_id: session.id,
            refresh_token,
            expires_at,
        })
    }

    /// Exchange `presented` for a fresh refresh token.
    ///
    /// - missing or expired session: `SessionExpired`
    /// - token mismatch, or losing the compare-and-set to a concurrent
    ///   rotation: every session of the owner is revoked, then
    ///   `InvalidSession`
    pub async fn rotate(&self, session_id: SessionId, presented: &str) -> CoreResult<Rotation> {
        let session = self
            .store
            .find(session_id)
            .await?
            .ok_or(CoreError::SessionExpired)?;

        let now = Utc::now();
        if session.is_expired_at(now) {
            return Err(CoreError::SessionExpired);
        }

        let presented_hash = hash_refresh_token(presented);
        if presented_hash != session.refresh_token_hash {
            return Err(self.reject_reuse(session.user_id, session_id).await);
        }

        let (refresh_token, next_hash) = generate_refresh_token();
        let expires_at = now + self.ttl;
        let swapped = self
            .store
            .swap_refresh_token(session_id, &presented_hash, &next_hash, expires_at)
            .await?;
        if !swapped {
            return Err(self.reject_reuse(session.user_id, session_id).await);
        }

        Ok(Rotation {
            session_id,
            user_id: session.user_id,
            refresh_token,
            expires_at,
        })
    }

    /// Delete one session, matching both id and token exactly.
    pub async fn revoke(&self, session_id: SessionId, refresh_token: &str) -> CoreResult<()> {
        let deleted = self
            .store
            .delete(session_id, &hash_refresh_token(refresh_token))
            .await?;
        if deleted == 0 {
            return Err(CoreError::NoSessionsFound);
        }
        tracing::debug!(%session_id, "Session revoked");
        Ok(())
    }

    /// Delete every session of `user_id`. Returns the number removed.
    pub async fn revoke_all(&self, user_id: UserId) -> CoreResult<u64> {
        let deleted = self.store.delete_all_for_user(user_id).await?;
        tracing::info!(%user_id, deleted, "All sessions revoked");
        Ok(deleted)
    }

    /// Live sessions of `user_id`, flagging the one identified by `current`.
    pub async fn list(
        &self,
        user_id: UserId,
        current: SessionId,
    ) -> CoreResult<Vec<SessionSummary>> {
        let sessions = self.store.list_active_for_user(user_id).await?;
        Ok(sessions
            .into_iter()
            .map(|s| SessionSummary {
                session_id: s.id,
                device: s.device,
                os: s.os,
                ip_address: s.ip_address,
                expires_at: s.expires_at,
                updated_at: s.updated_at,
                current: s.id == current,
            })
            .collect())
    }

    /// Remove expired rows. Returns the number removed.
    pub async fn purge_expired(&self) -> CoreResult<u64> {
        self.store.delete_expired().await
    }

    /// Theft response: revoke everything the owner has, then report the
    /// rejection. A failed revocation surfaces as `Internal`.
    async fn reject_reuse(&self, user_id: UserId, session_id: SessionId) -> CoreError {
        tracing::warn!(
            %user_id,
            %session_id,
            "Refresh token reuse detected, revoking all sessions"
        );
        match self.store.delete_all_for_user(user_id).await {
            Ok(revoked) => {
                tracing::warn!(%user_id, revoked, "Sessions revoked after token reuse");
                CoreError::InvalidSession
            }
            Err(e) => CoreError::Internal(format!(
                "failed to revoke sessions after refresh token reuse: {e}"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use super::*;
    use crate::memory::MemoryStore;

    fn device() -> DeviceInfo {
        DeviceInfo {
            device: "ios".into(),
            os: "ios17".into(),
            ip_address: Some("1.2.3.4".into()),
        }
    }

    fn manager(store: &MemoryStore) -> SessionManager {
        SessionManager::new(Arc::new(store.clone()))
    }

    #[test]
    fn refresh_token_hash_is_stable_hex() {
        let (plaintext, hash) = generate_refresh_token();
        assert_eq!(hash, hash_refresh_token(&plaintext));
        assert_eq!(hash.len(), 64);
        assert_eq!(plaintext.len(), 64);
    }

    #[test]
    fn refresh_tokens_are_unique() {
        let (a, _) = generate_refresh_token();
        let (b, _) = generate_refresh_token();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn issue_expires_thirty_days_out() {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        let user = new_id();

        let before = Utc::now();
        let grant = sessions.issue(user, &device()).await.unwrap();
        let after = Utc::now();

        assert!(grant.expires_at >= before + Duration::days(30));
        assert!(grant.expires_at <= after + Duration::days(30));
        assert_eq!(store.session_count(user).await, 1);
    }

    #[tokio::test]
    async fn rotate_replaces_token() {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        let user = new_id();
        let grant = sessions.issue(user, &device()).await.unwrap();

        let rotation = sessions
            .rotate(grant.session_id, &grant.refresh_token)
            .await
            .unwrap();

        assert_eq!(rotation.user_id, user);
        assert_eq!(rotation.session_id, grant.session_id);
        assert_ne!(rotation.refresh_token, grant.refresh_token);
    }

    #[tokio::test]
    async fn stale_token_revokes_every_session() {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        let user = new_id();
        let grant = sessions.issue(user, &device()).await.unwrap();
        let _other_device = sessions.issue(user, &device()).await.unwrap();

        let rt2 = sessions
            .rotate(grant.session_id, &grant.refresh_token)
            .await
            .unwrap()
            .refresh_token;

        let replay = sessions.rotate(grant.session_id, &grant.refresh_token).await;
        assert_matches!(replay, Err(CoreError::InvalidSession));
        assert_eq!(store.session_count(user).await, 0);

        let after = sessions.rotate(grant.session_id, &rt2).await;
        assert_matches!(after, Err(CoreError::SessionExpired));
    }

    #[tokio::test]
    async fn unknown_session_is_expired() {
        let store = MemoryStore::new();
        let result = manager(&store).rotate(new_id(), "whatever").await;
        assert_matches!(result, Err(CoreError::SessionExpired));
    }

    #[tokio::test]
    async fn expired_session_is_rejected_without_revoking() {
        let store = MemoryStore::new();
        let user = new_id();
        let (token, hash) = generate_refresh_token();
        let id = new_id();
        store
            .insert(&NewSession {
                id,
                user_id: user,
                refresh_token_hash: hash,
                device: "web".into(),
                os: "linux".into(),
                ip_address: None,
                expires_at: Utc::now() - Duration::seconds(1),
            })
            .await
            .unwrap();

        let result = manager(&store).rotate(id, &token).await;
        assert_matches!(result, Err(CoreError::SessionExpired));
        assert_eq!(store.session_count(user).await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_rotation_has_one_winner() {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        let grant = sessions.issue(new_id(), &device()).await.unwrap();

        let a = {
            let sessions = sessions.clone();
            let token = grant.refresh_token.clone();
            tokio::spawn(async move { sessions.rotate(grant.session_id, &token).await })
        };
        let b = {
            let sessions = sessions.clone();
            let token = grant.refresh_token.clone();
            tokio::spawn(async move { sessions.rotate(grant.session_id, &token).await })
        };
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        let wins = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(wins, 1, "exactly one rotation must succeed");
        let loser = if a.is_ok() { b } else { a };
        assert_matches!(loser, Err(CoreError::InvalidSession));
    }

    #[tokio::test]
    async fn revoke_requires_exact_match() {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        let user = new_id();
        let grant = sessions.issue(user, &device()).await.unwrap();

        assert_matches!(
            sessions.revoke(grant.session_id, "wrong").await,
            Err(CoreError::NoSessionsFound)
        );
        sessions
            .revoke(grant.session_id, &grant.refresh_token)
            .await
            .unwrap();
        assert_matches!(
            sessions.revoke(grant.session_id, &grant.refresh_token).await,
            Err(CoreError::NoSessionsFound)
        );
        assert_eq!(store.session_count(user).await, 0);
    }

    #[tokio::test]
    async fn revoke_all_only_touches_owner() {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        let (alice, bob) = (new_id(), new_id());
        sessions.issue(alice, &device()).await.unwrap();
        sessions.issue(alice, &device()).await.unwrap();
        sessions.issue(bob, &device()).await.unwrap();

        assert_eq!(sessions.revoke_all(alice).await.unwrap(), 2);
        assert_eq!(store.session_count(alice).await, 0);
        assert_eq!(store.session_count(bob).await, 1);
    }

    #[tokio::test]
    async fn list_flags_current_session() {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        let user = new_id();
        let first = sessions.issue(user, &device()).await.unwrap();
        sessions.issue(user, &device()).await.unwrap();

        let listed = sessions.list(user, first.session_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed.iter().filter(|s| s.current).count(), 1);
    }

    /// Delegates to a [`MemoryStore`] but refuses to revoke.
    struct RevokeFails(MemoryStore);

    #[async_trait]
    impl SessionStore for RevokeFails {
        async fn insert(&self, session: &NewSession) -> CoreResult<()> {
            self.0.insert(session).await
        }
        async fn find(&self, id: SessionId) -> CoreResult<Option<Session>> {
            self.0.find(id).await
        }
        async fn swap_refresh_token(
            &self,
            id: SessionId,
            current_hash: &str,
            next_hash: &str,
            expires_at: Timestamp,
        ) -> CoreResult<bool> {
            self.0
                .swap_refresh_token(id, current_hash, next_hash, expires_at)
                .await
        }
        async fn delete(&self, id: SessionId, token_hash: &str) -> CoreResult<u64> {
            self.0.delete(id, token_hash).await
        }
        async fn delete_all_for_user(&self, _user_id: UserId) -> CoreResult<u64> {
            Err(CoreError::Internal("connection reset".into()))
        }
        async fn list_active_for_user(&self, user_id: UserId) -> CoreResult<Vec<Session>> {
            self.0.list_active_for_user(user_id).await
        }
        async fn delete_expired(&self) -> CoreResult<u64> {
            self.0.delete_expired().await
        }
    }

    #[tokio::test]
    async fn failed_theft_response_is_internal() {
        let sessions = SessionManager::new(Arc::new(RevokeFails(MemoryStore::new())));
        let grant = sessions.issue(new_id(), &device()).await.unwrap();

        let result = sessions.rotate(grant.session_id, "stolen").await;
        assert_matches!(result, Err(CoreError::Internal(msg)) if msg.contains("reuse"));
    }
}
