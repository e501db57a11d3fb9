//! In-process implementation of every store trait.
//!
//! Backs unit tests and the HTTP integration tests. A relationship
//! transaction holds the store mutex for its whole lifetime and works on a
//! staged copy of the graph, so commit is a swap and drop is a rollback.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{CoreError, CoreResult};
use crate::relationship::{PendingRequest, RelationshipStatus, RequestDirection};
use crate::session::{NewSession, Session};
use crate::store::{CredentialStore, RelationshipStore, RelationshipTx, SessionStore};
use crate::types::{new_id, SessionId, Timestamp, UserId};
use crate::user::{NewUser, UpdateProfile, User, UserSummary};

#[derive(Debug, Default, Clone)]
struct Graph {
    edges: HashMap<(UserId, UserId), RelationshipStatus>,
    blocks: HashSet<(UserId, UserId)>,
}

impl Graph {
    fn accepted_count(&self, user_id: UserId) -> i64 {
        self.edges
            .iter()
            .filter(|((from, _), status)| {
                *from == user_id && **status == RelationshipStatus::Accepted
            })
            .count() as i64
    }

    fn delete_edges_between(&mut self, a: UserId, b: UserId) -> u64 {
        let mut removed = 0;
        for key in [(a, b), (b, a)] {
            if self.edges.remove(&key).is_some() {
                removed += 1;
            }
        }
        removed
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    sessions: HashMap<SessionId, Session>,
    graph: Graph,
}

impl MemoryState {
    fn summaries<I>(&self, ids: I) -> Vec<UserSummary>
    where
        I: IntoIterator<Item = UserId>,
    {
        let mut out: Vec<UserSummary> = ids
            .into_iter()
            .filter_map(|id| self.users.get(&id).map(UserSummary::from))
            .collect();
        out.sort_by(|a, b| a.username.cmp(&b.username));
        out
    }
}

/// Shared in-memory store. Clones share state.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of session rows (expired or not) owned by `user_id`.
    pub async fn session_count(&self, user_id: UserId) -> usize {
        self.state
            .lock()
            .await
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_user(&self, input: &NewUser) -> CoreResult<User> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.email == input.email) {
            return Err(CoreError::DuplicateEmail);
        }
        if state.users.values().any(|u| u.username == input.username) {
            return Err(CoreError::DuplicateUsername);
        }

        let now = Utc::now();
        let user = User {
            id: new_id(),
            username: input.username.clone(),
            email: input.email.clone(),
            password_hash: input.password_hash.clone(),
            display_name: None,
            bio: None,
            avatar_url: None,
            custom_status: None,
            verified: false,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> CoreResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_username_prefix(&self, prefix: &str, limit: i64) -> CoreResult<Vec<User>> {
        let state = self.state.lock().await;
        let mut matches: Vec<User> = state
            .users
            .values()
            .filter(|u| u.username.starts_with(prefix))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.username.cmp(&b.username));
        matches.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(matches)
    }

    async fn update_profile(
        &self,
        id: UserId,
        input: &UpdateProfile,
    ) -> CoreResult<Option<User>> {
        let mut state = self.state.lock().await;
        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = &input.display_name {
            user.display_name = Some(v.clone());
        }
        if let Some(v) = &input.bio {
            user.bio = Some(v.clone());
        }
        if let Some(v) = &input.avatar_url {
            user.avatar_url = Some(v.clone());
        }
        if let Some(v) = &input.custom_status {
            user.custom_status = Some(v.clone());
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn update_password(&self, id: UserId, password_hash: &str) -> CoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert(&self, session: &NewSession) -> CoreResult<()> {
        let now = Utc::now();
        let row = Session {
            id: session.id,
            user_id: session.user_id,
            refresh_token_hash: session.refresh_token_hash.clone(),
            device: session.device.clone(),
            os: session.os.clone(),
            ip_address: session.ip_address.clone(),
            expires_at: session.expires_at,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.sessions.insert(row.id, row);
        Ok(())
    }

    async fn find(&self, id: SessionId) -> CoreResult<Option<Session>> {
        Ok(self.state.lock().await.sessions.get(&id).cloned())
    }

    async fn swap_refresh_token(
        &self,
        id: SessionId,
        current_hash: &str,
        next_hash: &str,
        expires_at: Timestamp,
    ) -> CoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.sessions.get_mut(&id) {
            Some(s) if s.refresh_token_hash == current_hash => {
                s.refresh_token_hash = next_hash.to_string();
                s.expires_at = expires_at;
                s.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: SessionId, token_hash: &str) -> CoreResult<u64> {
        let mut state = self.state.lock().await;
        let matches = state
            .sessions
            .get(&id)
            .is_some_and(|s| s.refresh_token_hash == token_hash);
        if matches {
            state.sessions.remove(&id);
            Ok(1)
        } else {
            Ok(0)
        }
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> CoreResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - state.sessions.len()) as u64)
    }

    async fn list_active_for_user(&self, user_id: UserId) -> CoreResult<Vec<Session>> {
        let now = Utc::now();
        let state = self.state.lock().await;
        let mut sessions: Vec<Session> = state
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && !s.is_expired_at(now))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn delete_expired(&self) -> CoreResult<u64> {
        let now = Utc::now();
        let mut state = self.state.lock().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| !s.is_expired_at(now));
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl RelationshipStore for MemoryStore {
    async fn begin(&self) -> CoreResult<Box<dyn RelationshipTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.graph.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }

    async fn fetch_friends(&self, user_id: UserId) -> CoreResult<Vec<UserSummary>> {
        let state = self.state.lock().await;
        let ids: Vec<UserId> = state
            .graph
            .edges
            .iter()
            .filter(|((from, _), status)| {
                *from == user_id && **status == RelationshipStatus::Accepted
            })
            .map(|((_, to), _)| *to)
            .collect();
        Ok(state.summaries(ids))
    }

    async fn fetch_pending(&self, user_id: UserId) -> CoreResult<Vec<PendingRequest>> {
        let state = self.state.lock().await;
        let mut pending = Vec::new();
        for ((from, to), status) in &state.graph.edges {
            if *status != RelationshipStatus::Pending {
                continue;
            }
            let (direction, other) = if *to == user_id {
                (RequestDirection::Incoming, *from)
            } else if *from == user_id {
                (RequestDirection::Outgoing, *to)
            } else {
                continue;
            };
            if let Some(user) = state.users.get(&other) {
                pending.push(PendingRequest {
                    direction,
                    user: UserSummary::from(user),
                });
            }
        }
        pending.sort_by(|a, b| a.user.username.cmp(&b.user.username));
        Ok(pending)
    }

    async fn fetch_blocked(&self, user_id: UserId) -> CoreResult<Vec<UserSummary>> {
        let state = self.state.lock().await;
        let ids: Vec<UserId> = state
            .graph
            .blocks
            .iter()
            .filter(|(blocker, _)| *blocker == user_id)
            .map(|(_, blocked)| *blocked)
            .collect();
        Ok(state.summaries(ids))
    }

    async fn edge(&self, from: UserId, to: UserId) -> CoreResult<Option<RelationshipStatus>> {
        Ok(self.state.lock().await.graph.edges.get(&(from, to)).copied())
    }

    async fn block_exists(&self, blocker: UserId, blocked: UserId) -> CoreResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .graph
            .blocks
            .contains(&(blocker, blocked)))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: Graph,
}

#[async_trait]
impl RelationshipTx for MemoryTx {
    async fn lock_pair(&mut self, _a: UserId, _b: UserId) -> CoreResult<()> {
        // The whole store is already held.
        Ok(())
    }

    async fn lock_user(&mut self, _user_id: UserId) -> CoreResult<()> {
        Ok(())
    }

    async fn block_between(&mut self, a: UserId, b: UserId) -> CoreResult<bool> {
        Ok(self.staged.blocks.contains(&(a, b)) || self.staged.blocks.contains(&(b, a)))
    }

    async fn accepted_count(&mut self, user_id: UserId) -> CoreResult<i64> {
        Ok(self.staged.accepted_count(user_id))
    }

    async fn edge(&mut self, from: UserId, to: UserId) -> CoreResult<Option<RelationshipStatus>> {
        Ok(self.staged.edges.get(&(from, to)).copied())
    }

    async fn upsert_edge(
        &mut self,
        from: UserId,
        to: UserId,
        status: RelationshipStatus,
    ) -> CoreResult<()> {
        if from == to {
            return Err(CoreError::SameUser);
        }
        self.staged.edges.insert((from, to), status);
        Ok(())
    }

    async fn delete_edges_between(&mut self, a: UserId, b: UserId) -> CoreResult<u64> {
        Ok(self.staged.delete_edges_between(a, b))
    }

    async fn insert_block(&mut self, blocker: UserId, blocked: UserId) -> CoreResult<()> {
        if blocker == blocked {
            return Err(CoreError::SameUser);
        }
        self.staged.blocks.insert((blocker, blocked));
        Ok(())
    }

    async fn delete_block(&mut self, blocker: UserId, blocked: UserId) -> CoreResult<u64> {
        Ok(u64::from(self.staged.blocks.remove(&(blocker, blocked))))
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        let MemoryTx { mut guard, staged } = *self;
        guard.graph = staged;
        Ok(())
    }
}
