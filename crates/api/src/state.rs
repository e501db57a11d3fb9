use std::sync::Arc;

use iris_core::auth::{AuthService, CredentialHasher};
use iris_core::memory::MemoryStore;
use iris_core::relationship::RelationshipManager;
use iris_core::session::SessionManager;
use iris_core::store::{CredentialStore, RelationshipStore, SessionStore};
use iris_db::{DbPool, PgStore};

use crate::auth::jwt::JwtCodec;
use crate::config::ServerConfig;
use crate::ws::WsManager;

/// The three persistence contracts, usually backed by one store.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn CredentialStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub relationships: Arc<dyn RelationshipStore>,
}

impl Stores {
    /// Use a single backend for every contract.
    pub fn shared<S>(store: S) -> Self
    where
        S: CredentialStore + SessionStore + RelationshipStore + 'static,
    {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            sessions: store.clone(),
            relationships: store,
        }
    }

    pub fn postgres(pool: DbPool) -> Self {
        Self::shared(PgStore::new(pool))
    }

    pub fn memory(store: MemoryStore) -> Self {
        Self::shared(store)
    }
}

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, absent when running on the in-memory store.
    pub db: Option<DbPool>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    pub users: Arc<dyn CredentialStore>,
    pub auth: AuthService,
    pub relationships: RelationshipManager,
    /// WebSocket connection manager; doubles as the notification sink.
    pub ws_manager: Arc<WsManager>,
}

impl AppState {
    /// Wire the managers over `stores` using the configured lifetimes and
    /// limits.
    pub fn new(
        config: ServerConfig,
        stores: Stores,
        hasher: Arc<dyn CredentialHasher>,
        ws_manager: Arc<WsManager>,
    ) -> Self {
        let sessions = SessionManager::with_ttl(stores.sessions, config.jwt.refresh_ttl());
        let tokens = Arc::new(JwtCodec::new(config.jwt.secret.clone()));
        let auth = AuthService::new(stores.users.clone(), sessions, hasher, tokens)
            .with_access_ttl(config.jwt.access_ttl());
        let relationships = RelationshipManager::new(
            stores.relationships,
            stores.users.clone(),
            ws_manager.clone(),
        )
        .with_max_friends(config.max_friends);

        Self {
            db: None,
            config: Arc::new(config),
            users: stores.users,
            auth,
            relationships,
            ws_manager,
        }
    }

    pub fn with_db(mut self, pool: DbPool) -> Self {
        self.db = Some(pool);
        self
    }
}
