//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /signup      -> signup
/// POST /login       -> login
/// POST /token       -> token (refresh)
/// POST /logout      -> logout (requires auth)
/// POST /logout-all  -> logout_all (requires auth)
/// GET  /sessions    -> sessions (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/token", post(auth::token))
        .route("/logout", post(auth::logout))
        .route("/logout-all", post(auth::logout_all))
        .route("/sessions", get(auth::sessions))
}
