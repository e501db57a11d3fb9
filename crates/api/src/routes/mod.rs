pub mod auth;
pub mod health;
pub mod profile;
pub mod relationships;
pub mod users;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws?token=                                       WebSocket (friend events)
///
/// /auth/signup                                     create account (public)
/// /auth/login                                      login (public)
/// /auth/token                                      refresh (public)
/// /auth/logout                                     end current session
/// /auth/logout-all                                 end every session
/// /auth/sessions                                   list device sessions
///
/// /users/me                                        own profile
/// /users/id/{user_id}                              public profile
/// /users/username/{prefix}                         username prefix search
///
/// /profile                                         update profile (PUT)
/// /profile/change-password                         change password (POST)
///
/// /relationships/friends                           accepted friends
/// /relationships/requests                          pending requests
/// /relationships/blocked                           blocked users
/// /relationships/{user_id}                         state, request, unfriend
/// /relationships/{user_id}/block                   block (PUT), unblock (DELETE)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/profile", profile::router())
        .nest("/relationships", relationships::router())
}
