use axum::routing::get;
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/users`. All require auth.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(users::me))
        .route("/id/{user_id}", get(users::get_by_id))
        .route("/username/{prefix}", get(users::search_by_username))
}
