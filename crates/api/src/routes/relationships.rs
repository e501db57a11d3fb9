//! Route definitions for the `/relationships` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::relationships;
use crate::state::AppState;

/// Routes mounted at `/relationships`. All require auth.
///
/// ```text
/// GET    /friends          -> friends
/// GET    /requests         -> requests
/// GET    /blocked          -> blocked
/// GET    /{user_id}        -> relationship_state
/// POST   /{user_id}        -> send_request
/// DELETE /{user_id}        -> unfriend
/// PUT    /{user_id}/block  -> block
/// DELETE /{user_id}/block  -> unblock
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/friends", get(relationships::friends))
        .route("/requests", get(relationships::requests))
        .route("/blocked", get(relationships::blocked))
        .route(
            "/{user_id}",
            get(relationships::relationship_state)
                .post(relationships::send_request)
                .delete(relationships::unfriend),
        )
        .route(
            "/{user_id}/block",
            put(relationships::block).delete(relationships::unblock),
        )
}
