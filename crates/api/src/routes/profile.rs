use axum::routing::{post, put};
use axum::Router;

use crate::handlers::profile;
use crate::state::AppState;

/// Routes mounted at `/profile`. All require auth.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", put(profile::update_profile))
        .route("/change-password", post(profile::change_password))
}
