//! Handlers for the `/users` resource.

use axum::extract::State;
use axum::Json;
use iris_core::error::CoreError;
use iris_core::types::UserId;
use iris_core::user::{PublicUser, UserProfile};

use crate::error::AppResult;
use crate::extract::PathParam;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Upper bound on username search results.
pub const SEARCH_LIMIT: i64 = 25;

/// GET /api/v1/users/me
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<UserProfile>>> {
    let user = state
        .users
        .find_by_id(auth_user.user_id)
        .await?
        .ok_or(CoreError::UserNotFound(auth_user.user_id))?;
    Ok(Json(DataResponse::new(UserProfile::from(&user))))
}

/// GET /api/v1/users/id/{user_id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    PathParam(user_id): PathParam<UserId>,
) -> AppResult<Json<DataResponse<PublicUser>>> {
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(CoreError::UserNotFound(user_id))?;
    Ok(Json(DataResponse::new(PublicUser::from(&user))))
}

/// GET /api/v1/users/username/{prefix}
///
/// Case-sensitive prefix match, ordered by username.
pub async fn search_by_username(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    PathParam(prefix): PathParam<String>,
) -> AppResult<Json<DataResponse<Vec<PublicUser>>>> {
    let users = state
        .users
        .find_by_username_prefix(&prefix, SEARCH_LIMIT)
        .await?;
    Ok(Json(DataResponse::new(
        users.iter().map(PublicUser::from).collect(),
    )))
}
