//! Handlers for the `/relationships` resource.
//!
//! Every mutation is performed by the authenticated caller (`A`) on the
//! user named in the path (`B`).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use iris_core::relationship::{FriendRequests, RelationshipState, RequestOutcome};
use iris_core::types::UserId;
use iris_core::user::UserSummary;
use serde::Serialize;

use crate::error::AppResult;
use crate::extract::PathParam;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RequestResult {
    pub result: RequestOutcome,
}

#[derive(Debug, Serialize)]
pub struct StateBody {
    pub state: RelationshipState,
}

/// Hide the fact that the other user blocked the caller.
fn visible_state(state: RelationshipState) -> RelationshipState {
    match state {
        RelationshipState::BlockedByB => RelationshipState::None,
        other => other,
    }
}

/// GET /api/v1/relationships/friends
pub async fn friends(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<UserSummary>>>> {
    let friends = state.relationships.friends(auth_user.user_id).await?;
    Ok(Json(DataResponse::new(friends)))
}

/// GET /api/v1/relationships/requests
pub async fn requests(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<FriendRequests>>> {
    let requests = state.relationships.requests(auth_user.user_id).await?;
    Ok(Json(DataResponse::new(requests)))
}

/// GET /api/v1/relationships/blocked
pub async fn blocked(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<UserSummary>>>> {
    let blocked = state.relationships.blocked(auth_user.user_id).await?;
    Ok(Json(DataResponse::new(blocked)))
}

/// GET /api/v1/relationships/{user_id}
pub async fn relationship_state(
    State(state): State<AppState>,
    auth_user: AuthUser,
    PathParam(other): PathParam<UserId>,
) -> AppResult<Json<DataResponse<StateBody>>> {
    let current = state.relationships.state(auth_user.user_id, other).await?;
    Ok(Json(DataResponse::new(StateBody {
        state: visible_state(current),
    })))
}

/// POST /api/v1/relationships/{user_id}
///
/// Send a friend request, or accept the one `user_id` already sent.
pub async fn send_request(
    State(state): State<AppState>,
    auth_user: AuthUser,
    PathParam(other): PathParam<UserId>,
) -> AppResult<Json<DataResponse<RequestResult>>> {
    let result = state.relationships.request(auth_user.user_id, other).await?;
    Ok(Json(DataResponse::new(RequestResult { result })))
}

/// DELETE /api/v1/relationships/{user_id}
///
/// Unfriend, cancel an outgoing request, or decline an incoming one.
pub async fn unfriend(
    State(state): State<AppState>,
    auth_user: AuthUser,
    PathParam(other): PathParam<UserId>,
) -> AppResult<StatusCode> {
    state.relationships.unfriend(auth_user.user_id, other).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/relationships/{user_id}/block
pub async fn block(
    State(state): State<AppState>,
    auth_user: AuthUser,
    PathParam(other): PathParam<UserId>,
) -> AppResult<StatusCode> {
    state.relationships.block(auth_user.user_id, other).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/relationships/{user_id}/block
pub async fn unblock(
    State(state): State<AppState>,
    auth_user: AuthUser,
    PathParam(other): PathParam<UserId>,
) -> AppResult<StatusCode> {
    state.relationships.unblock(auth_user.user_id, other).await?;
    Ok(StatusCode::NO_CONTENT)
}
