//! HTTP-level integration tests for the friend-request state machine,
//! including the realtime pushes it emits.

mod common;

use std::time::Duration;

use axum::extract::ws::Message;
use axum::http::StatusCode;
use common::{
    body_json, build_test_app, build_test_app_with, delete_auth, get_auth, post_auth, put_auth,
    signup, test_config, Account, TestApp,
};
use tokio::sync::mpsc::UnboundedReceiver;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn request(app: &TestApp, from: &Account, to: &Account) -> axum::response::Response {
    post_auth(
        app.router(),
        &format!("/api/v1/relationships/{}", to.user_id),
        &from.access_token,
    )
    .await
}

async fn state_of(app: &TestApp, from: &Account, to: &Account) -> String {
    let response = get_auth(
        app.router(),
        &format!("/api/v1/relationships/{}", to.user_id),
        &from.access_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"]["state"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn friend_names(app: &TestApp, who: &Account) -> Vec<String> {
    let response = get_auth(
        app.router(),
        "/api/v1/relationships/friends",
        &who.access_token,
    )
    .await;
    body_json(response).await["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap().to_string())
        .collect()
}

/// Wait for the next text frame, failing after a second.
async fn next_frame(rx: &mut UnboundedReceiver<Message>) -> serde_json::Value {
    let msg = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("channel closed");
    match msg {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Request / accept
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reciprocal_requests_become_friendship() {
    let app = build_test_app();
    let ada = signup(&app, "ada").await;
    let bob = signup(&app, "bob").await;

    let response = request(&app, &ada, &bob).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["result"], "REQUEST_SENT");
    assert_eq!(state_of(&app, &ada, &bob).await, "PENDING_OUTGOING");
    assert_eq!(state_of(&app, &bob, &ada).await, "PENDING_INCOMING");

    let response = get_auth(
        app.router(),
        "/api/v1/relationships/requests",
        &bob.access_token,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["incoming"][0]["username"], "ada");
    assert_eq!(json["data"]["outgoing"].as_array().unwrap().len(), 0);

    let response = request(&app, &bob, &ada).await;
    assert_eq!(body_json(response).await["data"]["result"], "REQUEST_ACCEPTED");
    assert_eq!(state_of(&app, &ada, &bob).await, "ACCEPTED");
    assert_eq!(friend_names(&app, &ada).await, ["bob"]);
    assert_eq!(friend_names(&app, &bob).await, ["ada"]);
}

#[tokio::test]
async fn repeated_request_is_idempotent() {
    let app = build_test_app();
    let ada = signup(&app, "ada").await;
    let bob = signup(&app, "bob").await;

    request(&app, &ada, &bob).await;
    let response = request(&app, &ada, &bob).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["data"]["result"],
        "REQUEST_ALREADY_SENT"
    );
}

#[tokio::test]
async fn request_edge_cases() {
    let app = build_test_app();
    let ada = signup(&app, "ada").await;
    let bob = signup(&app, "bob").await;

    let response = request(&app, &ada, &ada).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "SAME_USER");

    let ghost = Account {
        user_id: uuid::Uuid::now_v7().to_string(),
        ..ada.clone()
    };
    let response = request(&app, &ada, &ghost).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "USER_NOT_FOUND");

    request(&app, &ada, &bob).await;
    request(&app, &bob, &ada).await;
    let response = request(&app, &ada, &bob).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "RELATIONSHIP_EXISTS");
}

#[tokio::test]
async fn malformed_user_id_uses_error_envelope() {
    let app = build_test_app();
    let ada = signup(&app, "ada").await;

    let response = post_auth(
        app.router(),
        "/api/v1/relationships/not-a-uuid",
        &ada.access_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");

    let response = get_auth(app.router(), "/api/v1/users/id/42", &ada.access_token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn friend_cap_is_enforced() {
    let mut config = test_config();
    config.max_friends = 1;
    let app = build_test_app_with(config);
    let ada = signup(&app, "ada").await;
    let bob = signup(&app, "bob").await;
    let cy = signup(&app, "cy").await;

    request(&app, &ada, &bob).await;
    request(&app, &bob, &ada).await;

    let response = request(&app, &ada, &cy).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["code"], "MAX_FRIENDS");
}

// ---------------------------------------------------------------------------
// Unfriend / block / unblock
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unfriend_clears_both_directions() {
    let app = build_test_app();
    let ada = signup(&app, "ada").await;
    let bob = signup(&app, "bob").await;
    request(&app, &ada, &bob).await;
    request(&app, &bob, &ada).await;

    let response = delete_auth(
        app.router(),
        &format!("/api/v1/relationships/{}", ada.user_id),
        &bob.access_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(state_of(&app, &ada, &bob).await, "NONE");
    assert!(friend_names(&app, &ada).await.is_empty());
}

#[tokio::test]
async fn block_masks_state_for_the_blocked_user() {
    let app = build_test_app();
    let ada = signup(&app, "ada").await;
    let bob = signup(&app, "bob").await;
    request(&app, &ada, &bob).await;
    request(&app, &bob, &ada).await;

    let block_uri = format!("/api/v1/relationships/{}/block", bob.user_id);
    let response = put_auth(app.router(), &block_uri, &ada.access_token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(state_of(&app, &ada, &bob).await, "BLOCKED_BY_A");
    // Bob cannot tell he was blocked.
    assert_eq!(state_of(&app, &bob, &ada).await, "NONE");
    assert!(friend_names(&app, &bob).await.is_empty());

    let response = request(&app, &bob, &ada).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "RECIPIENT_BLOCKED");

    let response = get_auth(
        app.router(),
        "/api/v1/relationships/blocked",
        &ada.access_token,
    )
    .await;
    assert_eq!(body_json(response).await["data"][0]["username"], "bob");

    // Blocking twice is idempotent.
    let response = put_auth(app.router(), &block_uri, &ada.access_token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = delete_auth(app.router(), &block_uri, &ada.access_token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(state_of(&app, &ada, &bob).await, "NONE");

    // Unblocking does not restore the friendship.
    assert!(friend_names(&app, &ada).await.is_empty());
    let response = request(&app, &bob, &ada).await;
    assert_eq!(body_json(response).await["data"]["result"], "REQUEST_SENT");
}

// ---------------------------------------------------------------------------
// Realtime pushes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn friend_events_reach_every_device_of_the_recipient() {
    let app = build_test_app();
    let ada = signup(&app, "ada").await;
    let bob = signup(&app, "bob").await;
    let bob_id: uuid::Uuid = bob.user_id.parse().unwrap();
    let ada_id: uuid::Uuid = ada.user_id.parse().unwrap();

    let mut bob_phone = app.ws_manager.add("bob-phone".into(), bob_id).await;
    let mut bob_laptop = app.ws_manager.add("bob-laptop".into(), bob_id).await;
    let mut ada_phone = app.ws_manager.add("ada-phone".into(), ada_id).await;

    request(&app, &ada, &bob).await;
    for rx in [&mut bob_phone, &mut bob_laptop] {
        let frame = next_frame(rx).await;
        assert_eq!(frame["type"], "FRIEND_STATUS");
        assert_eq!(frame["data"]["type"], "REQUEST");
        assert_eq!(frame["data"]["userID"], ada.user_id.as_str());
    }

    request(&app, &bob, &ada).await;
    let frame = next_frame(&mut ada_phone).await;
    assert_eq!(frame["data"]["type"], "ACCEPTED");
    assert_eq!(frame["data"]["userID"], bob.user_id.as_str());

    delete_auth(
        app.router(),
        &format!("/api/v1/relationships/{}", bob.user_id),
        &ada.access_token,
    )
    .await;
    let frame = next_frame(&mut bob_phone).await;
    assert_eq!(frame["data"]["type"], "REMOVED");
    assert_eq!(frame["data"]["userID"], ada.user_id.as_str());
}
