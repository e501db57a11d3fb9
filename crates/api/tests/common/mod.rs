#![allow(dead_code)]

use std::sync::Arc;

use argon2::Params;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use iris_core::memory::MemoryStore;
use tower::ServiceExt;

use iris_api::auth::jwt::JwtConfig;
use iris_api::auth::password::Argon2Hasher;
use iris_api::config::ServerConfig;
use iris_api::router::build_app_router;
use iris_api::state::{AppState, Stores};
use iris_api::ws::WsManager;

pub const TEST_PASSWORD: &str = "hunter2hunter2";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        max_friends: 2500,
        session_cleanup_interval_secs: 3600,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 30,
        },
    }
}

/// Everything a test may want to poke at besides the router.
pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    pub ws_manager: Arc<WsManager>,
}

impl TestApp {
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Full application router over a fresh in-memory store, with the
/// production middleware stack.
pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config())
}

pub fn build_test_app_with(config: ServerConfig) -> TestApp {
    let store = MemoryStore::new();
    let ws_manager = Arc::new(WsManager::new());
    // Minimal Argon2 cost keeps debug-build tests fast.
    let hasher = Argon2Hasher::with_params(Params::new(1024, 1, 1, None).unwrap());

    let state = AppState::new(
        config.clone(),
        Stores::memory(store.clone()),
        Arc::new(hasher),
        Arc::clone(&ws_manager),
    );

    TestApp {
        router: build_app_router(state, &config),
        store,
        ws_manager,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, empty_request(Method::GET, uri, None)).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, empty_request(Method::GET, uri, Some(token))).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, json_request(Method::POST, uri, None, body)).await
}

/// POST an arbitrary, possibly malformed, JSON body.
pub async fn post_raw(app: Router, uri: &str, body: &'static str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, json_request(Method::POST, uri, Some(token), body)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, empty_request(Method::POST, uri, Some(token))).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, json_request(Method::PUT, uri, Some(token), body)).await
}

pub async fn put_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, empty_request(Method::PUT, uri, Some(token))).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, empty_request(Method::DELETE, uri, Some(token))).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Account helpers
// ---------------------------------------------------------------------------

/// A signed-up user as seen by the client.
#[derive(Debug, Clone)]
pub struct Account {
    pub user_id: String,
    pub session_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl Account {
    fn from_auth_body(json: &serde_json::Value) -> Self {
        let data = &json["data"];
        Self {
            user_id: data["user"]["userID"].as_str().unwrap().to_string(),
            session_id: data["sessionID"].as_str().unwrap().to_string(),
            access_token: data["tokens"]["accessToken"].as_str().unwrap().to_string(),
            refresh_token: data["tokens"]["refreshToken"].as_str().unwrap().to_string(),
        }
    }
}

pub fn signup_body(username: &str) -> serde_json::Value {
    serde_json::json!({
        "email": format!("{username}@example.com"),
        "username": username,
        "password": TEST_PASSWORD,
        "platform": "web",
        "os": "linux",
    })
}

/// Sign up `username` through the API.
pub async fn signup(app: &TestApp, username: &str) -> Account {
    let response = post_json(app.router(), "/api/v1/auth/signup", signup_body(username)).await;
    assert_eq!(response.status(), 201, "signup of {username} failed");
    Account::from_auth_body(&body_json(response).await)
}

/// Log `username` in again, opening another device session.
pub async fn login(app: &TestApp, username: &str) -> Account {
    let body = serde_json::json!({
        "email": format!("{username}@example.com"),
        "password": TEST_PASSWORD,
        "platform": "ios",
        "os": "ios 18",
    });
    let response = post_json(app.router(), "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), 200, "login of {username} failed");
    Account::from_auth_body(&body_json(response).await)
}
