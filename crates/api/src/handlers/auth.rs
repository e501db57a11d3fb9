//! Handlers for the `/auth` resource (signup, login, refresh, logout, sessions).

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use iris_core::auth::{Registration, TokenPair};
use iris_core::error::CoreError;
use iris_core::session::{DeviceInfo, SessionSummary};
use iris_core::types::SessionId;
use iris_core::user::UserProfile;
use iris_core::validation::{FieldCheck, Rule, Validate};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::extract::JsonBody;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

const EMAIL_RULES: &[Rule] = &[Rule::Email, Rule::Required];
const PASSWORD_RULES: &[Rule] = &[Rule::MinLen(8), Rule::MaxLen(50), Rule::Required];
const REQUIRED: &[Rule] = &[Rule::Required];

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/signup`.
///
/// Missing fields deserialize as empty strings so that validation reports
/// every problem at once.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub platform: String,
    pub os: String,
}

impl Validate for SignupRequest {
    fn schema(&self) -> Vec<FieldCheck<'_>> {
        vec![
            FieldCheck::new("Email", &self.email, EMAIL_RULES),
            FieldCheck::new(
                "Username",
                &self.username,
                &[Rule::MinLen(1), Rule::MaxLen(30), Rule::Required],
            ),
            FieldCheck::new("Password", &self.password, PASSWORD_RULES),
            FieldCheck::new("Platform", &self.platform, REQUIRED),
            FieldCheck::new("OS", &self.os, REQUIRED),
        ]
    }
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub platform: String,
    pub os: String,
}

impl Validate for LoginRequest {
    fn schema(&self) -> Vec<FieldCheck<'_>> {
        vec![
            FieldCheck::new("Email", &self.email, EMAIL_RULES),
            FieldCheck::new("Password", &self.password, PASSWORD_RULES),
            FieldCheck::new("Platform", &self.platform, REQUIRED),
            FieldCheck::new("OS", &self.os, REQUIRED),
        ]
    }
}

/// Request body for `POST /auth/token`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RefreshRequest {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    pub token: String,
}

impl Validate for RefreshRequest {
    fn schema(&self) -> Vec<FieldCheck<'_>> {
        vec![
            FieldCheck::new("SessionID", &self.session_id, REQUIRED),
            FieldCheck::new("Token", &self.token, REQUIRED),
        ]
    }
}

/// Request body for `POST /auth/logout`. The session comes from the access
/// token; the refresh token proves possession of it.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogoutRequest {
    pub token: String,
}

impl Validate for LogoutRequest {
    fn schema(&self) -> Vec<FieldCheck<'_>> {
        vec![FieldCheck::new("Token", &self.token, REQUIRED)]
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokensBody {
    pub access_token: String,
    pub refresh_token: String,
}

/// Successful signup and login response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(rename = "sessionID")]
    pub session_id: SessionId,
    pub tokens: TokensBody,
    pub token_type: &'static str,
    /// Access token lifetime in milliseconds.
    pub expires_in: i64,
    pub user: UserProfile,
}

/// Successful refresh response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[serde(rename = "sessionID")]
    pub session_id: SessionId,
    pub tokens: TokensBody,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct RevokedBody {
    pub revoked: u64,
}

const TOKEN_TYPE: &str = "Bearer";

fn split_tokens(tokens: TokenPair) -> (TokensBody, i64) {
    (
        TokensBody {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        },
        tokens.expires_in,
    )
}

/// Best-effort client address from proxy headers.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/signup
///
/// Create an account and log it in on the calling device.
pub async fn signup(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(input): JsonBody<SignupRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<AuthResponse>>)> {
    input.validate()?;

    let outcome = state
        .auth
        .register(Registration {
            username: input.username,
            email: input.email,
            password: input.password,
            device: DeviceInfo {
                device: input.platform,
                os: input.os,
                ip_address: client_ip(&headers),
            },
        })
        .await?;

    let (tokens, expires_in) = split_tokens(outcome.tokens);
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(AuthResponse {
            session_id: outcome.session_id,
            tokens,
            token_type: TOKEN_TYPE,
            expires_in,
            user: UserProfile::from(&outcome.user),
        })),
    ))
}

/// POST /api/v1/auth/login
///
/// Authenticate with email + password. Each login opens a new device session.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(input): JsonBody<LoginRequest>,
) -> AppResult<Json<DataResponse<AuthResponse>>> {
    input.validate()?;

    let device = DeviceInfo {
        device: input.platform,
        os: input.os,
        ip_address: client_ip(&headers),
    };
    let outcome = state
        .auth
        .login(&input.email, &input.password, &device)
        .await?;

    let (tokens, expires_in) = split_tokens(outcome.tokens);
    Ok(Json(DataResponse::new(AuthResponse {
        session_id: outcome.session_id,
        tokens,
        token_type: TOKEN_TYPE,
        expires_in,
        user: UserProfile::from(&outcome.user),
    })))
}

/// POST /api/v1/auth/token
///
/// Exchange a refresh token for a new token pair. Presenting an already
/// rotated token revokes every session of the owner.
pub async fn token(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<RefreshRequest>,
) -> AppResult<Json<DataResponse<RefreshResponse>>> {
    input.validate()?;

    // An id that cannot be parsed cannot name a live session.
    let session_id: SessionId = input
        .session_id
        .parse()
        .map_err(|_| CoreError::SessionExpired)?;

    let outcome = state.auth.refresh(session_id, &input.token).await?;

    let (tokens, expires_in) = split_tokens(outcome.tokens);
    Ok(Json(DataResponse::new(RefreshResponse {
        session_id: outcome.session_id,
        tokens,
        token_type: TOKEN_TYPE,
        expires_in,
    })))
}

/// POST /api/v1/auth/logout
///
/// End the caller's current session. Returns 204 No Content.
pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
    JsonBody(input): JsonBody<LogoutRequest>,
) -> AppResult<StatusCode> {
    input.validate()?;
    state.auth.logout(auth_user.session_id, &input.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/logout-all
///
/// End every session of the caller, on every device.
pub async fn logout_all(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<RevokedBody>>> {
    let revoked = state.auth.logout_all(auth_user.user_id).await?;
    Ok(Json(DataResponse::new(RevokedBody { revoked })))
}

/// GET /api/v1/auth/sessions
pub async fn sessions(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<SessionSummary>>>> {
    let sessions = state
        .auth
        .list_sessions(auth_user.user_id, auth_user.session_id)
        .await?;
    Ok(Json(DataResponse::new(sessions)))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_signup_reports_every_violation_in_order() {
        let input = SignupRequest {
            email: "nope".into(),
            password: "short".into(),
            ..Default::default()
        };

        let violations = match input.validate() {
            Err(CoreError::Validation(v)) => v,
            other => panic!("expected validation failure, got {other:?}"),
        };
        let fields: Vec<&str> = violations.iter().map(|v| v.field_name.as_str()).collect();
        assert_eq!(
            fields,
            ["Email", "Username", "Username", "Password", "Platform", "OS"]
        );
    }

    #[test]
    fn test_login_accepts_well_formed_input() {
        let input = LoginRequest {
            email: "ada@example.com".into(),
            password: "longenough".into(),
            platform: "web".into(),
            os: "linux".into(),
        };
        assert_matches!(input.validate(), Ok(()));
    }

    #[test]
    fn test_client_ip_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.7"));

        assert_eq!(client_ip(&HeaderMap::new()), None);
    }
}
