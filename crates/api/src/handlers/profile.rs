//! Handlers for the caller's own profile.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use iris_core::error::CoreError;
use iris_core::user::{UpdateProfile, UserProfile};
use iris_core::validation::{FieldCheck, Rule, Validate};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extract::JsonBody;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `PUT /profile`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct UpdateProfileRequest(pub UpdateProfile);

impl Validate for UpdateProfileRequest {
    fn schema(&self) -> Vec<FieldCheck<'_>> {
        let p = &self.0;
        let slots: [(&'static str, &Option<String>, &'static [Rule]); 4] = [
            ("DisplayName", &p.display_name, &[Rule::MaxLen(32)]),
            ("Bio", &p.bio, &[Rule::MaxLen(190)]),
            ("CustomStatus", &p.custom_status, &[Rule::MaxLen(128)]),
            ("ProfilePictureURL", &p.avatar_url, &[Rule::MaxLen(2048)]),
        ];
        slots
            .into_iter()
            .filter_map(|(name, value, rules)| {
                value.as_deref().map(|v| FieldCheck::new(name, v, rules))
            })
            .collect()
    }
}

/// Request body for `POST /profile/change-password`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

impl Validate for ChangePasswordRequest {
    fn schema(&self) -> Vec<FieldCheck<'_>> {
        vec![
            FieldCheck::new(
                "OldPassword",
                &self.old_password,
                &[Rule::Required, Rule::MinLen(1)],
            ),
            FieldCheck::new(
                "NewPassword",
                &self.new_password,
                &[Rule::Required, Rule::MinLen(8), Rule::MaxLen(50)],
            ),
        ]
    }
}

/// PUT /api/v1/profile
///
/// Returns the updated profile.
pub async fn update_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
    JsonBody(input): JsonBody<UpdateProfileRequest>,
) -> AppResult<Json<DataResponse<UserProfile>>> {
    input.validate()?;
    if input.0.is_empty() {
        return Err(AppError::BadRequest("No profile fields to update".into()));
    }

    let user = state
        .users
        .update_profile(auth_user.user_id, &input.0)
        .await?
        .ok_or(CoreError::UserNotFound(auth_user.user_id))?;

    tracing::info!(user_id = %auth_user.user_id, "Profile updated");
    Ok(Json(DataResponse::new(UserProfile::from(&user))))
}

/// POST /api/v1/profile/change-password
///
/// Returns 204 No Content. Other sessions stay logged in.
pub async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    JsonBody(input): JsonBody<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    input.validate()?;
    state
        .auth
        .change_password(auth_user.user_id, &input.old_password, &input.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_checks_only_present_fields() {
        let input = UpdateProfileRequest(UpdateProfile {
            bio: Some("b".repeat(191)),
            ..Default::default()
        });

        let schema = input.schema();
        assert_eq!(schema.len(), 1);
        assert_eq!(schema[0].name, "Bio");
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_profile_request_deserializes_wire_names() {
        let input: UpdateProfileRequest =
            serde_json::from_str(r#"{"displayName":"Ada","profilePictureURL":"https://x"}"#)
                .unwrap();
        assert_eq!(input.0.display_name.as_deref(), Some("Ada"));
        assert_eq!(input.0.avatar_url.as_deref(), Some("https://x"));
        assert!(input.0.bio.is_none());
    }
}
