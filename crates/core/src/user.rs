//! User entity and its external projections.

use serde::{Deserialize, Serialize};

use crate::types::{Timestamp, UserId};

/// Full user record as owned by the credential store.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
/// Use [`UserProfile`] or [`PublicUser`] for external-facing output.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub custom_status: Option<String>,
    pub verified: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for creating a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Explicit per-field profile update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    #[serde(rename = "profilePictureURL")]
    pub avatar_url: Option<String>,
    pub custom_status: Option<String>,
}

impl UpdateProfile {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.bio.is_none()
            && self.avatar_url.is_none()
            && self.custom_status.is_none()
    }
}

/// The caller's own profile, including the email address.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "userID")]
    pub user_id: UserId,
    pub username: String,
    pub display_name: Option<String>,
    pub email: String,
    pub joined_at: Timestamp,
    pub updated_at: Timestamp,
    pub custom_status: Option<String>,
    #[serde(rename = "profilePictureURL")]
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            joined_at: user.created_at,
            updated_at: user.updated_at,
            custom_status: user.custom_status.clone(),
            avatar_url: user.avatar_url.clone(),
            bio: user.bio.clone(),
        }
    }
}

/// What any authenticated user may see about another user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "userID")]
    pub user_id: UserId,
    pub username: String,
    pub display_name: Option<String>,
    pub joined_at: Timestamp,
    pub custom_status: Option<String>,
    pub bio: Option<String>,
    #[serde(rename = "profilePictureURL")]
    pub avatar_url: Option<String>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            joined_at: user.created_at,
            custom_status: user.custom_status.clone(),
            bio: user.bio.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// Compact user card used in friend, request, and block lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "userID")]
    pub user_id: UserId,
    pub username: String,
    pub display_name: Option<String>,
    #[serde(rename = "profilePictureURL")]
    pub avatar_url: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}
