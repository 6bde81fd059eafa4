use serde::{Deserialize, Serialize};

use crate::users::dto::PublicUser;

/// Registration body. Image bytes ride in the JSON payload; missing
/// optional fields map to validation errors in the handler rather than
/// deserialization rejections.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub avatar: Option<serde_bytes::ByteBuf>,
    #[serde(default)]
    pub avatar_content_type: Option<String>,
    #[serde(default)]
    pub cover_image: Option<serde_bytes::ByteBuf>,
    #[serde(default)]
    pub cover_image_content_type: Option<String>,
}

/// Login by username or email.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Body returned by login: sanitized user plus both tokens (clients that
/// cannot use the cookies read them from here).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
