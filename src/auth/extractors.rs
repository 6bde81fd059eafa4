use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use crate::{
    auth::{
        cookies::{cookie_value, ACCESS_COOKIE},
        jwt::TokenIssuer,
    },
    error::ApiError,
    state::AppState,
    users::{dto::PublicUser, repo},
};

/// Authenticates the request before a protected handler runs: access token
/// from the `accessToken` cookie or an `Authorization: Bearer` header, then a
/// user load so a deleted account cannot keep using live tokens. The handler
/// receives the sanitized projection only.
pub struct AuthUser(pub PublicUser);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| {
                h.strip_prefix("Bearer ")
                    .or_else(|| h.strip_prefix("bearer "))
            })
            .map(|t| t.to_string());

        let token = cookie_value(&parts.headers, ACCESS_COOKIE)
            .or(bearer)
            .ok_or_else(|| ApiError::Unauthorized("unauthorized request".into()))?;

        let issuer = TokenIssuer::new(&state.config.jwt);
        let claims = issuer.verify_access(&token).map_err(|e| {
            warn!(error = %e, "access token rejected");
            ApiError::Forbidden(e.to_string())
        })?;

        let user = repo::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or_else(|| ApiError::Forbidden("invalid access token".into()))?;

        Ok(AuthUser(user.into()))
    }
}
