use axum::{
    extract::{FromRef, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        cookies::{auth_cookies, clear_auth_cookies, cookie_value, REFRESH_COOKIE},
        dto::{
            AuthResponse, ChangePasswordRequest, LoginRequest, RefreshRequest, RegisterRequest,
            TokenPair,
        },
        extractors::AuthUser,
        jwt::TokenIssuer,
        password::{hash_password, verify_password},
        validate,
    },
    error::{ApiError, ApiResult},
    response::ApiResponse,
    state::AppState,
    users::{
        dto::PublicUser,
        media::{self, AVATAR_PREFIX, COVER_PREFIX},
        repo,
    },
};

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/logout", post(logout))
        .route("/users/refresh-token", post(refresh))
        .route("/users/change-password", post(change_password))
        .route("/users/current-user", get(current_user))
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<ApiResponse<PublicUser>> {
    let full_name = validate::required("fullName", &payload.full_name)?;
    let username = validate::normalized("username", &payload.username)?;
    let email = validate::normalized("email", &payload.email)?;
    validate::check_email(&email)?;
    validate::check_password(&payload.password)?;

    let avatar = payload
        .avatar
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ApiError::Validation("avatar is required".into()))?;

    // Friendlier early conflict; the unique index still decides on insert.
    if repo::username_or_email_taken(&state.db, &username, &email).await? {
        warn!(%username, "registration conflict");
        return Err(ApiError::Conflict(
            "user with this email or username already exists".into(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;

    let avatar_ct = payload.avatar_content_type.as_deref().unwrap_or("image/jpeg");
    let avatar_url = media::upload_image(
        &state,
        AVATAR_PREFIX,
        Bytes::from(avatar.into_vec()),
        avatar_ct,
    )
    .await?;

    let cover_image_url = match payload.cover_image.filter(|b| !b.is_empty()) {
        Some(cover) => {
            let ct = payload
                .cover_image_content_type
                .as_deref()
                .unwrap_or("image/jpeg");
            Some(media::upload_image(&state, COVER_PREFIX, Bytes::from(cover.into_vec()), ct).await?)
        }
        None => None,
    };

    let user = repo::create(
        &state.db,
        repo::NewUser {
            username: &username,
            email: &email,
            full_name: &full_name,
            password_hash: &password_hash,
            avatar_url: &avatar_url,
            cover_image_url: cover_image_url.as_deref(),
        },
    )
    .await?;

    info!(user_id = %user.id, %username, "user registered");
    Ok(ApiResponse::created(
        user.into(),
        "user registered successfully",
    ))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<(HeaderMap, ApiResponse<AuthResponse>)> {
    let identifier = payload
        .username
        .as_deref()
        .or(payload.email.as_deref())
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation("username or email is required".into()))?;
    let password = payload
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::Validation("password is required".into()))?;

    let user = repo::find_by_username_or_email(&state.db, &identifier)
        .await?
        .ok_or_else(|| ApiError::NotFound("user does not exist".into()))?;

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("invalid user credentials".into()));
    }

    let issuer = TokenIssuer::from_ref(&state);
    let access_token = issuer.sign_access(user.id, &user.username, &user.email)?;
    let refresh_token = issuer.sign_refresh(user.id)?;
    repo::set_refresh_token(&state.db, user.id, Some(&refresh_token)).await?;

    info!(user_id = %user.id, "user logged in");
    let headers = auth_cookies(
        &access_token,
        issuer.access_ttl(),
        &refresh_token,
        issuer.refresh_ttl(),
    );
    Ok((
        headers,
        ApiResponse::ok(
            AuthResponse {
                user: user.into(),
                access_token,
                refresh_token,
            },
            "user logged in successfully",
        ),
    ))
}

#[instrument(skip(state, user))]
async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<(HeaderMap, ApiResponse<()>)> {
    repo::set_refresh_token(&state.db, user.id, None).await?;
    info!(user_id = %user.id, "user logged out");
    Ok((
        clear_auth_cookies(),
        ApiResponse::ok((), "user logged out successfully"),
    ))
}

#[instrument(skip(state, headers, payload))]
async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Option<Json<RefreshRequest>>,
) -> ApiResult<(HeaderMap, ApiResponse<TokenPair>)> {
    let incoming = cookie_value(&headers, REFRESH_COOKIE)
        .or_else(|| payload.and_then(|Json(p)| p.refresh_token))
        .ok_or_else(|| ApiError::Unauthorized("unauthorized request".into()))?;

    let issuer = TokenIssuer::from_ref(&state);
    let claims = issuer
        .verify_refresh(&incoming)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let user = repo::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid refresh token".into()))?;

    let access_token = issuer.sign_access(user.id, &user.username, &user.email)?;
    let refresh_token = issuer.sign_refresh(user.id)?;

    // Rotation is a compare-and-swap: a token that was already rotated (or
    // cleared by logout) no longer matches and is rejected as a replay.
    let rotated =
        repo::rotate_refresh_token(&state.db, user.id, &incoming, &refresh_token).await?;
    if !rotated {
        warn!(user_id = %user.id, "stale refresh token replayed");
        return Err(ApiError::Unauthorized(
            "refresh token is expired or already used".into(),
        ));
    }

    info!(user_id = %user.id, "tokens refreshed");
    let headers = auth_cookies(
        &access_token,
        issuer.access_ttl(),
        &refresh_token,
        issuer.refresh_ttl(),
    );
    Ok((
        headers,
        ApiResponse::ok(
            TokenPair {
                access_token,
                refresh_token,
            },
            "access token refreshed",
        ),
    ))
}

#[instrument(skip(state, user, payload))]
async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<ApiResponse<()>> {
    validate::check_password(&payload.new_password)?;

    // The extractor hands out the sanitized projection; the hash comes from a
    // fresh row load.
    let record = repo::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("invalid access token".into()))?;

    if !verify_password(&payload.old_password, &record.password_hash)? {
        warn!(user_id = %user.id, "change password with wrong old password");
        return Err(ApiError::Unauthorized("incorrect old password".into()));
    }

    let new_hash = hash_password(&payload.new_password)?;
    repo::update_password_hash(&state.db, user.id, &new_hash).await?;

    info!(user_id = %user.id, "password changed");
    Ok(ApiResponse::ok((), "password changed successfully"))
}

#[instrument(skip(user))]
async fn current_user(AuthUser(user): AuthUser) -> ApiResponse<PublicUser> {
    ApiResponse::ok(user, "current user fetched successfully")
}

// Validation paths run before any store access, so these use the fake state.
#[cfg(test)]
mod tests {
    use super::*;

    fn register_payload() -> RegisterRequest {
        RegisterRequest {
            full_name: "Alice Example".into(),
            email: "alice@x.com".into(),
            username: "Alice".into(),
            password: "secret123".into(),
            avatar: Some(serde_bytes::ByteBuf::from(vec![1u8, 2, 3])),
            avatar_content_type: Some("image/png".into()),
            cover_image: None,
            cover_image_content_type: None,
        }
    }

    #[tokio::test]
    async fn register_rejects_blank_fields() {
        let st = AppState::fake();
        let mut payload = register_payload();
        payload.full_name = "   ".into();
        let err = register(State(st), Json(payload)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn register_rejects_short_password_and_bad_email() {
        let st = AppState::fake();
        let mut payload = register_payload();
        payload.password = "short".into();
        let err = register(State(st.clone()), Json(payload)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let mut payload = register_payload();
        payload.email = "not-an-email".into();
        let err = register(State(st), Json(payload)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn register_requires_avatar() {
        let st = AppState::fake();
        let mut payload = register_payload();
        payload.avatar = None;
        let err = register(State(st.clone()), Json(payload)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        // empty bytes count as missing
        let mut payload = register_payload();
        payload.avatar = Some(serde_bytes::ByteBuf::new());
        let err = register(State(st), Json(payload)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn login_requires_identifier_and_password() {
        let st = AppState::fake();
        let err = login(
            State(st.clone()),
            Json(LoginRequest {
                username: None,
                email: None,
                password: Some("secret123".into()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = login(
            State(st),
            Json(LoginRequest {
                username: Some("alice".into()),
                email: None,
                password: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn refresh_without_token_is_unauthorized() {
        let st = AppState::fake();
        let err = refresh(State(st), HeaderMap::new(), None).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn refresh_with_garbage_token_is_unauthorized() {
        let st = AppState::fake();
        let err = refresh(
            State(st),
            HeaderMap::new(),
            Some(Json(RefreshRequest {
                refresh_token: Some("not.a.jwt".into()),
            })),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn refresh_with_access_token_is_rejected() {
        // access secret differs from refresh secret; the token must not pass
        let st = AppState::fake();
        let issuer = TokenIssuer::from_ref(&st);
        let access = issuer
            .sign_access(uuid::Uuid::new_v4(), "alice", "alice@x.com")
            .unwrap();
        let err = refresh(
            State(st),
            HeaderMap::new(),
            Some(Json(RefreshRequest {
                refresh_token: Some(access),
            })),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
