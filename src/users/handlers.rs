use axum::{
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    routing::{get, patch},
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument};

use crate::{
    auth::{extractors::AuthUser, validate},
    error::{ApiError, ApiResult},
    response::ApiResponse,
    state::AppState,
    users::{
        dto::{ChannelProfile, PublicUser, UpdateAccountRequest, VideoSummary},
        media::{self, AVATAR_PREFIX, COVER_PREFIX},
        repo,
    },
};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/users/update-account", patch(update_account))
        .route("/users/avatar", patch(update_avatar))
        .route("/users/cover-image", patch(update_cover_image))
}

pub fn channel_routes() -> Router<AppState> {
    Router::new()
        .route("/users/channel/:username", get(channel_profile))
        .route("/users/history", get(watch_history))
}

#[instrument(skip(state, user, payload))]
async fn update_account(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<UpdateAccountRequest>,
) -> ApiResult<ApiResponse<PublicUser>> {
    let full_name = validate::required("fullName", &payload.full_name)?;
    let email = validate::normalized("email", &payload.email)?;
    validate::check_email(&email)?;

    let updated = repo::update_account(&state.db, user.id, &full_name, &email).await?;

    info!(user_id = %user.id, "account details updated");
    Ok(ApiResponse::ok(
        updated.into(),
        "account details updated successfully",
    ))
}

fn image_content_type(headers: &HeaderMap) -> &str {
    headers
        .get(CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("application/octet-stream")
}

#[instrument(skip(state, user, headers, body))]
async fn update_avatar(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<ApiResponse<PublicUser>> {
    let url = media::upload_image(&state, AVATAR_PREFIX, body, image_content_type(&headers)).await?;
    let updated = repo::update_avatar_url(&state.db, user.id, &url).await?;

    // New reference is committed; the replaced object is only cleaned up.
    media::delete_image_best_effort(&state, &user.avatar).await;

    info!(user_id = %user.id, "avatar updated");
    Ok(ApiResponse::ok(updated.into(), "avatar updated successfully"))
}

#[instrument(skip(state, user, headers, body))]
async fn update_cover_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<ApiResponse<PublicUser>> {
    let url = media::upload_image(&state, COVER_PREFIX, body, image_content_type(&headers)).await?;
    let updated = repo::update_cover_image_url(&state.db, user.id, &url).await?;

    if let Some(old) = user.cover_image.as_deref() {
        media::delete_image_best_effort(&state, old).await;
    }

    info!(user_id = %user.id, "cover image updated");
    Ok(ApiResponse::ok(
        updated.into(),
        "cover image updated successfully",
    ))
}

#[instrument(skip(state, viewer))]
async fn channel_profile(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    Path(username): Path<String>,
) -> ApiResult<ApiResponse<ChannelProfile>> {
    let username = validate::normalized("username", &username)?;

    let channel = repo::channel_profile(&state.db, &username, Some(viewer.id))
        .await?
        .ok_or_else(|| ApiError::NotFound("channel does not exist".into()))?;

    Ok(ApiResponse::ok(
        channel.into(),
        "channel profile fetched successfully",
    ))
}

#[instrument(skip(state, user))]
async fn watch_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<ApiResponse<Vec<VideoSummary>>> {
    let rows = repo::watch_history(&state.db, user.id).await?;
    let history: Vec<VideoSummary> = rows.into_iter().map(Into::into).collect();

    Ok(ApiResponse::ok(
        history,
        "watch history fetched successfully",
    ))
}
