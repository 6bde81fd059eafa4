use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database. `password_hash` and `refresh_token` never
/// leave the repo layer; outward projections use `PublicUser`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const USER_COLUMNS: &str = "id, username, email, full_name, password_hash, avatar_url, \
     cover_image_url, refresh_token, created_at, updated_at";

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub full_name: &'a str,
    pub password_hash: &'a str,
    pub avatar_url: &'a str,
    pub cover_image_url: Option<&'a str>,
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Lookup by login identifier. The caller lower-cases first; both columns are
/// stored lower-cased.
pub async fn find_by_username_or_email(db: &PgPool, ident: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $1"
    ))
    .bind(ident)
    .fetch_optional(db)
    .await
}

pub async fn username_or_email_taken(
    db: &PgPool,
    username: &str,
    email: &str,
) -> sqlx::Result<bool> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE username = $1 OR email = $2")
            .bind(username)
            .bind(email)
            .fetch_optional(db)
            .await?;
    Ok(row.is_some())
}

/// Insert a new user. A unique-index violation surfaces as
/// `sqlx::Error::Database` with SQLSTATE 23505; callers map it to a conflict.
pub async fn create(db: &PgPool, new: NewUser<'_>) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, email, full_name, password_hash, avatar_url, cover_image_url) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(new.username)
    .bind(new.email)
    .bind(new.full_name)
    .bind(new.password_hash)
    .bind(new.avatar_url)
    .bind(new.cover_image_url)
    .fetch_one(db)
    .await
}

/// Set or clear the stored refresh token. Clearing is idempotent.
pub async fn set_refresh_token(db: &PgPool, id: Uuid, token: Option<&str>) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET refresh_token = $1, updated_at = now() WHERE id = $2")
        .bind(token)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

/// Compare-and-swap rotation: the new token is written only if the stored
/// token still equals `old`. Returns false when a rotated or stale token is
/// replayed.
pub async fn rotate_refresh_token(
    db: &PgPool,
    id: Uuid,
    old: &str,
    new: &str,
) -> sqlx::Result<bool> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "UPDATE users SET refresh_token = $1, updated_at = now() \
         WHERE id = $2 AND refresh_token = $3 \
         RETURNING id",
    )
    .bind(new)
    .bind(id)
    .bind(old)
    .fetch_optional(db)
    .await?;
    Ok(row.is_some())
}

pub async fn update_password_hash(db: &PgPool, id: Uuid, hash: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = now() WHERE id = $2")
        .bind(hash)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn update_account(
    db: &PgPool,
    id: Uuid,
    full_name: &str,
    email: &str,
) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET full_name = $1, email = $2, updated_at = now() \
         WHERE id = $3 \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(full_name)
    .bind(email)
    .bind(id)
    .fetch_one(db)
    .await
}

pub async fn update_avatar_url(db: &PgPool, id: Uuid, url: &str) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET avatar_url = $1, updated_at = now() WHERE id = $2 RETURNING {USER_COLUMNS}"
    ))
    .bind(url)
    .bind(id)
    .fetch_one(db)
    .await
}

pub async fn update_cover_image_url(db: &PgPool, id: Uuid, url: &str) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET cover_image_url = $1, updated_at = now() WHERE id = $2 RETURNING {USER_COLUMNS}"
    ))
    .bind(url)
    .bind(id)
    .fetch_one(db)
    .await
}

/// Channel projection with derived subscription counts, computed in one
/// statement so the counts and the flag come from the same snapshot.
#[derive(Debug, Clone, FromRow)]
pub struct ChannelRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub created_at: OffsetDateTime,
    pub subscribers_count: i64,
    pub subscribed_to_count: i64,
    pub is_subscribed: bool,
}

pub async fn channel_profile(
    db: &PgPool,
    username: &str,
    viewer: Option<Uuid>,
) -> sqlx::Result<Option<ChannelRow>> {
    sqlx::query_as::<_, ChannelRow>(
        r#"
        SELECT u.id, u.username, u.email, u.full_name, u.avatar_url, u.cover_image_url,
               u.created_at,
               (SELECT count(*) FROM subscriptions s WHERE s.channel_id = u.id)
                   AS subscribers_count,
               (SELECT count(*) FROM subscriptions s WHERE s.subscriber_id = u.id)
                   AS subscribed_to_count,
               EXISTS(SELECT 1 FROM subscriptions s
                       WHERE s.channel_id = u.id AND s.subscriber_id = $2)
                   AS is_subscribed
          FROM users u
         WHERE u.username = $1
        "#,
    )
    .bind(username)
    .bind(viewer)
    .fetch_optional(db)
    .await
}

/// One watched video joined with a reduced owner projection.
#[derive(Debug, Clone, FromRow)]
pub struct WatchRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: String,
    pub duration_secs: i32,
    pub views: i64,
    pub created_at: OffsetDateTime,
    pub owner_full_name: String,
    pub owner_username: String,
    pub owner_avatar_url: String,
}

/// Watch history in stored order (append order, oldest first).
pub async fn watch_history(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<WatchRow>> {
    sqlx::query_as::<_, WatchRow>(
        r#"
        SELECT v.id, v.title, v.description, v.thumbnail_url, v.duration_secs, v.views,
               v.created_at,
               o.full_name AS owner_full_name,
               o.username  AS owner_username,
               o.avatar_url AS owner_avatar_url
          FROM watch_history wh
          JOIN videos v ON v.id = wh.video_id
          JOIN users o ON o.id = v.owner_id
         WHERE wh.user_id = $1
         ORDER BY wh.position ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}
