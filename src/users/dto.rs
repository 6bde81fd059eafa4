use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo::{ChannelRow, User, WatchRow};

/// Outward user projection. Deliberately has no password-hash or
/// refresh-token field, so a leak is a type error rather than a serde
/// annotation away.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            full_name: u.full_name,
            avatar: u.avatar_url,
            cover_image: u.cover_image_url,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub full_name: String,
    pub email: String,
}

/// Channel page projection: public fields plus the derived subscription
/// numbers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub subscribers_count: i64,
    pub subscribed_to_count: i64,
    pub is_subscribed: bool,
    pub created_at: OffsetDateTime,
}

impl From<ChannelRow> for ChannelProfile {
    fn from(r: ChannelRow) -> Self {
        Self {
            id: r.id,
            username: r.username,
            full_name: r.full_name,
            email: r.email,
            avatar: r.avatar_url,
            cover_image: r.cover_image_url,
            subscribers_count: r.subscribers_count,
            subscribed_to_count: r.subscribed_to_count,
            is_subscribed: r.is_subscribed,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOwner {
    pub full_name: String,
    pub username: String,
    pub avatar: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: String,
    pub duration_secs: i32,
    pub views: i64,
    pub created_at: OffsetDateTime,
    pub owner: VideoOwner,
}

impl From<WatchRow> for VideoSummary {
    fn from(r: WatchRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            description: r.description,
            thumbnail: r.thumbnail_url,
            duration_secs: r.duration_secs,
            views: r.views,
            created_at: r.created_at,
            owner: VideoOwner {
                full_name: r.owner_full_name,
                username: r.owner_username,
                avatar: r.owner_avatar_url,
            },
        }
    }
}
