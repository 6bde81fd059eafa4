use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod media;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::profile_routes())
        .merge(handlers::channel_routes())
}
