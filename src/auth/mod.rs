use crate::state::AppState;
use axum::Router;

pub mod cookies;
mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub(crate) mod validate;

pub fn router() -> Router<AppState> {
    handlers::session_routes()
}
