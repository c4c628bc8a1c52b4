//! Admin API endpoints

pub mod cache;

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::state::AppState;

/// Create admin API router
pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/cache/status", get(cache::cache_status))
        .route("/cache/clear", post(cache::clear_cache))
        .route("/cache/keys/{key}", delete(cache::delete_key))
}
