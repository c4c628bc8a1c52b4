//! Cache administration endpoints

use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::cache::CapabilityStatus;
use crate::infrastructure::cache::ClearOutcome;

/// Status response: capability flags and counts plus the deployment shape
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatusResponse {
    pub namespace: String,
    pub persistent_configured: bool,
    #[serde(flatten)]
    pub status: CapabilityStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClearCacheRequest {
    /// Glob matched against persistent keys under the namespace
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteKeyResponse {
    pub key: String,
    pub deleted: bool,
}

/// GET /admin/cache/status
pub async fn cache_status(State(state): State<AppState>) -> Json<CacheStatusResponse> {
    let status = state.cache.status().await;

    Json(CacheStatusResponse {
        namespace: state.cache.config().namespace.name().to_string(),
        persistent_configured: state.cache.has_persistent_tier(),
        status,
    })
}

/// POST /admin/cache/clear
pub async fn clear_cache(
    RequireAdmin: RequireAdmin,
    State(state): State<AppState>,
    Json(request): Json<ClearCacheRequest>,
) -> Result<Json<ClearOutcome>, ApiError> {
    let pattern = request
        .pattern
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    let outcome = state.cache.clear(pattern).await;
    info!(pattern = pattern.unwrap_or("*"), ?outcome, "Cache cleared via admin API");

    Ok(Json(outcome))
}

/// DELETE /admin/cache/keys/{key}
pub async fn delete_key(
    RequireAdmin: RequireAdmin,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteKeyResponse>, ApiError> {
    let deleted = state.cache.delete(&key).await?;
    info!(key = %key, deleted, "Cache key deleted via admin API");

    Ok(Json(DeleteKeyResponse { key, deleted }))
}
