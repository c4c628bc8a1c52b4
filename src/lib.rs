//! Depviz Cache
//!
//! A two-tier cache for expensive upstream work (dependency graphs, AI
//! analyses, synthesized speech):
//! - A process-local tier that always works
//! - An optional shared Redis tier whose capabilities are probed at runtime
//! - Graceful degradation when the shared tier is unreachable, read-only or
//!   denies key enumeration

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use self::config::AppConfig;

use api::state::AppState;
use infrastructure::cache::CacheFactory;
use tracing::info;

/// Create the application state from configuration
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let cache = CacheFactory::new()
        .create(&config.cache.to_cache_config())
        .await?;

    info!(
        persistent = cache.has_persistent_tier(),
        namespace = %cache.config().namespace.name(),
        "Cache initialized"
    );

    let mut state = AppState::new(cache);
    if let Some(token) = config.admin.token() {
        state = state.with_admin_token(token);
    }

    Ok(state)
}
