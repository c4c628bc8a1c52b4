//! Cached dependency graph lookups

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::domain::graph::{DependencyGraph, DependencyGraphSource, RepositoryId};
use crate::domain::DomainError;
use crate::infrastructure::cache::TieredCache;

/// Key scope for repository graphs
pub const REPOSITORY_SCOPE: &str = "repo";

/// Configuration for repository graph caching
#[derive(Debug, Clone)]
pub struct RepositoryGraphCacheConfig {
    pub ttl: Duration,
}

impl Default for RepositoryGraphCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 3600),
        }
    }
}

/// Serves dependency graphs from the cache, building them only on a miss
pub struct RepositoryGraphCache {
    cache: Arc<TieredCache>,
    source: Arc<dyn DependencyGraphSource>,
    config: RepositoryGraphCacheConfig,
}

impl RepositoryGraphCache {
    pub fn new(cache: Arc<TieredCache>, source: Arc<dyn DependencyGraphSource>) -> Self {
        Self::with_config(cache, source, RepositoryGraphCacheConfig::default())
    }

    pub fn with_config(
        cache: Arc<TieredCache>,
        source: Arc<dyn DependencyGraphSource>,
        config: RepositoryGraphCacheConfig,
    ) -> Self {
        Self {
            cache,
            source,
            config,
        }
    }

    pub fn cache_key(repository: &RepositoryId) -> String {
        format!("{}:{}", REPOSITORY_SCOPE, repository)
    }

    /// Returns the graph for `repository` (any accepted spelling of it)
    pub async fn graph(&self, repository: &str) -> Result<DependencyGraph, DomainError> {
        let id = RepositoryId::parse(repository)?;
        let key = Self::cache_key(&id);

        self.cache
            .get_or_compute(&key, self.config.ttl, || async {
                info!(repository = %id, "Building dependency graph");
                self.source.build_graph(&id).await
            })
            .await
    }

    /// Drops the cached graph so the next request rebuilds it
    pub async fn invalidate(&self, repository: &str) -> Result<bool, DomainError> {
        let id = RepositoryId::parse(repository)?;
        self.cache.delete(&Self::cache_key(&id)).await
    }
}
