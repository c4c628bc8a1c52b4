//! Cached AI text analysis

use std::sync::Arc;
use std::time::Duration;

use crate::domain::cache::{CacheKeyParams, HashedKeyGenerator};
use crate::domain::narration::{AnalysisRequest, TextGenerator};
use crate::domain::DomainError;
use crate::infrastructure::cache::TieredCache;

pub const ANALYSIS_SCOPE: &str = "analysis";

/// Configuration for text analysis caching
#[derive(Debug, Clone)]
pub struct TextAnalysisCacheConfig {
    pub ttl: Duration,
    /// How many dependency names take part in the key (and in the prompt context)
    pub dependency_context_limit: usize,
}

impl Default for TextAnalysisCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(12 * 3600),
            dependency_context_limit: 10,
        }
    }
}

/// Serves package analyses from the cache, calling the generator only on a miss
pub struct TextAnalysisCache {
    cache: Arc<TieredCache>,
    generator: Arc<dyn TextGenerator>,
    config: TextAnalysisCacheConfig,
    keys: HashedKeyGenerator,
}

impl TextAnalysisCache {
    pub fn new(cache: Arc<TieredCache>, generator: Arc<dyn TextGenerator>) -> Self {
        Self::with_config(cache, generator, TextAnalysisCacheConfig::default())
    }

    pub fn with_config(
        cache: Arc<TieredCache>,
        generator: Arc<dyn TextGenerator>,
        config: TextAnalysisCacheConfig,
    ) -> Self {
        Self {
            cache,
            generator,
            config,
            keys: HashedKeyGenerator::new(ANALYSIS_SCOPE),
        }
    }

    /// Trims the dependency context to a sorted, deduplicated, bounded list
    fn limited(&self, request: &AnalysisRequest) -> AnalysisRequest {
        let mut dependencies: Vec<String> = request
            .dependencies
            .iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();
        dependencies.sort();
        dependencies.dedup();
        dependencies.truncate(self.config.dependency_context_limit);

        AnalysisRequest {
            subject: request.subject.trim().to_string(),
            dependencies,
        }
    }

    pub fn cache_key(&self, request: &AnalysisRequest) -> Result<String, DomainError> {
        let limited = self.limited(request);
        let params = CacheKeyParams::new(limited.subject)
            .with_json_component("dependencies", &limited.dependencies)?;

        Ok(self.keys.generate(&params))
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<String, DomainError> {
        if request.subject.trim().is_empty() {
            return Err(DomainError::validation("Analysis subject must not be empty"));
        }

        let limited = self.limited(request);
        let key = self.cache_key(&limited)?;

        self.cache
            .get_or_compute(&key, self.config.ttl, || async {
                self.generator.analyze(&limited).await
            })
            .await
    }
}
