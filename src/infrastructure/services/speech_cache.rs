//! Cached speech synthesis

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::domain::cache::{CacheKeyParams, HashedKeyGenerator};
use crate::domain::narration::{SpeechAudio, SpeechRequest, SpeechSynthesizer};
use crate::domain::DomainError;
use crate::infrastructure::cache::TieredCache;

pub const SPEECH_SCOPE: &str = "tts";

#[derive(Debug, Clone)]
pub struct SpeechCacheConfig {
    pub ttl: Duration,
}

impl Default for SpeechCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 3600),
        }
    }
}

/// Serves synthesized speech from the cache, calling the synthesizer only on a miss
pub struct SpeechCache {
    cache: Arc<TieredCache>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    config: SpeechCacheConfig,
    keys: HashedKeyGenerator,
}

impl SpeechCache {
    pub fn new(cache: Arc<TieredCache>, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self::with_config(cache, synthesizer, SpeechCacheConfig::default())
    }

    pub fn with_config(
        cache: Arc<TieredCache>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        config: SpeechCacheConfig,
    ) -> Self {
        Self {
            cache,
            synthesizer,
            config,
            keys: HashedKeyGenerator::new(SPEECH_SCOPE),
        }
    }

    pub fn cache_key(&self, request: &SpeechRequest) -> String {
        let params = CacheKeyParams::new(request.text.as_str())
            .with_component("voice", request.voice.as_str())
            .with_component(
                "instructions",
                request.instructions.as_deref().unwrap_or_default(),
            );

        self.keys.generate(&params)
    }

    pub async fn speak(&self, request: &SpeechRequest) -> Result<SpeechAudio, DomainError> {
        if request.text.trim().is_empty() {
            return Err(DomainError::validation("Speech text must not be empty"));
        }
        if request.voice.trim().is_empty() {
            return Err(DomainError::validation("Speech voice must not be empty"));
        }

        let key = self.cache_key(request);

        self.cache
            .get_or_compute(&key, self.config.ttl, || async {
                debug!(voice = %request.voice, chars = request.text.len(), "Synthesizing speech");
                self.synthesizer.synthesize(request).await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{ManualClock, MockStore};
    use crate::domain::narration::MockSpeechSynthesizer;
    use crate::infrastructure::cache::TieredCacheConfig;

    fn memory_cache() -> Arc<TieredCache> {
        Arc::new(TieredCache::memory_only(TieredCacheConfig::default()))
    }

    fn audio() -> SpeechAudio {
        SpeechAudio::from_bytes(b"mp3-bytes", "audio/mpeg")
    }

    #[tokio::test]
    async fn test_same_request_synthesized_once() {
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer
            .expect_synthesize()
            .times(1)
            .returning(|_| Ok(audio()));

        let service = SpeechCache::new(memory_cache(), Arc::new(synthesizer));
        let request = SpeechRequest::new("hello", "alloy").with_instructions("calm");

        let first = service.speak(&request).await.unwrap();
        let second = service.speak(&request).await.unwrap();

        assert_eq!(first, audio());
        assert_eq!(second, audio());
    }

    #[test]
    fn test_key_depends_on_all_inputs() {
        let service = SpeechCache::new(memory_cache(), Arc::new(MockSpeechSynthesizer::new()));

        let base = SpeechRequest::new("hello", "alloy");
        let other_voice = SpeechRequest::new("hello", "echo");
        let with_instructions = SpeechRequest::new("hello", "alloy").with_instructions("calm");

        let key = service.cache_key(&base);
        assert!(key.starts_with("tts:"));
        assert_ne!(key, service.cache_key(&other_voice));
        assert_ne!(key, service.cache_key(&with_instructions));
        assert_eq!(key, service.cache_key(&SpeechRequest::new("hello", "alloy")));
    }

    #[tokio::test]
    async fn test_other_process_reuses_persistent_audio() {
        let store = Arc::new(MockStore::new());
        let config = TieredCacheConfig::default().with_namespace("app");
        let request = SpeechRequest::new("hello", "alloy");

        let mut first_synth = MockSpeechSynthesizer::new();
        first_synth.expect_synthesize().times(1).returning(|_| Ok(audio()));
        let first = SpeechCache::new(
            Arc::new(TieredCache::with_clock(
                Some(store.clone()),
                Arc::new(ManualClock::default()),
                config.clone(),
            )),
            Arc::new(first_synth),
        );
        first.speak(&request).await.unwrap();

        let mut second_synth = MockSpeechSynthesizer::new();
        second_synth.expect_synthesize().never();
        let second = SpeechCache::new(
            Arc::new(TieredCache::with_clock(
                Some(store),
                Arc::new(ManualClock::default()),
                config,
            )),
            Arc::new(second_synth),
        );

        let cached = second.speak(&request).await.unwrap();
        assert_eq!(cached.decode().unwrap(), b"mp3-bytes".to_vec());
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer.expect_synthesize().never();

        let service = SpeechCache::new(memory_cache(), Arc::new(synthesizer));

        assert!(service.speak(&SpeechRequest::new("", "alloy")).await.is_err());
        assert!(service.speak(&SpeechRequest::new("hi", " ")).await.is_err());
    }
}
