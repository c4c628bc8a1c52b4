//! Cache key construction and namespacing

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::domain::DomainError;

/// Default namespace applied to every key written to the persistent tier
pub const DEFAULT_NAMESPACE: &str = "depviz";

/// Key segment reserved for capability probing, separator included
const PROBE_SEGMENT: &str = "__probe:";

/// Rejects keys that cannot identify an entry or that collide with probe sentinels
pub fn validate_key(key: &str) -> Result<(), DomainError> {
    if key.trim().is_empty() {
        return Err(DomainError::validation("Cache key must not be empty"));
    }
    if key.starts_with(PROBE_SEGMENT) {
        return Err(DomainError::validation(format!(
            "Cache keys starting with '{}' are reserved",
            PROBE_SEGMENT
        )));
    }
    Ok(())
}

/// Fixed prefix that separates this application's keys from anything else in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNamespace {
    prefix: String,
}

impl Default for KeyNamespace {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl KeyNamespace {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            prefix: format!("{}:", namespace.into()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The namespace without its trailing separator
    pub fn name(&self) -> &str {
        self.prefix.strip_suffix(':').unwrap_or(&self.prefix)
    }

    /// Applies the namespace to a caller key
    pub fn apply(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Strips the namespace from a stored key, if present
    pub fn strip<'a>(&self, stored: &'a str) -> Option<&'a str> {
        stored.strip_prefix(self.prefix.as_str())
    }

    /// Pattern handed to the store for bulk enumeration
    pub fn pattern(&self, pattern: Option<&str>) -> String {
        self.apply(pattern.unwrap_or("*"))
    }

    pub fn read_sentinel(&self) -> String {
        self.apply(&format!("{}read", PROBE_SEGMENT))
    }

    pub fn write_sentinel(&self) -> String {
        self.apply(&format!("{}write", PROBE_SEGMENT))
    }

    pub fn sentinel_pattern(&self) -> String {
        self.apply(&format!("{}*", PROBE_SEGMENT))
    }

    /// Returns true for keys reserved for capability probing
    pub fn is_sentinel(&self, stored: &str) -> bool {
        self.strip(stored)
            .is_some_and(|rest| rest.starts_with(PROBE_SEGMENT))
    }
}

/// Parameters for deterministic key generation
#[derive(Debug, Clone, Default)]
pub struct CacheKeyParams {
    /// Primary identifier (e.g., subject name, input text)
    pub primary: String,
    /// Secondary components (sorted for consistency)
    pub components: BTreeMap<String, String>,
}

impl CacheKeyParams {
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            components: BTreeMap::new(),
        }
    }

    pub fn with_component(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.components.insert(key.into(), value.into());
        self
    }

    /// Adds a serializable component, encoded as JSON
    pub fn with_json_component<T: Serialize>(
        self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<Self, DomainError> {
        let json = serde_json::to_string(value).map_err(|e| {
            DomainError::validation(format!("Failed to encode key component: {}", e))
        })?;
        Ok(self.with_component(key, json))
    }

    /// JSON `[primary, {components}]`; quoting keeps distinct inputs distinct
    fn canonical(&self) -> String {
        let components: Map<String, Value> = self
            .components
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        Value::Array(vec![
            Value::String(self.primary.clone()),
            Value::Object(components),
        ])
        .to_string()
    }
}

/// Generates `"{scope}:{sha256}"` keys that are stable across processes and builds
#[derive(Debug, Clone)]
pub struct HashedKeyGenerator {
    scope: String,
}

impl HashedKeyGenerator {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }

    pub fn generate(&self, params: &CacheKeyParams) -> String {
        let digest = Sha256::digest(params.canonical().as_bytes());
        format!("{}:{}", self.scope, hex::encode(digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("repo:owner/name").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("   ").is_err());
    }

    #[test]
    fn test_sentinel_segment_is_reserved() {
        assert!(matches!(
            validate_key("__probe:read"),
            Err(DomainError::Validation { .. })
        ));
        assert!(validate_key("__probe_notes").is_ok());
        assert!(validate_key("notes:__probe:x").is_ok());
    }

    #[test]
    fn test_namespace_apply_and_strip() {
        let ns = KeyNamespace::new("depviz");

        assert_eq!(ns.apply("repo:a/b"), "depviz:repo:a/b");
        assert_eq!(ns.strip("depviz:repo:a/b"), Some("repo:a/b"));
        assert_eq!(ns.strip("other:repo:a/b"), None);
    }

    #[test]
    fn test_namespace_pattern() {
        let ns = KeyNamespace::new("depviz");

        assert_eq!(ns.pattern(None), "depviz:*");
        assert_eq!(ns.pattern(Some("tts:*")), "depviz:tts:*");
    }

    #[test]
    fn test_sentinels_are_namespaced() {
        let ns = KeyNamespace::new("app");

        assert_eq!(ns.read_sentinel(), "app:__probe:read");
        assert_eq!(ns.write_sentinel(), "app:__probe:write");
        assert_eq!(ns.sentinel_pattern(), "app:__probe:*");
        assert!(ns.is_sentinel("app:__probe:read"));
        assert!(!ns.is_sentinel("app:repo:x/y"));
        assert!(!ns.is_sentinel("app:__probe_notes"));
        assert!(!ns.is_sentinel("app:__probeish"));
    }

    #[test]
    fn test_hashed_key_is_deterministic() {
        let generator = HashedKeyGenerator::new("tts");
        let a = CacheKeyParams::new("hello")
            .with_component("voice", "alloy")
            .with_component("instructions", "calm");
        let b = CacheKeyParams::new("hello")
            .with_component("instructions", "calm")
            .with_component("voice", "alloy");

        let key = generator.generate(&a);
        assert_eq!(key, generator.generate(&b));
        assert!(key.starts_with("tts:"));
        assert_eq!(key.len(), "tts:".len() + 64);
    }

    #[test]
    fn test_hashed_key_differs_by_component() {
        let generator = HashedKeyGenerator::new("tts");
        let a = CacheKeyParams::new("hello").with_component("voice", "alloy");
        let b = CacheKeyParams::new("hello").with_component("voice", "echo");

        assert_ne!(generator.generate(&a), generator.generate(&b));
    }

    #[test]
    fn test_separator_inside_values_does_not_collide() {
        let generator = HashedKeyGenerator::new("tts");
        let a = CacheKeyParams::new("hello")
            .with_component("voice", "c\u{1f}voice=d")
            .with_component("instructions", "b");
        let b = CacheKeyParams::new("hello")
            .with_component("voice", "d")
            .with_component("instructions", "b\u{1f}voice=c");

        assert_ne!(generator.generate(&a), generator.generate(&b));
    }

    #[test]
    fn test_quotes_inside_values_do_not_collide() {
        let generator = HashedKeyGenerator::new("analysis");
        let a = CacheKeyParams::new("x\",\"y").with_component("k", "v");
        let b = CacheKeyParams::new("x").with_component("k", "v");

        assert_ne!(generator.generate(&a), generator.generate(&b));
    }

    #[test]
    fn test_json_component() {
        let params = CacheKeyParams::new("subject")
            .with_json_component("deps", &vec!["serde", "tokio"])
            .unwrap();

        assert_eq!(
            params.components.get("deps"),
            Some(&"[\"serde\",\"tokio\"]".to_string())
        );
    }
}
