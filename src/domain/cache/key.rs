//! Cache key generation strategies

use std::collections::BTreeMap;
use std::fmt::Debug;

use sha2::{Digest, Sha256};

use crate::domain::llm::{InvocationOptions, Message};

/// Trait for generating cache keys from input data
pub trait CacheKeyGenerator: Send + Sync + Debug {
    /// Generates a cache key from the given components
    fn generate(&self, params: &CacheKeyParams) -> String;

    /// Generates a key with a namespace prefix
    fn generate_with_namespace(&self, namespace: &str, params: &CacheKeyParams) -> String {
        format!("{}:{}", namespace, self.generate(params))
    }
}

/// Parameters for cache key generation
#[derive(Debug, Clone, Default)]
pub struct CacheKeyParams {
    /// Primary identifier (e.g., model name)
    pub primary: String,
    /// Secondary components (sorted for consistency)
    pub components: BTreeMap<String, String>,
}

impl CacheKeyParams {
    /// Creates new cache key parameters with a primary identifier
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            components: BTreeMap::new(),
        }
    }

    /// Adds a component to the key parameters
    pub fn with_component(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.components.insert(key.into(), value.into());
        self
    }

    /// Adds a component only when the value is present
    pub fn with_optional_component<T: ToString>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.with_component(key, v.to_string()),
            None => self,
        }
    }

    /// Fingerprint parameters for a completion request.
    ///
    /// Covers every field that changes model output. `timeout_ms` is left out.
    pub fn for_completion(messages: &[Message], options: &InvocationOptions) -> Self {
        let messages_json = serde_json::to_string(messages).unwrap_or_else(|_| "[]".to_string());
        let stop_json = options
            .stop_sequences
            .as_ref()
            .map(|s| serde_json::to_string(s).unwrap_or_default());

        Self::new(options.model.clone().unwrap_or_default())
            .with_component("messages", messages_json)
            .with_optional_component("temperature", options.temperature)
            .with_optional_component("max_tokens", options.max_tokens)
            .with_optional_component("top_p", options.top_p)
            .with_optional_component("stop", stop_json)
    }

    /// Fingerprint parameters for an embedding request
    pub fn for_embedding(model: &str, text: &str) -> Self {
        Self::new(model).with_component("text", text)
    }
}

/// Default cache key generator.
///
/// Produces a SHA-256 hex digest of the canonical `primary:k=v:...` form, or
/// the canonical form itself when hashing is turned off.
#[derive(Debug, Clone)]
pub struct DefaultKeyGenerator {
    hashed: bool,
}

impl Default for DefaultKeyGenerator {
    fn default() -> Self {
        Self { hashed: true }
    }
}

impl DefaultKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit the readable canonical form instead of a digest
    pub fn plain(mut self) -> Self {
        self.hashed = false;
        self
    }

    fn canonical(params: &CacheKeyParams) -> String {
        let mut parts = vec![params.primary.clone()];

        for (k, v) in &params.components {
            parts.push(format!("{}={}", k, v));
        }

        parts.join(":")
    }
}

impl CacheKeyGenerator for DefaultKeyGenerator {
    fn generate(&self, params: &CacheKeyParams) -> String {
        let combined = Self::canonical(params);

        if self.hashed {
            hex::encode(Sha256::digest(combined.as_bytes()))
        } else {
            combined
        }
    }
}
