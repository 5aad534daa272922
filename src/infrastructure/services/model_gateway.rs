//! Model gateway
//!
//! Wraps a primary provider and an ordered fallback chain with per-provider
//! rate limiting and an LRU response cache. Provider failures are recovered
//! by moving to the next provider; only exhausting the whole chain is fatal.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::domain::cache::{CacheKeyGenerator, CacheKeyParams, CacheStats, DefaultKeyGenerator};
use crate::domain::{
    Embedding, EmbeddingProvider, InvocationOptions, InvocationResult, LlmError, Message,
    ModelProvider, ProviderFailure,
};
use crate::infrastructure::cache::{EmbeddingCache, ResponseCache, ResponseCacheConfig};
use crate::infrastructure::metrics::{self, LlmRequestMetricParams};
use crate::infrastructure::rate_limit::{RateLimitStatus, RateLimiter};

const RESPONSE_CACHE_NAMESPACE: &str = "llm";

/// Models advertised by one provider in the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderModels {
    pub provider: String,
    pub models: Vec<String>,
}

#[derive(Debug)]
struct EmbeddingBackend {
    provider: Arc<dyn EmbeddingProvider>,
    cache: EmbeddingCache,
    model: Option<String>,
}

/// Provider-agnostic completion and embedding entry point
#[derive(Debug)]
pub struct ModelGateway {
    /// Primary first, then fallbacks in configured order
    providers: Vec<Arc<dyn ModelProvider>>,
    rate_limiter: RateLimiter,
    cache: Option<ResponseCache<InvocationResult>>,
    key_generator: DefaultKeyGenerator,
    embeddings: Option<EmbeddingBackend>,
    default_model: Option<String>,
    request_timeout: Option<Duration>,
}

/// Builder for [`ModelGateway`]
#[derive(Debug)]
pub struct ModelGatewayBuilder {
    providers: Vec<Arc<dyn ModelProvider>>,
    rate_limiter: RateLimiter,
    cache: Option<ResponseCacheConfig>,
    embeddings: Option<EmbeddingBackend>,
    default_model: Option<String>,
    request_timeout: Option<Duration>,
}

impl ModelGatewayBuilder {
    pub fn with_fallback(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn with_cache(mut self, config: ResponseCacheConfig) -> Self {
        self.cache = Some(config);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    pub fn with_embeddings(
        mut self,
        provider: Arc<dyn EmbeddingProvider>,
        cache: EmbeddingCache,
    ) -> Self {
        self.embeddings = Some(EmbeddingBackend {
            provider,
            cache,
            model: None,
        });
        self
    }

    /// Model used by `embed` when the caller names none. Requires `with_embeddings` first.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        if let Some(backend) = self.embeddings.as_mut() {
            backend.model = Some(model.into());
        }
        self
    }

    /// Model applied to requests whose options leave `model` unset
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Per-attempt timeout when the request options carry none
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> ModelGateway {
        ModelGateway {
            providers: self.providers,
            rate_limiter: self.rate_limiter,
            cache: self.cache.map(ResponseCache::with_config),
            key_generator: DefaultKeyGenerator::new(),
            embeddings: self.embeddings,
            default_model: self.default_model,
            request_timeout: self.request_timeout,
        }
    }
}

impl ModelGateway {
    pub fn builder(primary: Arc<dyn ModelProvider>) -> ModelGatewayBuilder {
        ModelGatewayBuilder {
            providers: vec![primary],
            rate_limiter: RateLimiter::default(),
            cache: Some(ResponseCacheConfig::default()),
            embeddings: None,
            default_model: None,
            request_timeout: None,
        }
    }

    /// Run a conversation through the cache and the provider chain.
    #[instrument(skip_all, fields(messages = messages.len()))]
    pub async fn complete(
        &self,
        messages: &[Message],
        options: &InvocationOptions,
    ) -> Result<InvocationResult, LlmError> {
        let options = self.resolve_options(options);
        let cache_key = self
            .cache
            .as_ref()
            .map(|_| self.fingerprint(messages, &options));

        if let (Some(cache), Some(key)) = (&self.cache, cache_key.as_deref()) {
            if let Some(cached) = cache.get(key) {
                metrics::record_cache_lookup("response", true);
                debug!(provider = %cached.provider, "Response cache hit");
                return Ok(cached);
            }
            metrics::record_cache_lookup("response", false);
        }

        let mut attempts = Vec::with_capacity(self.providers.len());
        let mut primary_error = None;

        for (index, provider) in self.providers.iter().enumerate() {
            let name = provider.provider_name();

            if index > 0 {
                metrics::record_fallback(self.providers[index - 1].provider_name(), name);
                info!(provider = %name, attempt = index + 1, "Falling back to next provider");
            }

            match self.attempt(provider.as_ref(), messages, &options).await {
                Ok(result) => {
                    if let (Some(cache), Some(key)) = (&self.cache, cache_key.as_deref()) {
                        cache.set(key, result.clone());
                    }
                    return Ok(result);
                }
                Err(error) => {
                    warn!(provider = %name, error = %error, "Provider attempt failed");
                    attempts.push(ProviderFailure {
                        provider: name.to_string(),
                        message: error.to_string(),
                    });
                    if primary_error.is_none() {
                        primary_error = Some(error);
                    }
                }
            }
        }

        let source = primary_error
            .unwrap_or_else(|| LlmError::configuration("No model providers configured"));
        warn!(attempted = attempts.len(), "All providers failed");

        Err(LlmError::AllProvidersFailed {
            attempts,
            source: Box::new(source),
        })
    }

    /// Single-turn completion parsed as JSON. Markdown code fences are stripped first.
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &InvocationOptions,
    ) -> Result<T, LlmError> {
        let result = self
            .complete(&single_turn(system_prompt, user_prompt), options)
            .await?;

        parse_json_content(&result.content)
    }

    /// Single-turn completion returning only the text
    pub async fn complete_prompt(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &InvocationOptions,
    ) -> Result<String, LlmError> {
        let result = self
            .complete(&single_turn(system_prompt, user_prompt), options)
            .await?;

        Ok(result.content)
    }

    /// Embed one text, consulting the embedding cache first
    pub async fn embed(&self, text: &str, model: Option<&str>) -> Result<Embedding, LlmError> {
        let backend = self.embedding_backend()?;
        let model = model.unwrap_or_else(|| backend.default_model());

        if let Some(cached) = backend.cache.get(model, text).await {
            metrics::record_cache_lookup("embedding", true);
            return Ok(cached.as_ref().clone());
        }
        metrics::record_cache_lookup("embedding", false);

        let mut vectors = backend.provider.embed(model, &[text.to_string()]).await?;
        let vector = vectors.pop().ok_or_else(|| {
            LlmError::invocation(backend.provider.provider_name(), "Provider returned no embedding")
        })?;

        backend.cache.set(model, text, vector.clone()).await;
        Ok(vector)
    }

    /// Embed many texts; only cache misses reach the provider, in one call
    pub async fn embed_batch(
        &self,
        texts: &[String],
        model: Option<&str>,
    ) -> Result<Vec<Embedding>, LlmError> {
        let backend = self.embedding_backend()?;
        let model = model.unwrap_or_else(|| backend.default_model());

        let mut vectors: Vec<Option<Embedding>> = Vec::with_capacity(texts.len());
        let mut missing = Vec::new();

        for (index, text) in texts.iter().enumerate() {
            match backend.cache.get(model, text).await {
                Some(cached) => {
                    metrics::record_cache_lookup("embedding", true);
                    vectors.push(Some(cached.as_ref().clone()));
                }
                None => {
                    metrics::record_cache_lookup("embedding", false);
                    vectors.push(None);
                    missing.push(index);
                }
            }
        }

        if !missing.is_empty() {
            let inputs: Vec<String> = missing.iter().map(|&i| texts[i].clone()).collect();
            let fresh = backend.provider.embed(model, &inputs).await?;

            if fresh.len() != inputs.len() {
                return Err(LlmError::invocation(
                    backend.provider.provider_name(),
                    format!("Expected {} embeddings, received {}", inputs.len(), fresh.len()),
                ));
            }

            debug!(requested = texts.len(), embedded = inputs.len(), "Embedded cache misses");

            for (index, vector) in missing.into_iter().zip(fresh) {
                backend.cache.set(model, &texts[index], vector.clone()).await;
                vectors[index] = Some(vector);
            }
        }

        vectors.into_iter().collect::<Option<Vec<_>>>().ok_or_else(|| {
            LlmError::invocation(backend.provider.provider_name(), "Embedding batch incomplete")
        })
    }

    /// Response cache statistics, `None` when caching is disabled
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(ResponseCache::stats)
    }

    pub async fn embedding_cache_stats(&self) -> Option<CacheStats> {
        match self.embeddings {
            Some(ref backend) => Some(backend.cache.stats().await),
            None => None,
        }
    }

    /// Drop expired response cache entries, returning how many were removed
    pub fn prune_cache(&self) -> usize {
        self.cache.as_ref().map_or(0, ResponseCache::prune)
    }

    pub async fn clear_cache(&self) {
        if let Some(ref cache) = self.cache {
            cache.clear();
        }
        if let Some(ref backend) = self.embeddings {
            backend.cache.clear().await;
        }
        info!("Gateway caches cleared");
    }

    /// Rate-limit snapshot for every provider in the chain
    pub fn rate_limit_status(&self) -> Vec<RateLimitStatus> {
        self.providers
            .iter()
            .map(|p| self.rate_limiter.status(p.provider_name()))
            .collect()
    }

    pub fn available_models(&self) -> Vec<ProviderModels> {
        self.providers
            .iter()
            .map(|p| ProviderModels {
                provider: p.provider_name().to_string(),
                models: p.available_models(),
            })
            .collect()
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.provider_name()).collect()
    }

    /// admit → availability → invoke → consume, for one provider
    async fn attempt(
        &self,
        provider: &dyn ModelProvider,
        messages: &[Message],
        options: &InvocationOptions,
    ) -> Result<InvocationResult, LlmError> {
        let name = provider.provider_name();

        if !self.rate_limiter.try_admit(name) {
            let reset_in_ms = self.rate_limiter.reset_in_ms(name);
            metrics::record_rate_limited(name);
            debug!(provider = %name, reset_in_ms, "Rate limit denied admission");
            return Err(LlmError::rate_limited(name, reset_in_ms));
        }

        if !provider.is_available().await {
            return Err(LlmError::unavailable(name));
        }

        let started = Instant::now();
        let outcome = match self.attempt_timeout(options) {
            Some(limit) => tokio::time::timeout(limit, provider.complete(messages, options))
                .await
                .unwrap_or_else(|_| Err(LlmError::timeout(name, limit.as_millis() as u64))),
            None => provider.complete(messages, options).await,
        };
        let elapsed = started.elapsed();

        self.rate_limiter.consume(name);

        let usage = outcome.as_ref().ok().and_then(|r| r.token_usage);
        metrics::record_llm_request(LlmRequestMetricParams {
            provider: name,
            model: options.model_or("default"),
            duration: elapsed,
            success: outcome.is_ok(),
            input_tokens: usage.map(|u| u64::from(u.prompt)),
            output_tokens: usage.map(|u| u64::from(u.completion)),
        });

        let result = outcome?;
        debug!(provider = %name, duration_ms = elapsed.as_millis() as u64, "Provider call succeeded");

        Ok(result.with_duration_ms(elapsed.as_millis() as u64))
    }

    fn attempt_timeout(&self, options: &InvocationOptions) -> Option<Duration> {
        options
            .timeout_ms
            .map(Duration::from_millis)
            .or(self.request_timeout)
    }

    fn resolve_options<'a>(&self, options: &'a InvocationOptions) -> Cow<'a, InvocationOptions> {
        match (&options.model, &self.default_model) {
            (None, Some(model)) => {
                let mut resolved = options.clone();
                resolved.model = Some(model.clone());
                Cow::Owned(resolved)
            }
            _ => Cow::Borrowed(options),
        }
    }

    fn fingerprint(&self, messages: &[Message], options: &InvocationOptions) -> String {
        self.key_generator.generate_with_namespace(
            RESPONSE_CACHE_NAMESPACE,
            &CacheKeyParams::for_completion(messages, options),
        )
    }

    fn embedding_backend(&self) -> Result<&EmbeddingBackend, LlmError> {
        self.embeddings
            .as_ref()
            .ok_or_else(|| LlmError::configuration("No embedding provider configured"))
    }
}

impl EmbeddingBackend {
    fn default_model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }
}

fn single_turn(system_prompt: &str, user_prompt: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2);
    if !system_prompt.trim().is_empty() {
        messages.push(Message::system(system_prompt));
    }
    messages.push(Message::user(user_prompt));
    messages
}

/// Parse model output as JSON, tolerating a markdown code fence and prose around it
pub fn parse_json_content<T: DeserializeOwned>(content: &str) -> Result<T, LlmError> {
    serde_json::from_str(strip_code_fences(content))
        .map_err(|e| LlmError::parse(e.to_string(), content))
}

/// Body of the first fenced block, or the trimmed content when there is none.
///
/// The closing fence must start a line; JSON strings cannot hold a raw newline.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }

    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };

    // language tag, e.g. ```json
    let body = trimmed[open + 3..].trim_start_matches(|c: char| c.is_ascii_alphanumeric());

    match body.find("\n```").or_else(|| body.rfind("```")) {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}
