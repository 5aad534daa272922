//! Metric recording helpers.
//!
//! Only the `metrics` facade is used here; without an installed recorder
//! every call is a no-op, so the embedding application picks the exporter.

use std::time::Duration;

use metrics::{counter, gauge, histogram};

pub const LLM_REQUESTS_TOTAL: &str = "llm_requests_total";
pub const LLM_REQUEST_DURATION_SECONDS: &str = "llm_request_duration_seconds";
pub const LLM_INPUT_TOKENS_TOTAL: &str = "llm_input_tokens_total";
pub const LLM_OUTPUT_TOKENS_TOTAL: &str = "llm_output_tokens_total";
pub const LLM_CACHE_HITS_TOTAL: &str = "llm_cache_hits_total";
pub const LLM_CACHE_MISSES_TOTAL: &str = "llm_cache_misses_total";
pub const LLM_RATE_LIMITED_TOTAL: &str = "llm_rate_limited_total";
pub const LLM_FALLBACKS_TOTAL: &str = "llm_fallbacks_total";
pub const PLUGIN_ANALYSES_TOTAL: &str = "plugin_analyses_total";
pub const PLUGIN_ANALYSIS_DURATION_SECONDS: &str = "plugin_analysis_duration_seconds";
pub const PLUGINS_ACTIVE: &str = "plugins_active";

/// Record one provider invocation
pub fn record_llm_request(params: LlmRequestMetricParams) {
    let labels = [
        ("provider", params.provider.to_string()),
        ("model", params.model.to_string()),
        ("status", if params.success { "success" } else { "error" }.to_string()),
    ];

    counter!(LLM_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(LLM_REQUEST_DURATION_SECONDS, &labels).record(params.duration.as_secs_f64());

    if let Some(tokens) = params.input_tokens {
        counter!(LLM_INPUT_TOKENS_TOTAL, &labels).increment(tokens);
    }

    if let Some(tokens) = params.output_tokens {
        counter!(LLM_OUTPUT_TOKENS_TOTAL, &labels).increment(tokens);
    }
}

/// Parameters for provider invocation metrics
pub struct LlmRequestMetricParams<'a> {
    pub provider: &'a str,
    pub model: &'a str,
    pub duration: Duration,
    pub success: bool,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

pub fn record_cache_lookup(cache: &'static str, hit: bool) {
    if hit {
        counter!(LLM_CACHE_HITS_TOTAL, "cache" => cache).increment(1);
    } else {
        counter!(LLM_CACHE_MISSES_TOTAL, "cache" => cache).increment(1);
    }
}

pub fn record_rate_limited(provider: &str) {
    counter!(LLM_RATE_LIMITED_TOTAL, "provider" => provider.to_string()).increment(1);
}

/// A fallback provider was tried after `from` failed
pub fn record_fallback(from: &str, to: &str) {
    counter!(
        LLM_FALLBACKS_TOTAL,
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
}

/// Outcome label for plugin analysis metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginOutcomeLabel {
    Success,
    Error,
    Timeout,
}

impl PluginOutcomeLabel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Timeout => "timeout",
        }
    }
}

pub fn record_plugin_analysis(plugin_id: &str, outcome: PluginOutcomeLabel, duration: Duration) {
    let labels = [
        ("plugin", plugin_id.to_string()),
        ("outcome", outcome.as_str().to_string()),
    ];

    counter!(PLUGIN_ANALYSES_TOTAL, &labels).increment(1);
    histogram!(PLUGIN_ANALYSIS_DURATION_SECONDS, &labels).record(duration.as_secs_f64());
}

pub fn record_active_plugins(count: usize) {
    gauge!(PLUGINS_ACTIVE).set(count as f64);
}
