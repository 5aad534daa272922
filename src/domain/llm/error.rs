use thiserror::Error;

/// One failed provider attempt recorded by the gateway's fallback loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: String,
    pub message: String,
}

/// Errors raised by model providers and the model gateway
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limit exceeded for provider '{provider}', resets in {reset_in_ms}ms")]
    RateLimited { provider: String, reset_in_ms: u64 },

    #[error("Provider '{provider}' is unavailable")]
    ProviderUnavailable { provider: String },

    #[error("Provider error: {provider} - {message}")]
    Invocation { provider: String, message: String },

    #[error("Provider '{provider}' timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    #[error("All providers failed ({} attempted), primary error: {source}", .attempts.len())]
    AllProvidersFailed {
        attempts: Vec<ProviderFailure>,
        #[source]
        source: Box<LlmError>,
    },

    #[error("Failed to parse model output as JSON: {message}")]
    Parse { message: String, raw: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl LlmError {
    pub fn rate_limited(provider: impl Into<String>, reset_in_ms: u64) -> Self {
        Self::RateLimited {
            provider: provider.into(),
            reset_in_ms,
        }
    }

    pub fn unavailable(provider: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
        }
    }

    pub fn invocation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invocation {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn timeout(provider: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            provider: provider.into(),
            timeout_ms,
        }
    }

    pub fn parse(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            raw: raw.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// The provider this error is attributed to, if any
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::RateLimited { provider, .. }
            | Self::ProviderUnavailable { provider }
            | Self::Invocation { provider, .. }
            | Self::Timeout { provider, .. } => Some(provider),
            Self::AllProvidersFailed { source, .. } => source.provider(),
            Self::Parse { .. } | Self::Configuration { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_rate_limited_message() {
        let error = LlmError::rate_limited("openai", 1500);
        assert_eq!(
            error.to_string(),
            "Rate limit exceeded for provider 'openai', resets in 1500ms"
        );
        assert_eq!(error.provider(), Some("openai"));
    }

    #[test]
    fn test_all_providers_failed_chains_primary() {
        let error = LlmError::AllProvidersFailed {
            attempts: vec![
                ProviderFailure {
                    provider: "openai".to_string(),
                    message: "boom".to_string(),
                },
                ProviderFailure {
                    provider: "ollama".to_string(),
                    message: "down".to_string(),
                },
            ],
            source: Box::new(LlmError::invocation("openai", "boom")),
        };

        assert!(error.to_string().starts_with("All providers failed (2 attempted)"));
        assert_eq!(error.provider(), Some("openai"));

        let source = error.source().unwrap();
        assert_eq!(source.to_string(), "Provider error: openai - boom");
    }

    #[test]
    fn test_parse_error_keeps_raw() {
        let error = LlmError::parse("expected value", "not json");
        match error {
            LlmError::Parse { raw, .. } => assert_eq!(raw, "not json"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
