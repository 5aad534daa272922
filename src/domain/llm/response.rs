use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt: u32,
    pub completion: u32,
    pub total: u32,
}

impl TokenUsage {
    pub fn new(prompt: u32, completion: u32) -> Self {
        Self {
            prompt,
            completion,
            total: prompt + completion,
        }
    }
}

/// Result of one successful model invocation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    pub content: String,
    pub model: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
}

impl InvocationResult {
    pub fn new(
        content: impl Into<String>,
        model: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            provider: provider.into(),
            token_usage: None,
            timestamp: Utc::now(),
            duration_ms: 0,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.token_usage = Some(usage);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_calculation() {
        let usage = TokenUsage::new(10, 20);
        assert_eq!(usage.total, 30);
    }

    #[test]
    fn test_result_builder() {
        let result = InvocationResult::new("Hello!", "gpt-4o", "openai")
            .with_usage(TokenUsage::new(3, 2))
            .with_duration_ms(42);

        assert_eq!(result.content, "Hello!");
        assert_eq!(result.provider, "openai");
        assert_eq!(result.token_usage.map(|u| u.total), Some(5));
        assert_eq!(result.duration_ms, 42);
    }
}
