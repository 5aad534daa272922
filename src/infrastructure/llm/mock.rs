//! Deterministic in-process provider for tests and offline runs

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{InvocationOptions, InvocationResult, LlmError, Message, ModelProvider, TokenUsage};

const DEFAULT_MOCK_MODEL: &str = "mock-model";

/// Provider that answers from a script instead of a network call.
///
/// Scripted responses are consumed in order; once exhausted the fixed
/// response (or an echo of the last user message) is returned.
#[derive(Debug)]
pub struct MockProvider {
    name: String,
    model: String,
    fixed_response: Option<String>,
    scripted: Mutex<VecDeque<Result<String, String>>>,
    failure: Option<String>,
    available: AtomicBool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: DEFAULT_MOCK_MODEL.to_string(),
            fixed_response: None,
            scripted: Mutex::new(VecDeque::new()),
            failure: None,
            available: AtomicBool::new(true),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_response(mut self, content: impl Into<String>) -> Self {
        self.fixed_response = Some(content.into());
        self
    }

    pub fn with_scripted(self, response: Result<String, String>) -> Self {
        self.script().push_back(response);
        self
    }

    /// Every call fails with an invocation error carrying this message
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn unavailable(self) -> Self {
        self.available.store(false, Ordering::SeqCst);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of `complete` calls received so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn script(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, String>>> {
        self.scripted
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn next_reply(&self, messages: &[Message]) -> Result<String, String> {
        if let Some(ref message) = self.failure {
            return Err(message.clone());
        }

        if let Some(reply) = self.script().pop_front() {
            return reply;
        }

        if let Some(ref content) = self.fixed_response {
            return Ok(content.clone());
        }

        let last = messages.last().map(Message::content).unwrap_or_default();
        Ok(format!("[{}] {}", self.name, last))
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    async fn complete(
        &self,
        messages: &[Message],
        options: &InvocationOptions,
    ) -> Result<InvocationResult, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let content = self
            .next_reply(messages)
            .map_err(|message| LlmError::invocation(&self.name, message))?;

        let prompt_tokens: usize = messages.iter().map(|m| m.content().split_whitespace().count()).sum();
        let completion_tokens = content.split_whitespace().count();

        Ok(
            InvocationResult::new(content, options.model_or(&self.model), &self.name)
                .with_usage(TokenUsage::new(prompt_tokens as u32, completion_tokens as u32)),
        )
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn available_models(&self) -> Vec<String> {
        vec![self.model.clone()]
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_responses_then_fixed() {
        let provider = MockProvider::new("mock")
            .with_scripted(Ok("first".to_string()))
            .with_scripted(Err("second fails".to_string()))
            .with_response("steady");
        let messages = [Message::user("hi")];
        let options = InvocationOptions::new();

        assert_eq!(provider.complete(&messages, &options).await.unwrap().content, "first");
        assert!(provider.complete(&messages, &options).await.is_err());
        assert_eq!(provider.complete(&messages, &options).await.unwrap().content, "steady");
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_echo_when_unscripted() {
        let provider = MockProvider::new("echo");
        let result = provider
            .complete(&[Message::user("ping")], &InvocationOptions::new())
            .await
            .unwrap();

        assert_eq!(result.content, "[echo] ping");
        assert_eq!(result.model, "mock-model");
    }

    #[tokio::test]
    async fn test_failing_and_unavailable() {
        let provider = MockProvider::new("broken").failing("boom").unavailable();

        assert!(!provider.is_available().await);
        let error = provider
            .complete(&[Message::user("x")], &InvocationOptions::new())
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "Provider error: broken - boom");
    }
}
