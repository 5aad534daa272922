use async_trait::async_trait;
use std::fmt::Debug;

use super::{InvocationOptions, InvocationResult, LlmError, Message};

/// Capability set implemented once per model backend (hosted API, local
/// runtime, deterministic test double).
#[async_trait]
pub trait ModelProvider: Send + Sync + Debug {
    /// Run one completion. Transport, auth and quota failures come back as a
    /// typed `LlmError`.
    async fn complete(
        &self,
        messages: &[Message],
        options: &InvocationOptions,
    ) -> Result<InvocationResult, LlmError>;

    /// Cheap liveness check. Must not consume rate-limit budget.
    async fn is_available(&self) -> bool;

    /// Models served by this provider instance
    fn available_models(&self) -> Vec<String>;

    /// Provider identity, also used as the rate-limit bucket key
    fn provider_name(&self) -> &str;
}
