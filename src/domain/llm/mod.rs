//! Model invocation domain: messages, options, results and the provider capability

mod error;
mod message;
mod provider;
mod request;
mod response;

pub use error::{LlmError, ProviderFailure};
pub use message::{Message, MessageRole};
pub use provider::ModelProvider;
pub use request::{InvocationOptions, InvocationOptionsBuilder};
pub use response::{InvocationResult, TokenUsage};
