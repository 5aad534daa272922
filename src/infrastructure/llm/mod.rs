//! Model provider implementations

mod anthropic;
mod factory;
mod http_client;
mod mock;
mod ollama;
mod openai;

pub use anthropic::AnthropicProvider;
pub use factory::{ProviderFactory, ProviderKind, ProviderSettings};
pub use http_client::{HttpClient, HttpClientTrait, HttpError};
pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

#[cfg(test)]
pub use http_client::mock::MockHttpClient;
