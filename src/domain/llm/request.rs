use serde::{Deserialize, Serialize};

/// Per-call invocation options. Every field is independently optional;
/// `None` means "use the provider default".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl InvocationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> InvocationOptionsBuilder {
        InvocationOptionsBuilder::default()
    }

    /// Resolve the model to use, falling back to the given provider default
    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.model.as_deref().unwrap_or(default)
    }
}

/// Builder for InvocationOptions
#[derive(Debug, Default)]
pub struct InvocationOptionsBuilder {
    options: InvocationOptions,
}

impl InvocationOptionsBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.options.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.options.temperature = Some(temp);
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.options.max_tokens = Some(tokens);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.options.top_p = Some(top_p);
        self
    }

    pub fn stop_sequences(mut self, stop: Vec<String>) -> Self {
        self.options.stop_sequences = Some(stop);
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.options.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn build(self) -> InvocationOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = InvocationOptions::builder()
            .model("gpt-4o")
            .temperature(0.2)
            .max_tokens(256)
            .build();

        assert_eq!(options.model.as_deref(), Some("gpt-4o"));
        assert_eq!(options.temperature, Some(0.2));
        assert_eq!(options.max_tokens, Some(256));
        assert!(options.top_p.is_none());
        assert!(options.timeout_ms.is_none());
    }

    #[test]
    fn test_model_or_default() {
        let options = InvocationOptions::new();
        assert_eq!(options.model_or("llama3"), "llama3");

        let options = InvocationOptions::builder().model("mistral").build();
        assert_eq!(options.model_or("llama3"), "mistral");
    }

    #[test]
    fn test_absent_fields_are_not_serialized() {
        let options = InvocationOptions::builder().temperature(0.5).build();
        let json = serde_json::to_string(&options).unwrap();
        assert_eq!(json, r#"{"temperature":0.5}"#);
    }
}
