//! Complete command - one prompt through the provider chain

use clap::Args;
use tracing::info;

use crate::build_gateway;
use crate::config::AppConfig;
use crate::domain::{InvocationOptions, Message};

#[derive(Args, Clone)]
pub struct CompleteArgs {
    /// User prompt
    #[arg(long)]
    pub prompt: String,

    /// Optional system prompt
    #[arg(long)]
    pub system: Option<String>,

    /// Model override (defaults to the gateway or provider default)
    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub temperature: Option<f32>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Print the full invocation result as JSON instead of the text only
    #[arg(long)]
    pub json: bool,
}

impl CompleteArgs {
    fn messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2);

        if let Some(system) = self.system.as_deref().filter(|s| !s.trim().is_empty()) {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(self.prompt.as_str()));

        messages
    }

    fn options(&self) -> InvocationOptions {
        let mut builder = InvocationOptions::builder();

        if let Some(ref model) = self.model {
            builder = builder.model(model);
        }
        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }

        builder.build()
    }
}

pub async fn run(config: &AppConfig, args: CompleteArgs) -> anyhow::Result<()> {
    let gateway = build_gateway(config)?;

    let result = gateway.complete(&args.messages(), &args.options()).await?;
    info!(
        provider = %result.provider,
        model = %result.model,
        duration_ms = result.duration_ms,
        "Completion finished"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.content);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageRole;

    fn args(system: Option<&str>) -> CompleteArgs {
        CompleteArgs {
            prompt: "Plan my day".to_string(),
            system: system.map(String::from),
            model: Some("gpt-4o-mini".to_string()),
            temperature: None,
            max_tokens: Some(64),
            json: false,
        }
    }

    #[test]
    fn test_blank_system_prompt_is_skipped() {
        let messages = args(Some("  ")).messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role(), MessageRole::User);

        let messages = args(Some("Be brief")).messages();
        assert_eq!(messages[0].role(), MessageRole::System);
    }

    #[test]
    fn test_options_carry_overrides() {
        let options = args(None).options();
        assert_eq!(options.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(options.max_tokens, Some(64));
        assert!(options.temperature.is_none());
    }
}
