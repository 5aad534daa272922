//! Models command - provider chain introspection

use crate::build_gateway;
use crate::config::AppConfig;

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    let gateway = build_gateway(config)?;

    for (entry, status) in gateway
        .available_models()
        .into_iter()
        .zip(gateway.rate_limit_status())
    {
        println!(
            "{} ({}/{} requests left, resets in {}ms)",
            entry.provider, status.remaining, status.limit, status.reset_in_ms
        );
        for model in entry.models {
            println!("  - {model}");
        }
    }

    Ok(())
}
