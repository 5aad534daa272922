use clap::Parser;
use pmp_ai_core::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli::init(cli.config.as_deref())?;

    match cli.command {
        Command::Complete(args) => cli::complete::run(&config, args).await,
        Command::Models => cli::models::run(&config).await,
        Command::Analyze(args) => cli::analyze::run(&config, args).await,
    }
}
