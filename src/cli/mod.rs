//! CLI module for PMP AI Core
//!
//! Subcommands exercise the core against the configured providers:
//! - `complete`: single completion through the gateway
//! - `models`: models advertised by every provider in the chain
//! - `analyze`: fan records from a JSON file out to the plugins

pub mod analyze;
pub mod complete;
pub mod models;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// PMP AI Core - model gateway and plugin orchestration
#[derive(Parser)]
#[command(name = "pmp-ai-core")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Extra configuration file layered over config/default and config/local
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Send a single prompt through the model gateway
    Complete(complete::CompleteArgs),

    /// List the models of every configured provider
    Models,

    /// Analyze records from a JSON file with the registered plugins
    Analyze(analyze::AnalyzeArgs),
}

/// Load `.env` and the layered configuration, then install logging.
///
/// Without an explicit file a broken configuration falls back to defaults.
pub fn init(config_path: Option<&Path>) -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = match config_path {
        Some(path) => AppConfig::load_from(Some(path))?,
        None => AppConfig::load().unwrap_or_default(),
    };

    logging::init_logging(&config.logging);
    Ok(config)
}
