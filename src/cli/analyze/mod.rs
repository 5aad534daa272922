//! Analyze command - plugin fan-out over records read from a JSON file

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::{AnalysisResult, AnalyzeOptions, DomainRecord, Insight};
use crate::{build_gateway, build_orchestrator};

#[derive(Args, Clone)]
pub struct AnalyzeArgs {
    /// JSON file holding one record or an array of records
    #[arg(long)]
    pub file: PathBuf,

    /// Restrict analysis to these plugin ids (repeatable)
    #[arg(long = "plugin")]
    pub plugins: Vec<String>,

    /// Run plugins one after another instead of concurrently
    #[arg(long)]
    pub sequential: bool,

    /// Per-plugin timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Abort on the first plugin failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Also run batch insight generation over all records
    #[arg(long)]
    pub insights: bool,
}

impl AnalyzeArgs {
    fn options(&self, defaults: &AnalyzeOptions) -> AnalyzeOptions {
        let mut options = defaults.clone();

        if !self.plugins.is_empty() {
            options = options.with_plugins(self.plugins.iter().cloned());
        }
        if self.sequential {
            options = options.sequential();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            options = options.with_timeout_ms(timeout_ms);
        }
        if self.fail_fast {
            options = options.fail_fast();
        }

        options
    }
}

#[derive(Serialize)]
struct AnalyzeReport {
    results: Vec<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    insights: Option<Vec<Insight>>,
}

pub async fn run(config: &AppConfig, args: AnalyzeArgs) -> anyhow::Result<()> {
    let records = read_records(&args.file)?;
    info!(count = records.len(), file = %args.file.display(), "Records loaded");

    let gateway = Arc::new(build_gateway(config)?);
    let orchestrator = build_orchestrator(config, gateway).await?;
    let options = args.options(orchestrator.defaults());

    let mut results = Vec::with_capacity(records.len());
    for record in &records {
        let result = orchestrator
            .analyze(record, &options)
            .await
            .with_context(|| format!("Analysis of record '{}' failed", record.id))?;

        if !result.is_complete_success() {
            warn!(record_id = %record.id, failed = ?result.failed(), "Some plugins failed");
        }
        results.push(result);
    }

    let insights = if args.insights {
        Some(orchestrator.generate_insights(&records).await)
    } else {
        None
    };

    let errors = orchestrator.shutdown().await;
    for error in &errors {
        warn!(error = %error, "Plugin shutdown failed");
    }

    let report = AnalyzeReport { results, insights };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn read_records(path: &Path) -> anyhow::Result<Vec<DomainRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_records(&raw).with_context(|| format!("Invalid records in {}", path.display()))
}

fn parse_records(raw: &str) -> anyhow::Result<Vec<DomainRecord>> {
    let value: Value = serde_json::from_str(raw)?;

    let records = match value {
        Value::Array(_) => serde_json::from_value(value)?,
        single => vec![serde_json::from_value(single)?],
    };

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> AnalyzeArgs {
        AnalyzeArgs {
            file: PathBuf::from("records.json"),
            plugins: vec![],
            sequential: false,
            timeout_ms: None,
            fail_fast: false,
            insights: false,
        }
    }

    #[test]
    fn test_parse_single_record_and_array() {
        let single = parse_records(r#"{"id": "n-1", "type": "note", "body": "hi"}"#).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].field_str("body"), Some("hi"));

        let many = parse_records(r#"[{"id": "a", "type": "task"}, {"id": "b"}]"#).unwrap();
        assert_eq!(many.len(), 2);
        assert_eq!(many[1].kind, "");
    }

    #[test]
    fn test_parse_rejects_records_without_id() {
        assert!(parse_records(r#"{"type": "note"}"#).is_err());
    }

    #[test]
    fn test_flags_override_defaults() {
        let defaults = AnalyzeOptions::default();
        assert_eq!(args().options(&defaults), defaults);

        let mut custom = args();
        custom.plugins = vec!["keywords".to_string()];
        custom.sequential = true;
        custom.timeout_ms = Some(500);
        custom.fail_fast = true;

        let options = custom.options(&defaults);
        assert_eq!(options.plugins, Some(vec!["keywords".to_string()]));
        assert!(!options.parallel);
        assert_eq!(options.timeout_ms, 500);
        assert!(!options.continue_on_error);
    }
}
