//! Fan-out options, per-plugin outcomes and the aggregate analysis result

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::insight::Insight;
use super::record::{DomainRecord, EnrichedRecord};

pub const DEFAULT_ANALYSIS_TIMEOUT_MS: u64 = 30_000;

/// Options for a single `analyze` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeOptions {
    /// Explicit plugin selection; `None` means every active plugin
    #[serde(default)]
    pub plugins: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_true")]
    pub continue_on_error: bool,
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    DEFAULT_ANALYSIS_TIMEOUT_MS
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            plugins: None,
            parallel: true,
            timeout_ms: DEFAULT_ANALYSIS_TIMEOUT_MS,
            continue_on_error: true,
        }
    }
}

impl AnalyzeOptions {
    pub fn with_plugins<I, S>(mut self, plugins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plugins = Some(plugins.into_iter().map(Into::into).collect());
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn fail_fast(mut self) -> Self {
        self.continue_on_error = false;
        self
    }
}

/// Outcome of one plugin for one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub plugin_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub timed_out: bool,
    pub duration_ms: u64,
}

impl AnalysisOutcome {
    pub fn success(
        plugin_id: impl Into<String>,
        enrichment: Map<String, Value>,
        duration_ms: u64,
    ) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            success: true,
            enrichment: Some(enrichment),
            error: None,
            timed_out: false,
            duration_ms,
        }
    }

    pub fn failure(
        plugin_id: impl Into<String>,
        error: impl Into<String>,
        timed_out: bool,
        duration_ms: u64,
    ) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            success: false,
            enrichment: None,
            error: Some(error.into()),
            timed_out,
            duration_ms,
        }
    }
}

/// Aggregate result of fanning one record out to the selected plugins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub original: DomainRecord,
    pub enriched: EnrichedRecord,
    pub outcomes: HashMap<String, AnalysisOutcome>,
    pub insights: Vec<Insight>,
    pub analyzed_at: DateTime<Utc>,
    pub total_duration_ms: u64,
}

impl AnalysisResult {
    pub fn outcome(&self, plugin_id: &str) -> Option<&AnalysisOutcome> {
        self.outcomes.get(plugin_id)
    }

    /// Ids of plugins that succeeded, sorted
    pub fn succeeded(&self) -> Vec<&str> {
        self.filter_outcomes(|o| o.success)
    }

    /// Ids of plugins that failed (including timeouts), sorted
    pub fn failed(&self) -> Vec<&str> {
        self.filter_outcomes(|o| !o.success)
    }

    pub fn is_complete_success(&self) -> bool {
        self.outcomes.values().all(|o| o.success)
    }

    fn filter_outcomes(&self, predicate: impl Fn(&AnalysisOutcome) -> bool) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .outcomes
            .values()
            .filter(|o| predicate(o))
            .map(|o| o.plugin_id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = AnalyzeOptions::default();
        assert!(options.plugins.is_none());
        assert!(options.parallel);
        assert_eq!(options.timeout_ms, 30_000);
        assert!(options.continue_on_error);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: AnalyzeOptions = serde_json::from_str(r#"{"timeout_ms": 50}"#).unwrap();
        assert_eq!(options.timeout_ms, 50);
        assert!(options.parallel);
        assert!(options.continue_on_error);
    }

    #[test]
    fn test_options_builder() {
        let options = AnalyzeOptions::default()
            .with_plugins(["a", "b"])
            .sequential()
            .fail_fast()
            .with_timeout_ms(10);

        assert_eq!(options.plugins, Some(vec!["a".to_string(), "b".to_string()]));
        assert!(!options.parallel);
        assert!(!options.continue_on_error);
        assert_eq!(options.timeout_ms, 10);
    }

    #[test]
    fn test_result_partitions_outcomes() {
        let record = DomainRecord::new("r", "note");
        let mut outcomes = HashMap::new();
        outcomes.insert("a".to_string(), AnalysisOutcome::success("a", Map::new(), 1));
        outcomes.insert(
            "b".to_string(),
            AnalysisOutcome::failure("b", "Timeout after 5ms", true, 5),
        );

        let result = AnalysisResult {
            enriched: EnrichedRecord::from_record(&record),
            original: record,
            outcomes,
            insights: vec![],
            analyzed_at: Utc::now(),
            total_duration_ms: 5,
        };

        assert_eq!(result.succeeded(), vec!["a"]);
        assert_eq!(result.failed(), vec!["b"]);
        assert!(!result.is_complete_success());
        assert!(result.outcome("b").unwrap().timed_out);
    }
}
