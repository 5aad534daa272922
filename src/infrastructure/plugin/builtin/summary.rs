//! Model-backed summary plugin

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::InvocationOptions;
use crate::domain::plugin::{
    AnalysisPlugin, DomainRecord, Insight, InsightGenerator, InsightPriority, PluginAnalysis,
    PluginError, PluginMetadata,
};
use crate::infrastructure::services::ModelGateway;

pub const SUMMARY_PLUGIN_ID: &str = "summary";

const SYSTEM_PROMPT: &str = "You summarize records for a personal productivity assistant. \
Reply with JSON only, shaped as {\"summary\": string, \"category\": string, \
\"priority\": \"low\" | \"medium\" | \"high\" | \"critical\"}. \
Keep the summary under 40 words.";

/// What the model is asked to return
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub summary: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

impl RecordSummary {
    pub fn priority(&self) -> InsightPriority {
        self.priority
            .as_deref()
            .map_or(InsightPriority::Medium, InsightPriority::from_label)
    }
}

/// Summarizes, categorizes and prioritizes a record through the model gateway
#[derive(Debug)]
pub struct SummaryPlugin {
    metadata: PluginMetadata,
    gateway: Arc<ModelGateway>,
    options: InvocationOptions,
}

impl SummaryPlugin {
    pub fn new(gateway: Arc<ModelGateway>) -> Self {
        Self {
            metadata: PluginMetadata::new(SUMMARY_PLUGIN_ID, "Record Summary", "1.0.0")
                .with_description("Model-generated summary, category and priority"),
            gateway,
            options: InvocationOptions::builder()
                .temperature(0.2)
                .max_tokens(300)
                .build(),
        }
    }

    pub fn with_options(mut self, options: InvocationOptions) -> Self {
        self.options = options;
        self
    }

    async fn summarize(&self, record: &DomainRecord) -> Result<RecordSummary, PluginError> {
        let prompt = render_prompt(record).ok_or_else(|| {
            PluginError::analysis(SUMMARY_PLUGIN_ID, "Record has no text fields to summarize")
        })?;

        let summary: RecordSummary = self
            .gateway
            .complete_json(SYSTEM_PROMPT, &prompt, &self.options)
            .await?;

        debug!(record_id = %record.id, priority = ?summary.priority(), "Record summarized");
        Ok(summary)
    }

    fn insight_for(record: &DomainRecord, summary: &RecordSummary) -> Option<Insight> {
        let priority = summary.priority();
        if priority < InsightPriority::High {
            return None;
        }

        let title = match summary.category {
            Some(ref category) => format!("High-priority {}: {}", category, record.id),
            None => format!("High-priority record: {}", record.id),
        };

        Some(
            Insight::new(SUMMARY_PLUGIN_ID, title, priority)
                .with_description(&summary.summary)
                .with_record(&record.id),
        )
    }
}

fn render_prompt(record: &DomainRecord) -> Option<String> {
    let mut prompt = String::new();

    for (key, text) in record.text_fields() {
        if !text.trim().is_empty() {
            let _ = writeln!(prompt, "{}: {}", key, text.trim());
        }
    }

    if prompt.is_empty() {
        return None;
    }

    Some(format!("Record type: {}\n{}", record.kind, prompt))
}

#[async_trait]
impl AnalysisPlugin for SummaryPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    async fn analyze(&self, record: &DomainRecord) -> Result<PluginAnalysis, PluginError> {
        let summary = self.summarize(record).await?;
        let value = serde_json::to_value(&summary)
            .map_err(|e| PluginError::analysis(SUMMARY_PLUGIN_ID, e.to_string()))?;

        let mut analysis = PluginAnalysis::new().with_field(SUMMARY_PLUGIN_ID, value);
        if let Some(insight) = Self::insight_for(record, &summary) {
            analysis = analysis.with_insight(insight);
        }

        Ok(analysis)
    }

    fn insight_generator(&self) -> Option<&dyn InsightGenerator> {
        Some(self)
    }
}

#[async_trait]
impl InsightGenerator for SummaryPlugin {
    async fn generate_insights(
        &self,
        records: &[DomainRecord],
    ) -> Result<Vec<Insight>, PluginError> {
        let mut insights = Vec::new();

        for record in records {
            let summary = self.summarize(record).await?;
            insights.extend(Self::insight_for(record, &summary));
        }

        Ok(insights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LlmError;
    use crate::infrastructure::llm::MockProvider;
    use serde_json::json;

    fn plugin_replying(reply: &str) -> SummaryPlugin {
        let gateway = ModelGateway::builder(Arc::new(MockProvider::new("mock").with_response(reply)))
            .build();
        SummaryPlugin::new(Arc::new(gateway))
    }

    fn task() -> DomainRecord {
        DomainRecord::new("t1", "task").with_field("title", "File taxes before Friday")
    }

    #[tokio::test]
    async fn test_summary_enrichment() {
        let plugin = plugin_replying(
            "```json\n{\"summary\": \"Taxes due Friday\", \"category\": \"finance\", \"priority\": \"high\"}\n```",
        );

        let analysis = plugin.analyze(&task()).await.unwrap();

        assert_eq!(
            analysis.enrichment["summary"],
            json!({"summary": "Taxes due Friday", "category": "finance", "priority": "high"})
        );
        assert_eq!(analysis.insights.len(), 1);
        assert_eq!(analysis.insights[0].title, "High-priority finance: t1");
    }

    #[tokio::test]
    async fn test_low_priority_has_no_insight() {
        let plugin = plugin_replying(r#"{"summary": "Lunch menu", "priority": "low"}"#);

        let insights = plugin.generate_insights(&[task()]).await.unwrap();
        assert!(insights.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_reply_is_parse_error() {
        let plugin = plugin_replying("Sure! Here is a summary.");

        let error = plugin.analyze(&task()).await.unwrap_err();
        assert!(matches!(error, PluginError::Llm(LlmError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_record_without_text() {
        let plugin = plugin_replying("{}");
        let record = DomainRecord::new("n1", "note").with_field("stars", 4);

        let error = plugin.analyze(&record).await.unwrap_err();
        assert!(matches!(error, PluginError::Analysis { .. }));
    }
}
