//! Keyword extraction plugin. Deterministic, no model calls.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::domain::plugin::{
    AnalysisPlugin, DomainRecord, Insight, InsightGenerator, InsightPriority, PluginAnalysis,
    PluginError, PluginMetadata,
};

pub const KEYWORDS_PLUGIN_ID: &str = "keywords";

const MIN_TERM_LEN: usize = 3;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "have", "his", "how", "its", "may", "new", "now", "see", "two",
    "who", "did", "get", "let", "put", "say", "she", "too", "use", "that", "this", "with",
    "from", "they", "will", "would", "there", "their", "what", "about", "which", "when", "your",
    "were", "been", "into", "than", "then", "them", "these", "some", "could", "should", "just",
    "also", "only", "very", "more", "most", "other", "such", "over", "here", "please", "thanks",
];

/// Keyword plugin settings
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordsConfig {
    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,
    /// Terms that raise a high-priority insight when present
    #[serde(default = "default_watch_words")]
    pub watch_words: Vec<String>,
}

fn default_max_keywords() -> usize {
    5
}

fn default_watch_words() -> Vec<String> {
    ["urgent", "asap", "deadline", "overdue"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            max_keywords: default_max_keywords(),
            watch_words: default_watch_words(),
        }
    }
}

/// Extracts the most frequent terms of a record's text fields
#[derive(Debug)]
pub struct KeywordsPlugin {
    metadata: PluginMetadata,
    config: KeywordsConfig,
}

impl KeywordsPlugin {
    pub fn new(config: KeywordsConfig) -> Self {
        Self {
            metadata: PluginMetadata::new(KEYWORDS_PLUGIN_ID, "Keyword Extractor", "1.0.0")
                .with_description("Most frequent non-stopword terms and watch-word alerts"),
            config,
        }
    }

    /// Ranked by frequency, ties broken by first appearance
    fn extract(&self, record: &DomainRecord) -> Vec<String> {
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        let mut position = 0;

        for term in terms(record) {
            let entry = counts.entry(term).or_insert((0, position));
            entry.0 += 1;
            position += 1;
        }

        let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
        ranked.sort_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_b.cmp(count_a).then(first_a.cmp(first_b))
        });

        ranked
            .into_iter()
            .take(self.config.max_keywords)
            .map(|(term, _)| term)
            .collect()
    }

    fn watch_words_in(&self, record: &DomainRecord) -> Vec<&str> {
        let found: Vec<String> = terms(record).collect();

        self.config
            .watch_words
            .iter()
            .filter(|word| found.iter().any(|term| term.eq_ignore_ascii_case(word)))
            .map(String::as_str)
            .collect()
    }
}

impl Default for KeywordsPlugin {
    fn default() -> Self {
        Self::new(KeywordsConfig::default())
    }
}

fn terms(record: &DomainRecord) -> impl Iterator<Item = String> + '_ {
    record
        .text_fields()
        .flat_map(|(_, text)| text.split(|c: char| !c.is_alphanumeric()))
        .filter(|word| word.chars().count() >= MIN_TERM_LEN)
        .filter(|word| !word.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_lowercase)
        .filter(|word| !STOPWORDS.contains(&word.as_str()))
}

#[async_trait]
impl AnalysisPlugin for KeywordsPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    async fn analyze(&self, record: &DomainRecord) -> Result<PluginAnalysis, PluginError> {
        let keywords = self.extract(record);
        let mut analysis = PluginAnalysis::new().with_field("keywords", json!(keywords));

        for word in self.watch_words_in(record) {
            analysis = analysis.with_insight(
                Insight::new(
                    KEYWORDS_PLUGIN_ID,
                    format!("Watch word '{}' found", word),
                    InsightPriority::High,
                )
                .with_record(&record.id),
            );
        }

        Ok(analysis)
    }

    fn insight_generator(&self) -> Option<&dyn InsightGenerator> {
        Some(self)
    }
}

#[async_trait]
impl InsightGenerator for KeywordsPlugin {
    /// One insight per watch word, listing every record that mentions it
    async fn generate_insights(
        &self,
        records: &[DomainRecord],
    ) -> Result<Vec<Insight>, PluginError> {
        let mut insights = Vec::new();

        for word in &self.config.watch_words {
            let matching: Vec<&DomainRecord> = records
                .iter()
                .filter(|record| self.watch_words_in(record).contains(&word.as_str()))
                .collect();

            if matching.is_empty() {
                continue;
            }

            let priority = if matching.len() > 1 {
                InsightPriority::Critical
            } else {
                InsightPriority::High
            };

            let insight = matching.iter().fold(
                Insight::new(
                    KEYWORDS_PLUGIN_ID,
                    format!("'{}' mentioned in {} record(s)", word, matching.len()),
                    priority,
                ),
                |insight, record| insight.with_record(&record.id),
            );
            insights.push(insight);
        }

        Ok(insights)
    }
}
