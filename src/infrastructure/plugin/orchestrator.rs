//! Plugin orchestrator
//!
//! Fans a record out to the selected plugins, bounds every call with a
//! timeout and folds the per-plugin outcomes into one [`AnalysisResult`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::registry::PluginRegistry;
use crate::domain::plugin::{
    AnalysisOutcome, AnalysisPlugin, AnalysisResult, AnalyzeOptions, DomainRecord,
    EnrichedRecord, Insight, PluginAnalysis, PluginError, PluginInfo,
};
use crate::infrastructure::metrics::{self, PluginOutcomeLabel};

/// Settled result of one plugin call
#[derive(Debug)]
struct PluginRun {
    plugin_id: String,
    result: Result<PluginAnalysis, PluginError>,
    duration: Duration,
}

/// A plugin call that has been launched but not yet awaited
struct Launched {
    plugin_id: String,
    handle: JoinHandle<Result<PluginAnalysis, PluginError>>,
    started: Instant,
}

/// Registry-backed fan-out over analysis plugins
#[derive(Debug)]
pub struct PluginOrchestrator {
    registry: Arc<PluginRegistry>,
    defaults: AnalyzeOptions,
}

impl PluginOrchestrator {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            defaults: AnalyzeOptions::default(),
        }
    }

    /// Defaults used by [`Self::analyze_with_defaults`]; any `plugins` selection is kept
    pub fn with_defaults(mut self, defaults: AnalyzeOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &AnalyzeOptions {
        &self.defaults
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub async fn register(&self, plugin: Arc<dyn AnalysisPlugin>) -> Result<(), PluginError> {
        self.registry.register(plugin).await
    }

    pub async fn activate(&self, plugin_id: &str) -> Result<(), PluginError> {
        self.registry.activate(plugin_id).await
    }

    pub async fn deactivate(&self, plugin_id: &str) -> Result<(), PluginError> {
        self.registry.deactivate(plugin_id).await
    }

    pub async fn unregister(&self, plugin_id: &str) -> Result<(), PluginError> {
        self.registry.unregister(plugin_id).await.map(|_| ())
    }

    pub async fn list_plugins(&self) -> Vec<PluginInfo> {
        self.registry.list_plugins().await
    }

    pub async fn analyze_with_defaults(
        &self,
        record: &DomainRecord,
    ) -> Result<AnalysisResult, PluginError> {
        self.analyze(record, &self.defaults).await
    }

    /// Fan a record out to the resolved plugin set and aggregate the outcomes.
    ///
    /// Plugin failures become outcomes when `continue_on_error` is set and are
    /// returned as errors otherwise. Timed-out plugin tasks are aborted; work
    /// between two await points of the plugin is not interrupted.
    #[instrument(skip_all, fields(record_id = %record.id))]
    pub async fn analyze(
        &self,
        record: &DomainRecord,
        options: &AnalyzeOptions,
    ) -> Result<AnalysisResult, PluginError> {
        let started = Instant::now();
        let plugins = self.registry.resolve(options.plugins.as_deref()).await;

        if plugins.is_empty() {
            return Err(PluginError::NoPluginsAvailable);
        }

        let timeout = Duration::from_millis(options.timeout_ms);
        let shared = Arc::new(record.clone());

        debug!(
            plugins = plugins.len(),
            parallel = options.parallel,
            timeout_ms = options.timeout_ms,
            "Starting analysis"
        );

        let runs = match (options.parallel, options.continue_on_error) {
            (true, true) => run_parallel(&plugins, &shared, timeout).await,
            (true, false) => run_parallel_fail_fast(&plugins, &shared, timeout).await?,
            (false, continue_on_error) => {
                run_sequential(&plugins, &shared, timeout, continue_on_error).await?
            }
        };

        let result = aggregate(record, runs, started);
        info!(
            succeeded = result.succeeded().len(),
            failed = result.failed().len(),
            duration_ms = result.total_duration_ms,
            "Analysis complete"
        );

        Ok(result)
    }

    /// Collect insights from every active plugin that can generate them,
    /// highest priority first. Ties keep plugin order.
    ///
    /// Generators run as spawned tasks sharing one deadline; a generator that
    /// fails, panics or runs out of time is logged and skipped.
    pub async fn generate_insights(&self, records: &[DomainRecord]) -> Vec<Insight> {
        let records: Arc<[DomainRecord]> = Arc::from(records);
        let deadline = tokio::time::Instant::now() + Duration::from_millis(self.defaults.timeout_ms);

        let launched: Vec<(String, JoinHandle<Result<Vec<Insight>, PluginError>>)> = self
            .registry
            .active_plugins()
            .await
            .into_iter()
            .filter(|plugin| plugin.insight_generator().is_some())
            .map(|plugin| {
                let plugin_id = plugin.metadata().id.clone();
                let records = Arc::clone(&records);
                let handle = tokio::spawn(async move {
                    match plugin.insight_generator() {
                        Some(generator) => generator.generate_insights(&records).await,
                        None => Ok(Vec::new()),
                    }
                });
                (plugin_id, handle)
            })
            .collect();

        let mut insights = Vec::new();

        for (plugin_id, mut handle) in launched {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(Ok(found))) => {
                    debug!(plugin_id = %plugin_id, count = found.len(), "Insights generated");
                    insights.extend(found);
                }
                Ok(Ok(Err(e))) => {
                    warn!(plugin_id = %plugin_id, error = %e, "Insight generation failed, skipping plugin");
                }
                Ok(Err(join_error)) => {
                    warn!(plugin_id = %plugin_id, error = %join_error, "Insight generator panicked, skipping plugin");
                }
                Err(_) => {
                    handle.abort();
                    warn!(plugin_id = %plugin_id, timeout_ms = self.defaults.timeout_ms, "Insight generation timed out, skipping plugin");
                }
            }
        }

        // stable: equal priorities stay in plugin order
        insights.sort_by(|a, b| b.priority.cmp(&a.priority));
        insights
    }

    /// Deactivate every active plugin, returning the lifecycle errors encountered
    pub async fn shutdown(&self) -> Vec<PluginError> {
        let mut errors = Vec::new();

        for plugin_id in self.registry.active_plugin_ids().await {
            if let Err(e) = self.registry.deactivate(&plugin_id).await {
                errors.push(e);
            }
        }

        info!(errors = errors.len(), "Plugin orchestrator shut down");
        errors
    }
}

fn launch(plugin: &Arc<dyn AnalysisPlugin>, record: &Arc<DomainRecord>) -> Launched {
    let plugin_id = plugin.metadata().id.clone();
    let plugin = Arc::clone(plugin);
    let record = Arc::clone(record);

    Launched {
        plugin_id,
        handle: tokio::spawn(async move { plugin.analyze(&record).await }),
        started: Instant::now(),
    }
}

async fn settle(launched: Launched, timeout: Duration) -> PluginRun {
    let Launched {
        plugin_id,
        mut handle,
        started,
    } = launched;

    let result = match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(PluginError::panicked(&plugin_id, join_error.to_string())),
        Err(_) => {
            handle.abort();
            Err(PluginError::timeout(&plugin_id, timeout.as_millis() as u64))
        }
    };

    PluginRun {
        plugin_id,
        result,
        duration: started.elapsed(),
    }
}

/// Launch everything, then wait for every plugin to settle
async fn run_parallel(
    plugins: &[Arc<dyn AnalysisPlugin>],
    record: &Arc<DomainRecord>,
    timeout: Duration,
) -> Vec<PluginRun> {
    let launched: Vec<Launched> = plugins.iter().map(|p| launch(p, record)).collect();

    join_all(launched.into_iter().map(|l| settle(l, timeout))).await
}

/// Launch everything and stop at the first failure, aborting the rest
async fn run_parallel_fail_fast(
    plugins: &[Arc<dyn AnalysisPlugin>],
    record: &Arc<DomainRecord>,
    timeout: Duration,
) -> Result<Vec<PluginRun>, PluginError> {
    let launched: Vec<Launched> = plugins.iter().map(|p| launch(p, record)).collect();
    let abort_handles: Vec<_> = launched.iter().map(|l| l.handle.abort_handle()).collect();

    let mut pending: FuturesUnordered<_> = launched
        .into_iter()
        .enumerate()
        .map(|(index, l)| async move { (index, settle(l, timeout).await) })
        .collect();

    let mut settled: Vec<Option<PluginRun>> = (0..plugins.len()).map(|_| None).collect();

    while let Some((index, run)) = pending.next().await {
        let PluginRun {
            plugin_id,
            result,
            duration,
        } = run;

        match result {
            Ok(analysis) => {
                settled[index] = Some(PluginRun {
                    plugin_id,
                    result: Ok(analysis),
                    duration,
                });
            }
            Err(e) => {
                warn!(plugin_id = %plugin_id, error = %e, "Plugin failed, aborting remaining plugins");
                record_run_metric(&plugin_id, &Err(&e), duration);
                abort_handles.iter().for_each(|h| h.abort());
                return Err(e);
            }
        }
    }

    Ok(settled.into_iter().flatten().collect())
}

/// One plugin at a time, in resolved order
async fn run_sequential(
    plugins: &[Arc<dyn AnalysisPlugin>],
    record: &Arc<DomainRecord>,
    timeout: Duration,
    continue_on_error: bool,
) -> Result<Vec<PluginRun>, PluginError> {
    let mut runs = Vec::with_capacity(plugins.len());

    for plugin in plugins {
        let run = settle(launch(plugin, record), timeout).await;

        match run.result {
            Err(e) if !continue_on_error => {
                warn!(plugin_id = %run.plugin_id, error = %e, "Plugin failed, aborting sequential analysis");
                record_run_metric(&run.plugin_id, &Err(&e), run.duration);
                return Err(e);
            }
            result => runs.push(PluginRun {
                plugin_id: run.plugin_id,
                result,
                duration: run.duration,
            }),
        }
    }

    Ok(runs)
}

/// Merge successful namespaces in resolved order; later plugins win key conflicts
fn aggregate(record: &DomainRecord, runs: Vec<PluginRun>, started: Instant) -> AnalysisResult {
    let mut enriched = EnrichedRecord::from_record(record);
    let mut outcomes = HashMap::with_capacity(runs.len());
    let mut insights = Vec::new();

    for run in runs {
        let duration_ms = run.duration.as_millis() as u64;
        record_run_metric(&run.plugin_id, &run.result.as_ref().map(|_| ()), run.duration);

        let outcome = match run.result {
            Ok(analysis) => {
                enriched.merge(&analysis.enrichment);
                insights.extend(analysis.insights);
                AnalysisOutcome::success(&run.plugin_id, analysis.enrichment, duration_ms)
            }
            Err(e) => {
                warn!(plugin_id = %run.plugin_id, error = %e, timed_out = e.is_timeout(), "Plugin analysis failed");
                AnalysisOutcome::failure(&run.plugin_id, e.to_string(), e.is_timeout(), duration_ms)
            }
        };

        outcomes.insert(run.plugin_id, outcome);
    }

    AnalysisResult {
        original: record.clone(),
        enriched,
        outcomes,
        insights,
        analyzed_at: Utc::now(),
        total_duration_ms: started.elapsed().as_millis() as u64,
    }
}

fn record_run_metric(plugin_id: &str, result: &Result<(), &PluginError>, duration: Duration) {
    let label = match result {
        Ok(()) => PluginOutcomeLabel::Success,
        Err(e) if e.is_timeout() => PluginOutcomeLabel::Timeout,
        Err(_) => PluginOutcomeLabel::Error,
    };
    metrics::record_plugin_analysis(plugin_id, label, duration);
}
