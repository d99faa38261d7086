use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use super::batch::{BatchOrchestrator, BatchOutcome, BatchReport};
use super::repository::{RecordSink, RecordSource};
use super::rules::RuleSet;
use crate::config::QualityConfig;
use crate::monitoring::{
    metrics, AggregateStats, AlertEvaluator, AlertEvent, ResourceSampler, ResourceSnapshot,
    RunHistory,
};
use crate::workflows::ingest::CsvRecordSource;

/// Result of one alert check cycle.
#[derive(Debug, Clone, Serialize)]
pub struct AlertReport {
    pub checked_at: DateTime<Utc>,
    pub stats: AggregateStats,
    pub resources: ResourceSnapshot,
    pub alerts: Vec<AlertEvent>,
    /// Alerts raised across every check since startup.
    pub alerts_raised_total: usize,
}

#[derive(Debug, Default)]
struct MonitorState {
    history: RunHistory,
    alerts_raised: usize,
}

/// Facade owning the orchestrator plus the caller-side run history used for alerting.
pub struct QualityPipelineService<K> {
    config: QualityConfig,
    orchestrator: BatchOrchestrator<K>,
    sampler: Arc<dyn ResourceSampler>,
    evaluator: AlertEvaluator,
    state: Mutex<MonitorState>,
}

impl<K> QualityPipelineService<K>
where
    K: RecordSink + 'static,
{
    pub fn new(config: QualityConfig, sink: Arc<K>, sampler: Arc<dyn ResourceSampler>) -> Self {
        let orchestrator = BatchOrchestrator::new(
            config.rules.clone(),
            config.classification.clone(),
            sink,
            config.pipeline.clone(),
        );

        Self {
            config,
            orchestrator,
            sampler,
            evaluator: AlertEvaluator,
            state: Mutex::new(MonitorState::default()),
        }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleSet {
        &self.config.rules
    }

    /// Run one batch and remember its outcome for alerting.
    pub fn process<S>(&self, source: &S) -> Result<BatchReport, QualityServiceError>
    where
        S: RecordSource + ?Sized,
    {
        let report = self.orchestrator.execute(source);
        self.state()?.history.record(report.outcome.clone());
        Ok(report)
    }

    pub fn process_csv(
        &self,
        dataset: &str,
        csv: impl Into<Vec<u8>>,
    ) -> Result<BatchReport, QualityServiceError> {
        let source = CsvRecordSource::from_bytes(dataset, csv);
        self.process(&source)
    }

    /// Newest first.
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<BatchOutcome>, QualityServiceError> {
        Ok(self.state()?.history.recent(limit))
    }

    pub fn check_alerts(&self) -> Result<AlertReport, QualityServiceError> {
        let resources = self.sampler.sample();
        metrics::record_resources(&resources);
        let checked_at = Utc::now();

        let mut state = self.state()?;
        let stats = state.history.stats();
        let alerts = self
            .evaluator
            .evaluate(&stats, &resources, &self.config.alerts, checked_at);
        state.alerts_raised += alerts.len();

        for alert in &alerts {
            warn!(
                kind = ?alert.kind,
                severity = ?alert.severity,
                observed = alert.observed_value,
                threshold = alert.threshold,
                "alert triggered: {}",
                alert.message
            );
        }

        Ok(AlertReport {
            checked_at,
            stats,
            resources,
            alerts,
            alerts_raised_total: state.alerts_raised,
        })
    }

    fn state(&self) -> Result<MutexGuard<'_, MonitorState>, QualityServiceError> {
        self.state
            .lock()
            .map_err(|_| QualityServiceError::HistoryUnavailable)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QualityServiceError {
    #[error("run history unavailable: lock poisoned")]
    HistoryUnavailable,
}
