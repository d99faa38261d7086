//! Sequential extract -> validate -> score -> load orchestration.
//!
//! A run never propagates a failure to its caller. Collaborator errors and panics are
//! caught at this boundary and folded into a failed [`BatchOutcome`].

mod tracker;

pub use tracker::{RunState, Stage};

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use self::tracker::RunTracker;
use super::classifier::ClassificationScheme;
use super::domain::{RunId, SampleRecord, ScoredRecord};
use super::repository::{LoadMetadata, LoadSession, RecordSink, RecordSource, SinkError};
use super::rules::RuleSet;
use super::scoring::{ScoringEngine, ScoringError};
use super::summary::QualitySummary;
use super::validator::Validator;
use crate::config::PipelineOptions;
use crate::monitoring::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Success,
    Failure,
}

impl BatchStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Terminal, flat record of a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub run_id: RunId,
    pub pipeline: String,
    pub status: BatchStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub records_in: usize,
    pub records_accepted: usize,
    pub records_rejected: usize,
    pub records_loaded: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_score: Option<f64>,
    pub compliant_records: usize,
    pub warning_records: usize,
    pub non_compliant_records: usize,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.status == BatchStatus::Success
    }

    /// Records that made it through scoring and classification.
    pub fn scored_records(&self) -> usize {
        self.compliant_records + self.warning_records + self.non_compliant_records
    }
}

/// Outcome plus the detail gathered on the way, for callers that render reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub outcome: BatchOutcome,
    pub summary: QualitySummary,
    /// Rejection tallies keyed by `<parameter>_<violation>`.
    pub violations: BTreeMap<String, usize>,
}

/// Runs batches against an injected sink. One instance may serve many sequential or
/// concurrent runs; nothing is carried from one run to the next.
pub struct BatchOrchestrator<K> {
    validator: Validator,
    engine: ScoringEngine,
    classification: ClassificationScheme,
    sink: Arc<K>,
    options: PipelineOptions,
}

impl<K> BatchOrchestrator<K>
where
    K: RecordSink,
{
    pub fn new(
        rules: Arc<RuleSet>,
        classification: ClassificationScheme,
        sink: Arc<K>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            validator: Validator::new(rules.clone()),
            engine: ScoringEngine::new(rules),
            classification,
            sink,
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn rules(&self) -> &RuleSet {
        self.engine.rules()
    }

    pub fn run<S>(&self, source: &S) -> BatchOutcome
    where
        S: RecordSource + ?Sized,
    {
        self.execute(source).outcome
    }

    pub fn execute<S>(&self, source: &S) -> BatchReport
    where
        S: RecordSource + ?Sized,
    {
        let dataset = source.name().to_string();
        let mut tracker = RunTracker::new(&self.options.name);
        let mut progress = Progress::default();

        let outcome = match self.drive(source, &mut tracker, &mut progress) {
            Ok(()) => tracker.complete(),
            Err(message) => tracker.fail(message),
        };

        metrics::record_violations(progress.violations.iter(), &dataset);
        metrics::record_outcome(&outcome, &dataset);

        if outcome.is_success() {
            info!(
                run_id = %outcome.run_id,
                pipeline = %outcome.pipeline,
                dataset = %dataset,
                records_in = outcome.records_in,
                records_accepted = outcome.records_accepted,
                records_rejected = outcome.records_rejected,
                records_loaded = outcome.records_loaded,
                duration_seconds = outcome.duration_seconds,
                "batch run completed"
            );
        } else {
            warn!(
                run_id = %outcome.run_id,
                pipeline = %outcome.pipeline,
                dataset = %dataset,
                stage = outcome.failed_stage.map(Stage::label).unwrap_or("unknown"),
                error = outcome.error.as_deref().unwrap_or_default(),
                records_in = outcome.records_in,
                duration_seconds = outcome.duration_seconds,
                "batch run failed"
            );
        }

        BatchReport {
            outcome,
            summary: progress.summary,
            violations: progress
                .violations
                .iter()
                .map(|(key, count)| (key.metric_label(), *count))
                .collect(),
        }
    }

    fn drive<S>(
        &self,
        source: &S,
        tracker: &mut RunTracker,
        progress: &mut Progress,
    ) -> Result<(), String>
    where
        S: RecordSource + ?Sized,
    {
        tracker.enter(Stage::Extraction);
        let records = guarded(|| source.extract())?.map_err(|err| err.to_string())?;
        tracker.extracted(records.len());
        debug!(run_id = %tracker.run_id(), records = records.len(), "records extracted");

        tracker.enter(Stage::Validation);
        let report = guarded(|| self.validator.validate(records))?;
        tracker.validated(report.accepted.len(), report.rejected_count);
        let rejection_rate = report.rejection_rate();
        progress.violations = report.violations;
        if let Some(limit) = self.options.max_rejection_rate {
            if rejection_rate > limit {
                return Err(format!(
                    "rejection rate {rejection_rate:.3} exceeds configured maximum {limit:.3}"
                ));
            }
        }

        tracker.enter(Stage::Scoring);
        let scored =
            guarded(|| self.score_all(report.accepted))?.map_err(|err| err.to_string())?;
        progress.summary = QualitySummary::from_records(&scored);
        tracker.scored(progress.summary.clone());

        tracker.enter(Stage::Load);
        let run_id = tracker.run_id().clone();
        let loaded = guarded(|| self.load(&run_id, &scored, &progress.summary))?
            .map_err(|err| err.to_string())?;
        tracker.loaded(loaded);

        Ok(())
    }

    fn score_all(&self, records: Vec<SampleRecord>) -> Result<Vec<ScoredRecord>, ScoringError> {
        let processed_at = Utc::now();
        records
            .into_iter()
            .map(|record| {
                let card = self.engine.score(&record)?;
                let (category, compliance) = self.classification.classify(card.score);
                Ok(ScoredRecord {
                    record,
                    score: card.score,
                    category,
                    compliance,
                    processed_at,
                    breakdown: self.options.retain_breakdown.then_some(card.breakdown),
                })
            })
            .collect()
    }

    fn load(
        &self,
        run_id: &RunId,
        scored: &[ScoredRecord],
        summary: &QualitySummary,
    ) -> Result<usize, SinkError> {
        let mut session = self.sink.begin(run_id, &self.options.table)?;
        let mut written = 0;
        for chunk in scored.chunks(self.options.batch_size.max(1)) {
            written += session.write_chunk(chunk)?;
            debug!(run_id = %run_id, written, "chunk written");
        }

        session.commit(LoadMetadata {
            run_id: run_id.clone(),
            table: self.options.table.clone(),
            committed_at: Utc::now(),
            row_count: written,
            summary: summary.clone(),
        })?;
        Ok(written)
    }
}

#[derive(Default)]
struct Progress {
    summary: QualitySummary,
    violations: BTreeMap<super::validator::ViolationKey, usize>,
}

/// Run a collaborator call, turning a panic into a stage error message.
fn guarded<T>(call: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(call)).map_err(|payload| {
        format!("collaborator panicked: {}", panic_message(payload.as_ref()))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}
