use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BatchOutcome, BatchStatus};
use crate::workflows::quality::domain::{ComplianceStatus, RunId};
use crate::workflows::quality::summary::QualitySummary;

/// Orchestrator stage that a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extraction,
    Validation,
    Scoring,
    Load,
}

impl Stage {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Extraction => "extraction",
            Self::Validation => "validation",
            Self::Scoring => "scoring",
            Self::Load => "load",
        }
    }
}

/// Lifecycle of a single run. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running(Stage),
    Completed,
    Failed(Stage),
}

static RUN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_run_id(started_at: DateTime<Utc>) -> RunId {
    let sequence = RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RunId(format!(
        "run-{}-{sequence:04}",
        started_at.format("%Y%m%dT%H%M%S")
    ))
}

/// Mutable bookkeeping for one run; consumed into a [`BatchOutcome`] exactly once.
#[derive(Debug)]
pub(crate) struct RunTracker {
    run_id: RunId,
    pipeline: String,
    started_at: DateTime<Utc>,
    clock: Instant,
    state: RunState,
    records_in: usize,
    records_accepted: usize,
    records_rejected: usize,
    records_loaded: usize,
    summary: Option<QualitySummary>,
}

impl RunTracker {
    pub(crate) fn new(pipeline: &str) -> Self {
        let started_at = Utc::now();
        Self {
            run_id: next_run_id(started_at),
            pipeline: pipeline.to_string(),
            started_at,
            clock: Instant::now(),
            state: RunState::NotStarted,
            records_in: 0,
            records_accepted: 0,
            records_rejected: 0,
            records_loaded: 0,
            summary: None,
        }
    }

    pub(crate) fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub(crate) fn enter(&mut self, stage: Stage) {
        self.state = RunState::Running(stage);
    }

    pub(crate) fn extracted(&mut self, records_in: usize) {
        self.records_in = records_in;
    }

    pub(crate) fn validated(&mut self, accepted: usize, rejected: usize) {
        self.records_accepted = accepted;
        self.records_rejected = rejected;
    }

    pub(crate) fn scored(&mut self, summary: QualitySummary) {
        self.summary = Some(summary);
    }

    pub(crate) fn loaded(&mut self, records_loaded: usize) {
        self.records_loaded = records_loaded;
    }

    pub(crate) fn complete(mut self) -> BatchOutcome {
        self.state = RunState::Completed;
        self.finalize(BatchStatus::Success, None, None)
    }

    /// Fail the stage currently running.
    pub(crate) fn fail(mut self, error: String) -> BatchOutcome {
        let stage = match self.state {
            RunState::Running(stage) | RunState::Failed(stage) => stage,
            RunState::NotStarted | RunState::Completed => Stage::Extraction,
        };
        self.state = RunState::Failed(stage);
        self.finalize(BatchStatus::Failure, Some(stage), Some(error))
    }

    fn finalize(
        self,
        status: BatchStatus,
        failed_stage: Option<Stage>,
        error: Option<String>,
    ) -> BatchOutcome {
        let ended_at = Utc::now();
        // Finished runs always report a positive duration, even on coarse clocks.
        let duration_seconds = self.clock.elapsed().as_secs_f64().max(f64::MIN_POSITIVE);
        let summary = self.summary.unwrap_or_default();

        BatchOutcome {
            run_id: self.run_id,
            pipeline: self.pipeline,
            status,
            started_at: self.started_at,
            ended_at,
            duration_seconds,
            records_in: self.records_in,
            records_accepted: self.records_accepted,
            records_rejected: self.records_rejected,
            records_loaded: self.records_loaded,
            failed_stage,
            error,
            average_score: summary.average_score,
            compliant_records: summary.compliance_count(ComplianceStatus::Compliant),
            warning_records: summary.compliance_count(ComplianceStatus::Warning),
            non_compliant_records: summary.compliance_count(ComplianceStatus::NonCompliant),
        }
    }
}
