//! Rule-based honey quality assessment.
//!
//! Records flow through the [`validator`] (hard-bound gate), the [`scoring`] engine
//! (tiered penalties from the [`rules`] table) and the [`classifier`], and are then
//! handed to a [`repository::RecordSink`] by the [`batch`] orchestrator.

pub mod batch;
pub mod classifier;
pub mod domain;
pub mod repository;
pub mod router;
pub mod rules;
pub mod scoring;
pub mod service;
pub mod summary;
pub mod validator;

#[cfg(test)]
mod tests;

pub use batch::{
    BatchOrchestrator, BatchOutcome, BatchReport, BatchStatus, RunState, Stage,
};
pub use classifier::{Band, BandTable, ClassificationError, ClassificationScheme};
pub use domain::{ComplianceStatus, QualityCategory, RunId, SampleRecord, ScoredRecord};
pub use repository::{
    LoadMetadata, LoadSession, RecordSink, RecordSource, SinkError, SourceError,
};
pub use router::quality_router;
pub use rules::{Bounds, Rule, RuleError, RuleKind, RulePreset, RuleSet, Tier};
pub use scoring::{score_record, ScoreBreakdown, ScoreCard, ScoringEngine, ScoringError, TierHit};
pub use service::{AlertReport, QualityPipelineService, QualityServiceError};
pub use summary::{LabSummary, QualitySummary};
pub use validator::{ValidationReport, Validator, ViolationKey, ViolationKind};
