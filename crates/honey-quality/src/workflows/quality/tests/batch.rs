use super::common::*;

use crate::config::PipelineOptions;
use crate::workflows::quality::batch::{BatchOrchestrator, BatchStatus, Stage};
use crate::workflows::quality::classifier::ClassificationScheme;
use crate::workflows::quality::domain::{ComplianceStatus, QualityCategory};
use std::sync::Arc;

#[test]
fn empty_input_completes_with_zero_counts() {
    let (orchestrator, sink) = orchestrator(etl_rules(), options());
    let outcome = orchestrator.run(&VecSource::new(Vec::new()));

    assert_eq!(outcome.status, BatchStatus::Success);
    assert_eq!(outcome.records_in, 0);
    assert_eq!(outcome.records_accepted, 0);
    assert_eq!(outcome.records_loaded, 0);
    assert_eq!(outcome.average_score, None);
    assert!(outcome.failed_stage.is_none());

    let committed = sink.committed();
    assert_eq!(committed.len(), 1);
    assert!(committed[0].rows.is_empty());
    assert_eq!(sink.open_sessions(), 0);
}

#[test]
fn successful_run_scores_classifies_and_loads() {
    let (orchestrator, sink) = orchestrator(example_rules(), options());
    let source = VecSource::new(vec![
        ideal_sample("S-1"),
        sample("S-2", 22.0, 5.0, 12.0, 20.0),
        sample("S-3", 17.5, 1.0, 12.0, 20.0),
    ]);

    let report = orchestrator.execute(&source);
    let outcome = &report.outcome;
    assert!(outcome.is_success());
    assert_eq!(outcome.records_in, 3);
    assert_eq!(outcome.records_accepted, 2);
    assert_eq!(outcome.records_rejected, 1);
    assert_eq!(outcome.records_loaded, 2);
    assert_eq!(outcome.compliant_records, 2);
    assert_eq!(outcome.average_score, Some(97.5));
    assert_eq!(report.violations.get("ph_below_hard_minimum"), Some(&1));

    let committed = sink.committed();
    assert_eq!(committed.len(), 1);
    let batch = &committed[0];
    assert_eq!(batch.run_id, outcome.run_id);
    assert_eq!(batch.table, "honey_quality_data");
    assert_eq!(batch.metadata.row_count, 2);
    assert_eq!(batch.rows[1].record.sample_id, "S-2");
    assert_eq!(batch.rows[1].score, 95.0);
    assert_eq!(batch.rows[1].category, QualityCategory::Excellent);
    assert_eq!(batch.rows[1].compliance, ComplianceStatus::Compliant);
    assert!(batch.rows[1].breakdown.is_none());
}

#[test]
fn load_failure_preserves_the_sink_message() {
    let sink = Arc::new(FailingSink::default());
    let orchestrator = BatchOrchestrator::new(
        etl_rules(),
        ClassificationScheme::etl(),
        sink.clone(),
        options(),
    );

    let outcome = orchestrator.run(&VecSource::new(vec![ideal_sample("S-1")]));
    assert_eq!(outcome.status, BatchStatus::Failure);
    assert_eq!(outcome.failed_stage, Some(Stage::Load));
    assert_eq!(
        outcome.error.as_deref(),
        Some("sink unavailable: warehouse connection reset")
    );
    assert!(outcome.duration_seconds > 0.0);
    assert_eq!(outcome.records_in, 1);
    assert_eq!(outcome.records_accepted, 1);
    assert_eq!(outcome.records_loaded, 0);
    assert_eq!(sink.released(), 1);
}

#[test]
fn extraction_errors_fail_the_extraction_stage() {
    let (orchestrator, sink) = orchestrator(etl_rules(), options());
    let outcome = orchestrator.run(&UnavailableSource);

    assert_eq!(outcome.failed_stage, Some(Stage::Extraction));
    assert_eq!(
        outcome.error.as_deref(),
        Some("source unavailable: lab export share offline")
    );
    assert!(sink.committed().is_empty());
}

#[test]
fn collaborator_panics_become_failure_outcomes() {
    let (orchestrator, _sink) = orchestrator(etl_rules(), options());
    let outcome = orchestrator.run(&PanickingSource);

    assert_eq!(outcome.status, BatchStatus::Failure);
    assert_eq!(outcome.failed_stage, Some(Stage::Extraction));
    let error = outcome.error.expect("error message");
    assert!(error.contains("driver crashed"), "{error}");
}

#[test]
fn rejection_rate_above_limit_fails_validation() {
    let limited = PipelineOptions {
        max_rejection_rate: Some(0.5),
        ..options()
    };
    let (orchestrator, sink) = orchestrator(etl_rules(), limited);

    let at_limit = orchestrator.run(&VecSource::new(vec![
        ideal_sample("S-1"),
        sample("S-2", 45.0, 5.0, 12.0, 20.0),
    ]));
    assert!(at_limit.is_success());

    let over_limit = orchestrator.run(&VecSource::new(vec![
        ideal_sample("S-1"),
        sample("S-2", 45.0, 5.0, 12.0, 20.0),
        sample("S-3", 45.0, 5.0, 12.0, 20.0),
    ]));
    assert_eq!(over_limit.failed_stage, Some(Stage::Validation));
    assert_eq!(over_limit.records_rejected, 2);
    assert_eq!(sink.committed().len(), 1);
}

#[test]
fn load_writes_in_configured_chunks() {
    let chunked = PipelineOptions {
        batch_size: 2,
        retain_breakdown: true,
        ..options()
    };
    let (orchestrator, sink) = orchestrator(etl_rules(), chunked);
    let records = (1..=5).map(|n| ideal_sample(&format!("S-{n}"))).collect();

    let outcome = orchestrator.run(&VecSource::new(records));
    assert_eq!(outcome.records_loaded, 5);

    let committed = sink.committed();
    assert_eq!(committed[0].chunk_sizes, vec![2, 2, 1]);
    assert!(committed[0].rows.iter().all(|row| row.breakdown.is_some()));
    assert_eq!(sink.open_sessions(), 0);
}

#[test]
fn runs_share_nothing_but_the_rule_set() {
    let (orchestrator, sink) = orchestrator(etl_rules(), options());
    let first = orchestrator.run(&VecSource::new(vec![ideal_sample("S-1")]));
    let second = orchestrator.run(&VecSource::new(vec![ideal_sample("S-2")]));

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(second.records_in, 1);
    assert_eq!(sink.committed().len(), 2);
}

#[test]
fn outcome_serializes_to_a_flat_record() {
    let (orchestrator, _sink) = orchestrator(etl_rules(), options());
    let outcome = orchestrator.run(&VecSource::new(vec![ideal_sample("S-1")]));

    let value = serde_json::to_value(&outcome).expect("serializes");
    let object = value.as_object().expect("object");
    assert_eq!(object["status"], "success");
    assert!(object.values().all(|field| !field.is_object() && !field.is_array()));
}
