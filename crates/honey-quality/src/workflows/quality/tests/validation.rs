use super::common::*;

use crate::workflows::quality::domain::SampleRecord;
use crate::workflows::quality::rules::{Bounds, Rule, RulePreset, RuleSet, Tier};
use crate::workflows::quality::validator::{Validator, ViolationKey, ViolationKind};
use std::sync::Arc;

#[test]
fn accepts_records_within_hard_bounds_in_input_order() {
    let validator = Validator::new(etl_rules());
    let records = vec![
        sample("S-1", 19.5, 4.0, 9.0, 39.0),
        ideal_sample("S-2"),
        sample("S-3", 29.9, 7.9, 3.0, 80.0),
    ];

    let report = validator.validate(records);
    assert_eq!(report.rejected_count, 0);
    let ids: Vec<&str> = report
        .accepted
        .iter()
        .map(|record| record.sample_id.as_str())
        .collect();
    assert_eq!(ids, vec!["S-1", "S-2", "S-3"]);
}

#[test]
fn rejects_below_min_only_hard_bound_without_a_range_rule() {
    let diastase = Rule::min_only(
        "diastase_activity",
        8.0,
        vec![Tier::new(0.0, 0.0), Tier::catch_all(15.0)],
    )
    .and_then(|rule| rule.with_hard_bounds(Bounds::at_least(3.0)))
    .expect("valid rule");
    let validator = Validator::new(Arc::new(RuleSet::new([diastase]).expect("rule set")));

    let record = SampleRecord::new("B-1", "S-1").with_measurement("diastase_activity", 2.9);
    let report = validator.validate(vec![record]);

    assert!(report.accepted.is_empty());
    assert_eq!(report.rejected_count, 1);
    assert_eq!(
        report.violations.get(&ViolationKey {
            parameter: "diastase_activity".to_string(),
            kind: ViolationKind::BelowHardMinimum,
        }),
        Some(&1)
    );
}

#[test]
fn missing_and_non_finite_values_are_rejected() {
    let validator = Validator::new(etl_rules());
    let mut missing = ideal_sample("S-1");
    missing.measurements.remove("ph");
    let not_a_number = ideal_sample("S-2").with_measurement("h_m_f", f64::NAN);

    let report = validator.validate(vec![missing, not_a_number, ideal_sample("S-3")]);
    assert_eq!(report.accepted.len(), 1);
    assert_eq!(report.rejected_count, 2);

    let labels: Vec<String> = report.violations.keys().map(ViolationKey::metric_label).collect();
    assert_eq!(labels, vec!["h_m_f_missing_value", "ph_missing_value"]);
}

#[test]
fn one_record_can_tally_several_violations() {
    let validator = Validator::new(etl_rules());
    let record = sample("S-1", 31.0, 1.5, 12.0, 95.0);

    let violations = validator.check(&record);
    assert_eq!(violations.len(), 3);

    let report = validator.validate(vec![record]);
    assert_eq!(report.rejected_count, 1);
    assert_eq!(report.violations.values().sum::<usize>(), 3);
    assert_eq!(report.rejection_rate(), 1.0);
}

#[test]
fn target_rules_only_require_presence() {
    let validator = Validator::new(Arc::new(RuleSet::preset(RulePreset::Unified)));
    let wildly_off_target = sample("S-1", 45.0, 12.0, 12.0, 20.0);
    assert!(validator.check(&wildly_off_target).is_empty());
}

#[test]
fn empty_input_has_zero_rejection_rate() {
    let report = Validator::new(etl_rules()).validate(Vec::new());
    assert_eq!(report.total(), 0);
    assert_eq!(report.rejection_rate(), 0.0);
}
