use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::SampleRecord;
use super::rules::{Rule, RuleSet};

/// Reason a record was turned away before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    MissingValue,
    BelowHardMinimum,
    AboveHardMaximum,
}

impl ViolationKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::MissingValue => "missing_value",
            Self::BelowHardMinimum => "below_hard_minimum",
            Self::AboveHardMaximum => "above_hard_maximum",
        }
    }
}

/// Key used to tally violations per parameter and kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViolationKey {
    pub parameter: String,
    pub kind: ViolationKind,
}

impl ViolationKey {
    /// Metric label such as `moisture_above_hard_maximum`.
    pub fn metric_label(&self) -> String {
        format!("{}_{}", self.parameter, self.kind.label())
    }
}

/// Accepted records in input order plus rejection tallies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub accepted: Vec<SampleRecord>,
    pub rejected_count: usize,
    pub violations: BTreeMap<ViolationKey, usize>,
}

impl ValidationReport {
    pub fn total(&self) -> usize {
        self.accepted.len() + self.rejected_count
    }

    pub fn rejection_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.rejected_count as f64 / total as f64,
        }
    }
}

/// Hard-bound gate in front of the scoring engine.
#[derive(Debug, Clone)]
pub struct Validator {
    rules: Arc<RuleSet>,
}

impl Validator {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    pub fn validate(&self, records: Vec<SampleRecord>) -> ValidationReport {
        let mut report = ValidationReport::default();

        for record in records {
            let violations = self.check(&record);
            if violations.is_empty() {
                report.accepted.push(record);
                continue;
            }

            report.rejected_count += 1;
            for key in violations {
                *report.violations.entry(key).or_insert(0) += 1;
            }
        }

        report
    }

    /// Every violation carried by `record`; empty when the record is acceptable.
    pub fn check(&self, record: &SampleRecord) -> Vec<ViolationKey> {
        self.rules
            .iter()
            .filter_map(|rule| violation(rule, record))
            .collect()
    }
}

fn violation(rule: &Rule, record: &SampleRecord) -> Option<ViolationKey> {
    let key = |kind| ViolationKey {
        parameter: rule.parameter().to_string(),
        kind,
    };

    let Some(value) = record.measurement(rule.parameter()) else {
        return Some(key(ViolationKind::MissingValue));
    };

    if !rule.kind().enforces_hard_bounds() {
        return None;
    }

    let hard = rule.hard_bounds();
    if hard.min.is_some_and(|min| value < min) {
        return Some(key(ViolationKind::BelowHardMinimum));
    }
    if hard.max.is_some_and(|max| value > max) {
        return Some(key(ViolationKind::AboveHardMaximum));
    }
    None
}
