use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::scoring::ScoreBreakdown;

/// Identifier wrapper for a single orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(pub String);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One lab sample as delivered by the extraction collaborator.
///
/// Measurements are keyed by parameter name so that new parameters only need a rule,
/// never a new field. Columns the engine does not understand travel in `attributes`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SampleRecord {
    pub batch_id: String,
    pub sample_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lab_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyst: Option<String>,
    #[serde(default)]
    pub measurements: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl SampleRecord {
    pub fn new(batch_id: impl Into<String>, sample_id: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            sample_id: sample_id.into(),
            ..Self::default()
        }
    }

    pub fn with_measurement(mut self, parameter: impl Into<String>, value: f64) -> Self {
        self.measurements.insert(parameter.into(), value);
        self
    }

    pub fn with_lab(mut self, lab_id: impl Into<String>) -> Self {
        self.lab_id = Some(lab_id.into());
        self
    }

    /// Finite reading for `parameter`; NaN and infinities count as missing.
    pub fn measurement(&self, parameter: &str) -> Option<f64> {
        self.measurements
            .get(parameter)
            .copied()
            .filter(|value| value.is_finite())
    }
}

/// Discrete quality label derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityCategory {
    Premium,
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityCategory {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Premium,
            Self::Excellent,
            Self::Good,
            Self::Fair,
            Self::Poor,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Premium => "Premium",
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
        }
    }
}

/// Pass/warn/fail label derived from a score, independent of the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComplianceStatus {
    Compliant,
    Warning,
    #[serde(rename = "Non-Compliant")]
    NonCompliant,
}

impl ComplianceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Compliant => "Compliant",
            Self::Warning => "Warning",
            Self::NonCompliant => "Non-Compliant",
        }
    }
}

/// A sample after scoring and classification, ready for the load collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub record: SampleRecord,
    pub score: f64,
    pub category: QualityCategory,
    pub compliance: ComplianceStatus,
    pub processed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
}
