use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{ComplianceStatus, QualityCategory, ScoredRecord};

/// Per-lab score average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabSummary {
    pub samples: usize,
    pub average_score: f64,
}

/// Aggregate statistics over a set of scored records.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QualitySummary {
    pub total_samples: usize,
    pub average_score: Option<f64>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub categories: BTreeMap<QualityCategory, usize>,
    pub compliance: BTreeMap<ComplianceStatus, usize>,
    /// Fraction of samples classified Premium.
    pub premium_rate: f64,
    /// Fraction of samples classified Compliant.
    pub compliance_rate: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labs: BTreeMap<String, LabSummary>,
}

impl QualitySummary {
    pub fn from_records(records: &[ScoredRecord]) -> Self {
        let mut summary = Self {
            total_samples: records.len(),
            ..Self::default()
        };
        if records.is_empty() {
            return summary;
        }

        let mut total = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut labs: BTreeMap<String, (usize, f64)> = BTreeMap::new();

        for scored in records {
            total += scored.score;
            min = min.min(scored.score);
            max = max.max(scored.score);
            *summary.categories.entry(scored.category).or_insert(0) += 1;
            *summary.compliance.entry(scored.compliance).or_insert(0) += 1;

            if let Some(lab) = &scored.record.lab_id {
                let entry = labs.entry(lab.clone()).or_insert((0, 0.0));
                entry.0 += 1;
                entry.1 += scored.score;
            }
        }

        let count = records.len() as f64;
        summary.average_score = Some(total / count);
        summary.min_score = Some(min);
        summary.max_score = Some(max);
        summary.premium_rate = summary.category_count(QualityCategory::Premium) as f64 / count;
        summary.compliance_rate =
            summary.compliance_count(ComplianceStatus::Compliant) as f64 / count;
        summary.labs = labs
            .into_iter()
            .map(|(lab, (samples, sum))| {
                (
                    lab,
                    LabSummary {
                        samples,
                        average_score: sum / samples as f64,
                    },
                )
            })
            .collect();

        summary
    }

    pub fn category_count(&self, category: QualityCategory) -> usize {
        self.categories.get(&category).copied().unwrap_or(0)
    }

    pub fn compliance_count(&self, status: ComplianceStatus) -> usize {
        self.compliance.get(&status).copied().unwrap_or(0)
    }
}
