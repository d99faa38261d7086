use serde::{Deserialize, Serialize};

use super::domain::{ComplianceStatus, QualityCategory};

/// One inclusive floor of a descending band table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band<L> {
    pub floor: f64,
    pub label: L,
}

impl<L> Band<L> {
    pub const fn new(floor: f64, label: L) -> Self {
        Self { floor, label }
    }
}

/// Descending floors with a fallback, so every score maps to exactly one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandTable<L> {
    pub bands: Vec<Band<L>>,
    pub fallback: L,
}

impl<L: Copy> BandTable<L> {
    pub fn label_for(&self, score: f64) -> L {
        self.bands
            .iter()
            .find(|band| score >= band.floor)
            .map(|band| band.label)
            .unwrap_or(self.fallback)
    }

    fn validate(&self, table: &'static str) -> Result<(), ClassificationError> {
        for band in &self.bands {
            if !(0.0..=100.0).contains(&band.floor) {
                return Err(ClassificationError::FloorOutOfRange {
                    table,
                    floor: band.floor,
                });
            }
        }

        for pair in self.bands.windows(2) {
            if pair[1].floor >= pair[0].floor {
                return Err(ClassificationError::NonDescendingFloors {
                    table,
                    previous: pair[0].floor,
                    current: pair[1].floor,
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassificationError {
    #[error("{table} floor {floor} is outside 0..=100")]
    FloorOutOfRange { table: &'static str, floor: f64 },
    #[error("{table} floor {current} does not descend below {previous}")]
    NonDescendingFloors {
        table: &'static str,
        previous: f64,
        current: f64,
    },
    #[error("unknown classification preset '{0}'")]
    UnknownPreset(String),
}

/// Category and compliance band tables applied to a final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationScheme {
    categories: BandTable<QualityCategory>,
    compliance: BandTable<ComplianceStatus>,
}

impl Default for ClassificationScheme {
    fn default() -> Self {
        Self::etl()
    }
}

impl ClassificationScheme {
    pub fn new(
        categories: BandTable<QualityCategory>,
        compliance: BandTable<ComplianceStatus>,
    ) -> Result<Self, ClassificationError> {
        categories.validate("category")?;
        compliance.validate("compliance")?;
        Ok(Self {
            categories,
            compliance,
        })
    }

    /// `>=90 Excellent, >=80 Good, >=70 Fair`, otherwise Poor.
    pub fn etl() -> Self {
        Self {
            categories: BandTable {
                bands: vec![
                    Band::new(90.0, QualityCategory::Excellent),
                    Band::new(80.0, QualityCategory::Good),
                    Band::new(70.0, QualityCategory::Fair),
                ],
                fallback: QualityCategory::Poor,
            },
            compliance: default_compliance(),
        }
    }

    /// Adds a Premium band at 95 on top of [`ClassificationScheme::etl`].
    pub fn unified() -> Self {
        Self {
            categories: BandTable {
                bands: vec![
                    Band::new(95.0, QualityCategory::Premium),
                    Band::new(90.0, QualityCategory::Excellent),
                    Band::new(80.0, QualityCategory::Good),
                    Band::new(70.0, QualityCategory::Fair),
                ],
                fallback: QualityCategory::Poor,
            },
            compliance: default_compliance(),
        }
    }

    pub fn preset(name: &str) -> Result<Self, ClassificationError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "etl" => Ok(Self::etl()),
            "unified" => Ok(Self::unified()),
            other => Err(ClassificationError::UnknownPreset(other.to_string())),
        }
    }

    pub fn categories(&self) -> &BandTable<QualityCategory> {
        &self.categories
    }

    pub fn compliance(&self) -> &BandTable<ComplianceStatus> {
        &self.compliance
    }

    pub fn category(&self, score: f64) -> QualityCategory {
        self.categories.label_for(score)
    }

    pub fn compliance_status(&self, score: f64) -> ComplianceStatus {
        self.compliance.label_for(score)
    }

    pub fn classify(&self, score: f64) -> (QualityCategory, ComplianceStatus) {
        (self.category(score), self.compliance_status(score))
    }
}

fn default_compliance() -> BandTable<ComplianceStatus> {
    BandTable {
        bands: vec![
            Band::new(80.0, ComplianceStatus::Compliant),
            Band::new(70.0, ComplianceStatus::Warning),
        ],
        fallback: ComplianceStatus::NonCompliant,
    }
}
