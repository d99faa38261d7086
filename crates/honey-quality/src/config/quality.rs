use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::ConfigError;
use crate::monitoring::alerts::AlertThresholds;
use crate::workflows::quality::classifier::{BandTable, ClassificationScheme};
use crate::workflows::quality::domain::{ComplianceStatus, QualityCategory};
use crate::workflows::quality::rules::{Bounds, Rule, RuleKind, RulePreset, RuleSet, Tier};

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_PIPELINE_NAME: &str = "honey_quality_etl";
pub const DEFAULT_TABLE: &str = "honey_quality_data";

/// Raw shape of the quality rules file before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QualityConfigFile {
    #[serde(default)]
    pub preset: Option<String>,
    /// Replaces the preset rules entirely when present.
    #[serde(default)]
    pub rules: Option<BTreeMap<String, RuleFile>>,
    #[serde(default)]
    pub classification: Option<ClassificationFile>,
    #[serde(default)]
    pub alerts: AlertThresholds,
    #[serde(default)]
    pub pipeline: PipelineOptions,
}

/// One rule entry, keyed by parameter name in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleFile {
    pub kind: RuleKind,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub target: Option<f64>,
    #[serde(default)]
    pub hard_min: Option<f64>,
    #[serde(default)]
    pub hard_max: Option<f64>,
    pub tiers: Vec<Tier>,
}

impl RuleFile {
    fn into_rule(self, parameter: String) -> Result<Rule, ConfigError> {
        let rule = Rule::new(
            parameter,
            self.kind,
            Bounds {
                min: self.min,
                max: self.max,
            },
            self.target,
            Bounds {
                min: self.hard_min,
                max: self.hard_max,
            },
            self.tiers,
        )?;
        Ok(rule)
    }
}

/// Classification overrides; tables left out come from `preset`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassificationFile {
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub categories: Option<BandTable<QualityCategory>>,
    #[serde(default)]
    pub compliance: Option<BandTable<ComplianceStatus>>,
}

/// Orchestrator knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineOptions {
    pub name: String,
    pub table: String,
    pub batch_size: usize,
    /// Fail the validation stage when the rejected fraction exceeds this value.
    pub max_rejection_rate: Option<f64>,
    pub retain_breakdown: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_PIPELINE_NAME.to_string(),
            table: DEFAULT_TABLE.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_rejection_rate: None,
            retain_breakdown: false,
        }
    }
}

impl PipelineOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidPipelineOption("name must not be empty"));
        }
        if self.table.trim().is_empty() {
            return Err(ConfigError::InvalidPipelineOption("table must not be empty"));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidPipelineOption(
                "batch_size must be greater than zero",
            ));
        }
        if let Some(rate) = self.max_rejection_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::InvalidPipelineOption(
                    "max_rejection_rate must be between 0 and 1",
                ));
            }
        }
        Ok(())
    }
}

/// Validated quality configuration shared by the CLI and the HTTP service.
#[derive(Debug, Clone)]
pub struct QualityConfig {
    pub preset: RulePreset,
    pub rules: Arc<RuleSet>,
    pub classification: ClassificationScheme,
    pub alerts: AlertThresholds,
    pub pipeline: PipelineOptions,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self::from_preset(RulePreset::default())
    }
}

impl QualityConfig {
    pub fn from_preset(preset: RulePreset) -> Self {
        Self {
            preset,
            rules: Arc::new(RuleSet::preset(preset)),
            classification: default_scheme(preset),
            alerts: AlertThresholds::default(),
            pipeline: PipelineOptions::default(),
        }
    }

    /// Read and validate `path`, falling back to defaults only when the file is absent.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(source) if source.kind() == ErrorKind::NotFound => {
                warn!(
                    path = %path.display(),
                    "quality config not found; using built-in defaults"
                );
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let file: QualityConfigFile =
            serde_json::from_str(&text).map_err(|source| ConfigError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::from_file(file)?;
        info!(
            path = %path.display(),
            preset = config.preset.name(),
            rules = config.rules.len(),
            "quality config loaded"
        );
        Ok(config)
    }

    pub fn from_file(file: QualityConfigFile) -> Result<Self, ConfigError> {
        let preset = match file.preset.as_deref() {
            Some(name) => name
                .parse::<RulePreset>()
                .map_err(ConfigError::UnknownPreset)?,
            None => RulePreset::default(),
        };

        let rules = match file.rules {
            Some(entries) => {
                let rules = entries
                    .into_iter()
                    .map(|(parameter, entry)| entry.into_rule(parameter))
                    .collect::<Result<Vec<_>, _>>()?;
                RuleSet::new(rules)?
            }
            None => RuleSet::preset(preset),
        };

        let classification = match file.classification {
            Some(overrides) => {
                let base = match overrides.preset.as_deref() {
                    Some(name) => ClassificationScheme::preset(name)?,
                    None => default_scheme(preset),
                };
                ClassificationScheme::new(
                    overrides
                        .categories
                        .unwrap_or_else(|| base.categories().clone()),
                    overrides
                        .compliance
                        .unwrap_or_else(|| base.compliance().clone()),
                )?
            }
            None => default_scheme(preset),
        };

        file.alerts.validate()?;
        file.pipeline.validate()?;

        Ok(Self {
            preset,
            rules: Arc::new(rules),
            classification,
            alerts: file.alerts,
            pipeline: file.pipeline,
        })
    }

    /// JSON view of the active configuration, as served by the rules endpoint.
    pub fn overview(&self) -> serde_json::Value {
        serde_json::json!({
            "preset": self.preset,
            "rules": self.rules.as_ref(),
            "classification": self.classification,
            "pipeline": self.pipeline,
            "alerts": self.alerts,
        })
    }
}

fn default_scheme(preset: RulePreset) -> ClassificationScheme {
    match preset {
        RulePreset::Etl => ClassificationScheme::etl(),
        RulePreset::Unified => ClassificationScheme::unified(),
    }
}
