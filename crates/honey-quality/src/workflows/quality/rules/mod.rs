mod presets;

pub use presets::RulePreset;

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// How a rule turns a reading into a deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Range,
    MinOnly,
    MaxOnly,
    TargetDeviation,
}

impl RuleKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Range => "range",
            Self::MinOnly => "min_only",
            Self::MaxOnly => "max_only",
            Self::TargetDeviation => "target_deviation",
        }
    }

    /// Whether the validator enforces hard bounds for this kind.
    pub const fn enforces_hard_bounds(self) -> bool {
        !matches!(self, Self::TargetDeviation)
    }
}

/// Optional lower/upper limits.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Bounds {
    pub const fn unbounded() -> Self {
        Self {
            min: None,
            max: None,
        }
    }

    pub const fn range(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub const fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub const fn at_most(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// One step of the scoring function: deviations up to `threshold` cost `penalty` points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    #[serde(default = "unbounded_threshold", deserialize_with = "threshold_or_unbounded")]
    pub threshold: f64,
    pub penalty: f64,
}

impl Tier {
    pub const fn new(threshold: f64, penalty: f64) -> Self {
        Self { threshold, penalty }
    }

    /// Tier matching every deviation.
    pub const fn catch_all(penalty: f64) -> Self {
        Self::new(f64::INFINITY, penalty)
    }
}

fn unbounded_threshold() -> f64 {
    f64::INFINITY
}

// JSON has no infinity literal; `null` (which is also what serde_json writes for it) means unbounded.
fn threshold_or_unbounded<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.unwrap_or(f64::INFINITY))
}

/// Acceptance policy for a single measured parameter.
///
/// Fields are private so a constructed rule is always valid: tiers are non-empty with
/// strictly increasing thresholds, and the bounds required by the kind are present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    parameter: String,
    kind: RuleKind,
    bounds: Bounds,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<f64>,
    #[serde(skip_serializing_if = "Bounds::is_unbounded")]
    hard_bounds: Bounds,
    tiers: Vec<Tier>,
}

impl Rule {
    pub fn new(
        parameter: impl Into<String>,
        kind: RuleKind,
        bounds: Bounds,
        target: Option<f64>,
        hard_bounds: Bounds,
        tiers: Vec<Tier>,
    ) -> Result<Self, RuleError> {
        let parameter = parameter.into().trim().to_string();
        if parameter.is_empty() {
            return Err(RuleError::EmptyParameter);
        }

        let bounds = normalize_bounds(&parameter, kind, bounds)?;
        let target = match kind {
            RuleKind::TargetDeviation => match target {
                Some(value) if value.is_finite() => Some(value),
                Some(_) => {
                    return Err(RuleError::NonFinite {
                        parameter,
                        field: "target",
                    })
                }
                None => return Err(RuleError::MissingTarget { parameter }),
            },
            _ => None,
        };

        validate_hard_bounds(&parameter, kind, &bounds, &hard_bounds)?;
        validate_tiers(&parameter, &tiers)?;

        Ok(Self {
            parameter,
            kind,
            bounds,
            target,
            hard_bounds,
            tiers,
        })
    }

    pub fn range(
        parameter: impl Into<String>,
        min: f64,
        max: f64,
        tiers: Vec<Tier>,
    ) -> Result<Self, RuleError> {
        Self::new(
            parameter,
            RuleKind::Range,
            Bounds::range(min, max),
            None,
            Bounds::unbounded(),
            tiers,
        )
    }

    pub fn min_only(
        parameter: impl Into<String>,
        min: f64,
        tiers: Vec<Tier>,
    ) -> Result<Self, RuleError> {
        Self::new(
            parameter,
            RuleKind::MinOnly,
            Bounds::at_least(min),
            None,
            Bounds::unbounded(),
            tiers,
        )
    }

    pub fn max_only(
        parameter: impl Into<String>,
        max: f64,
        tiers: Vec<Tier>,
    ) -> Result<Self, RuleError> {
        Self::new(
            parameter,
            RuleKind::MaxOnly,
            Bounds::at_most(max),
            None,
            Bounds::unbounded(),
            tiers,
        )
    }

    pub fn target(
        parameter: impl Into<String>,
        target: f64,
        tiers: Vec<Tier>,
    ) -> Result<Self, RuleError> {
        Self::new(
            parameter,
            RuleKind::TargetDeviation,
            Bounds::unbounded(),
            Some(target),
            Bounds::unbounded(),
            tiers,
        )
    }

    /// Attach hard (rejection) bounds, re-running the bound checks.
    pub fn with_hard_bounds(mut self, hard_bounds: Bounds) -> Result<Self, RuleError> {
        validate_hard_bounds(&self.parameter, self.kind, &self.bounds, &hard_bounds)?;
        self.hard_bounds = hard_bounds;
        Ok(self)
    }

    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn target_value(&self) -> Option<f64> {
        self.target
    }

    pub fn hard_bounds(&self) -> Bounds {
        self.hard_bounds
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }
}

fn normalize_bounds(parameter: &str, kind: RuleKind, bounds: Bounds) -> Result<Bounds, RuleError> {
    let require = |value: Option<f64>, bound: &'static str| -> Result<f64, RuleError> {
        match value {
            Some(value) if value.is_finite() => Ok(value),
            Some(_) => Err(RuleError::NonFinite {
                parameter: parameter.to_string(),
                field: bound,
            }),
            None => Err(RuleError::MissingBound {
                parameter: parameter.to_string(),
                bound,
            }),
        }
    };

    match kind {
        RuleKind::Range => {
            let min = require(bounds.min, "min")?;
            let max = require(bounds.max, "max")?;
            if min > max {
                return Err(RuleError::InvertedBounds {
                    parameter: parameter.to_string(),
                    min,
                    max,
                });
            }
            Ok(Bounds::range(min, max))
        }
        RuleKind::MinOnly => Ok(Bounds::at_least(require(bounds.min, "min")?)),
        RuleKind::MaxOnly => Ok(Bounds::at_most(require(bounds.max, "max")?)),
        RuleKind::TargetDeviation => Ok(Bounds::unbounded()),
    }
}

fn validate_hard_bounds(
    parameter: &str,
    kind: RuleKind,
    bounds: &Bounds,
    hard_bounds: &Bounds,
) -> Result<(), RuleError> {
    if hard_bounds.is_unbounded() {
        return Ok(());
    }

    if !kind.enforces_hard_bounds() {
        return Err(RuleError::HardBoundsUnsupported {
            parameter: parameter.to_string(),
        });
    }

    for (value, field) in [(hard_bounds.min, "hard_min"), (hard_bounds.max, "hard_max")] {
        if value.is_some_and(|value| !value.is_finite()) {
            return Err(RuleError::NonFinite {
                parameter: parameter.to_string(),
                field,
            });
        }
    }

    if let (Some(hard_min), Some(min)) = (hard_bounds.min, bounds.min) {
        if hard_min > min {
            return Err(RuleError::HardBoundInsideAcceptable {
                parameter: parameter.to_string(),
                bound: "min",
            });
        }
    }

    if let (Some(hard_max), Some(max)) = (hard_bounds.max, bounds.max) {
        if hard_max < max {
            return Err(RuleError::HardBoundInsideAcceptable {
                parameter: parameter.to_string(),
                bound: "max",
            });
        }
    }

    if let (Some(hard_min), Some(hard_max)) = (hard_bounds.min, hard_bounds.max) {
        if hard_min > hard_max {
            return Err(RuleError::InvertedBounds {
                parameter: parameter.to_string(),
                min: hard_min,
                max: hard_max,
            });
        }
    }

    Ok(())
}

fn validate_tiers(parameter: &str, tiers: &[Tier]) -> Result<(), RuleError> {
    if tiers.is_empty() {
        return Err(RuleError::EmptyTiers {
            parameter: parameter.to_string(),
        });
    }

    for (index, tier) in tiers.iter().enumerate() {
        if tier.threshold.is_nan() || tier.threshold < 0.0 {
            return Err(RuleError::InvalidThreshold {
                parameter: parameter.to_string(),
                index,
            });
        }
        if !tier.penalty.is_finite() || tier.penalty < 0.0 {
            return Err(RuleError::InvalidPenalty {
                parameter: parameter.to_string(),
                index,
            });
        }
    }

    for (index, pair) in tiers.windows(2).enumerate() {
        if pair[1].threshold <= pair[0].threshold {
            return Err(RuleError::NonIncreasingTiers {
                parameter: parameter.to_string(),
                index: index + 1,
                previous: pair[0].threshold,
                current: pair[1].threshold,
            });
        }
    }

    Ok(())
}

/// Configuration problems detected while building a rule or rule set.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    #[error("rule parameter name must not be empty")]
    EmptyParameter,
    #[error("rule '{parameter}' has no tiers")]
    EmptyTiers { parameter: String },
    #[error(
        "rule '{parameter}' tier {index} threshold {current} does not increase past {previous}"
    )]
    NonIncreasingTiers {
        parameter: String,
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("rule '{parameter}' tier {index} threshold must be a non-negative number")]
    InvalidThreshold { parameter: String, index: usize },
    #[error("rule '{parameter}' tier {index} penalty must be finite and non-negative")]
    InvalidPenalty { parameter: String, index: usize },
    #[error("rule '{parameter}' is missing its {bound} bound")]
    MissingBound {
        parameter: String,
        bound: &'static str,
    },
    #[error("rule '{parameter}' has min {min} above max {max}")]
    InvertedBounds {
        parameter: String,
        min: f64,
        max: f64,
    },
    #[error("rule '{parameter}' is a target rule without a target value")]
    MissingTarget { parameter: String },
    #[error("rule '{parameter}' field {field} must be finite")]
    NonFinite {
        parameter: String,
        field: &'static str,
    },
    #[error("rule '{parameter}' hard {bound} bound lies inside the acceptable range")]
    HardBoundInsideAcceptable {
        parameter: String,
        bound: &'static str,
    },
    #[error("rule '{parameter}' is a target rule and cannot carry hard bounds")]
    HardBoundsUnsupported { parameter: String },
    #[error("parameter '{0}' has more than one rule")]
    DuplicateParameter(String),
}

/// Immutable parameter -> rule table shared by the validator and the scoring engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: BTreeMap<String, Rule>,
}

impl RuleSet {
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Result<Self, RuleError> {
        let mut table = BTreeMap::new();
        for rule in rules {
            let parameter = rule.parameter.clone();
            if table.insert(parameter.clone(), rule).is_some() {
                return Err(RuleError::DuplicateParameter(parameter));
            }
        }
        Ok(Self { rules: table })
    }

    pub fn preset(preset: RulePreset) -> Self {
        preset.rules()
    }

    pub fn get(&self, parameter: &str) -> Option<&Rule> {
        self.rules.get(parameter)
    }

    /// Rules in parameter name order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
