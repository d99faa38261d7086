use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::SampleRecord;
use super::rules::{Rule, RuleKind, RuleSet};

/// Score every record starts from before penalties.
pub const MAX_SCORE: f64 = 100.0;

/// Which tier a single parameter landed in and what it cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierHit {
    pub parameter: String,
    pub value: f64,
    pub deviation: f64,
    pub tier_index: usize,
    /// `None` when the catch-all tier matched.
    pub threshold: Option<f64>,
    pub penalty: f64,
}

/// Per-parameter penalties in rule order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreBreakdown {
    pub hits: Vec<TierHit>,
}

impl ScoreBreakdown {
    pub fn total_penalty(&self) -> f64 {
        self.hits.iter().map(|hit| hit.penalty).sum()
    }

    pub fn get(&self, parameter: &str) -> Option<&TierHit> {
        self.hits.iter().find(|hit| hit.parameter == parameter)
    }
}

/// Result of scoring one record.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCard {
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("sample {sample_id} has no usable '{parameter}' measurement")]
    MissingMeasurement { sample_id: String, parameter: String },
}

/// Table-driven scorer over a shared rule set.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    rules: Arc<RuleSet>,
}

impl ScoringEngine {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn score(&self, record: &SampleRecord) -> Result<ScoreCard, ScoringError> {
        score_record(record, &self.rules)
    }
}

/// Deduct the matching tier penalty for each ruled parameter from [`MAX_SCORE`].
///
/// The result is clamped at zero. Parameters without a rule do not contribute.
pub fn score_record(record: &SampleRecord, rules: &RuleSet) -> Result<ScoreCard, ScoringError> {
    let mut breakdown = ScoreBreakdown::default();

    for rule in rules.iter() {
        let value =
            record
                .measurement(rule.parameter())
                .ok_or_else(|| ScoringError::MissingMeasurement {
                    sample_id: record.sample_id.clone(),
                    parameter: rule.parameter().to_string(),
                })?;
        breakdown.hits.push(evaluate_rule(rule, value));
    }

    let score = (MAX_SCORE - breakdown.total_penalty()).max(0.0);
    Ok(ScoreCard { score, breakdown })
}

/// Distance between `value` and the acceptable region of `rule`; zero when acceptable.
pub fn deviation(rule: &Rule, value: f64) -> f64 {
    let bounds = rule.bounds();
    match rule.kind() {
        RuleKind::Range => match (bounds.min, bounds.max) {
            (Some(min), _) if value < min => min - value,
            (_, Some(max)) if value > max => value - max,
            _ => 0.0,
        },
        RuleKind::MinOnly => bounds.min.map_or(0.0, |min| (min - value).max(0.0)),
        RuleKind::MaxOnly => bounds.max.map_or(0.0, |max| (value - max).max(0.0)),
        RuleKind::TargetDeviation => rule
            .target_value()
            .map_or(0.0, |target| (value - target).abs()),
    }
}

fn evaluate_rule(rule: &Rule, value: f64) -> TierHit {
    let deviation = deviation(rule, value);
    let tiers = rule.tiers();
    let tier_index = tiers
        .iter()
        .position(|tier| deviation <= tier.threshold)
        .unwrap_or(tiers.len().saturating_sub(1));
    let (threshold, penalty) = tiers
        .get(tier_index)
        .map(|tier| (tier.threshold, tier.penalty))
        .unwrap_or((f64::INFINITY, 0.0));

    TierHit {
        parameter: rule.parameter().to_string(),
        value,
        deviation,
        tier_index,
        threshold: threshold.is_finite().then_some(threshold),
        penalty,
    }
}
