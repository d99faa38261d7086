use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Bounds, Rule, RuleKind, RuleSet, Tier};

/// Named built-in rule tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulePreset {
    /// Business-rule thresholds used by the load pipeline.
    #[default]
    Etl,
    /// Target-centred thresholds used for reporting.
    Unified,
}

impl RulePreset {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Etl => "etl",
            Self::Unified => "unified",
        }
    }

    pub fn rules(self) -> RuleSet {
        let rules = match self {
            Self::Etl => vec![
                range("moisture", 15.0, 20.0, 10.0, 30.0, &[(0.0, 0.0), (1.0, 5.0)], 15.0),
                range("ph", 3.5, 6.5, 2.0, 8.0, &[(0.0, 0.0), (0.5, 5.0)], 15.0),
                diastase(),
                hmf(),
            ],
            Self::Unified => vec![
                target(
                    "moisture",
                    17.5,
                    &[(1.0, 0.0), (2.0, 5.0), (3.0, 10.0)],
                    20.0,
                ),
                target("ph", 5.0, &[(0.5, 0.0), (1.0, 5.0), (1.5, 10.0)], 20.0),
                diastase(),
                hmf(),
            ],
        };

        let table: BTreeMap<String, Rule> = rules
            .into_iter()
            .map(|rule| (rule.parameter.clone(), rule))
            .collect();
        RuleSet { rules: table }
    }
}

impl fmt::Display for RulePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RulePreset {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "etl" => Ok(Self::Etl),
            "unified" => Ok(Self::Unified),
            other => Err(other.to_string()),
        }
    }
}

fn tiers(steps: &[(f64, f64)], catch_all: f64) -> Vec<Tier> {
    steps
        .iter()
        .map(|&(threshold, penalty)| Tier::new(threshold, penalty))
        .chain(std::iter::once(Tier::catch_all(catch_all)))
        .collect()
}

fn range(
    parameter: &str,
    min: f64,
    max: f64,
    hard_min: f64,
    hard_max: f64,
    steps: &[(f64, f64)],
    catch_all: f64,
) -> Rule {
    Rule {
        parameter: parameter.to_string(),
        kind: RuleKind::Range,
        bounds: Bounds::range(min, max),
        target: None,
        hard_bounds: Bounds::range(hard_min, hard_max),
        tiers: tiers(steps, catch_all),
    }
}

fn target(parameter: &str, target: f64, steps: &[(f64, f64)], catch_all: f64) -> Rule {
    Rule {
        parameter: parameter.to_string(),
        kind: RuleKind::TargetDeviation,
        bounds: Bounds::unbounded(),
        target: Some(target),
        hard_bounds: Bounds::unbounded(),
        tiers: tiers(steps, catch_all),
    }
}

fn diastase() -> Rule {
    Rule {
        parameter: "diastase_activity".to_string(),
        kind: RuleKind::MinOnly,
        bounds: Bounds::at_least(8.0),
        target: None,
        hard_bounds: Bounds::at_least(3.0),
        tiers: tiers(&[(0.0, 0.0), (2.0, 5.0)], 15.0),
    }
}

fn hmf() -> Rule {
    Rule {
        parameter: "h_m_f".to_string(),
        kind: RuleKind::MaxOnly,
        bounds: Bounds::at_most(40.0),
        target: None,
        hard_bounds: Bounds::at_most(80.0),
        tiers: tiers(&[(0.0, 0.0), (10.0, 5.0)], 15.0),
    }
}
