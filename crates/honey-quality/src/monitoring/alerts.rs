use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::history::AggregateStats;
use super::system::ResourceSnapshot;
use crate::config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    QualityThresholdBreach,
    PipelineFailure,
    PerformanceDegradation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

/// A threshold breach observed at evaluation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub observed_value: f64,
    pub threshold: f64,
    pub timestamp: DateTime<Utc>,
}

/// Limits checked by [`AlertEvaluator`]. Rates are fractions, resource limits percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlertThresholds {
    pub quality_threshold_breach: f64,
    pub pipeline_failure: f64,
    pub performance_degradation: f64,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            quality_threshold_breach: 0.10,
            pipeline_failure: 0.05,
            performance_degradation: 0.20,
            cpu_percent: 80.0,
            memory_percent: 85.0,
            disk_percent: 90.0,
        }
    }
}

impl AlertThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fractions = [
            (self.quality_threshold_breach, "quality_threshold_breach"),
            (self.pipeline_failure, "pipeline_failure"),
        ];
        for (value, name) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidAlertThreshold(name));
            }
        }

        if !self.performance_degradation.is_finite() || self.performance_degradation < 0.0 {
            return Err(ConfigError::InvalidAlertThreshold("performance_degradation"));
        }

        let percents = [
            (self.cpu_percent, "cpu_percent"),
            (self.memory_percent, "memory_percent"),
            (self.disk_percent, "disk_percent"),
        ];
        for (value, name) in percents {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::InvalidAlertThreshold(name));
            }
        }

        Ok(())
    }
}

/// Stateless threshold checks; callers own the history the stats come from.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertEvaluator;

impl AlertEvaluator {
    pub fn evaluate(
        &self,
        stats: &AggregateStats,
        resources: &ResourceSnapshot,
        thresholds: &AlertThresholds,
        at: DateTime<Utc>,
    ) -> Vec<AlertEvent> {
        let mut events = Vec::new();
        let mut raise = |kind, severity, observed_value: f64, threshold: f64, message: String| {
            events.push(AlertEvent {
                kind,
                severity,
                message,
                observed_value,
                threshold,
                timestamp: at,
            });
        };

        if let Some(rate) = stats.non_compliant_rate() {
            if rate > thresholds.quality_threshold_breach {
                raise(
                    AlertKind::QualityThresholdBreach,
                    AlertSeverity::Critical,
                    rate,
                    thresholds.quality_threshold_breach,
                    format!(
                        "Non-compliant rate {:.1}% exceeds {:.1}%",
                        rate * 100.0,
                        thresholds.quality_threshold_breach * 100.0
                    ),
                );
            }
        }

        if let Some(rate) = stats.failure_rate() {
            if rate > thresholds.pipeline_failure {
                raise(
                    AlertKind::PipelineFailure,
                    AlertSeverity::Critical,
                    rate,
                    thresholds.pipeline_failure,
                    format!(
                        "Pipeline failure rate {:.1}% ({} of {} runs) exceeds {:.1}%",
                        rate * 100.0,
                        stats.failed_runs,
                        stats.total_runs,
                        thresholds.pipeline_failure * 100.0
                    ),
                );
            }
        }

        let resource_checks = [
            ("CPU", resources.cpu_percent, thresholds.cpu_percent),
            ("memory", resources.memory_percent, thresholds.memory_percent),
            ("disk", resources.disk_percent, thresholds.disk_percent),
        ];
        for (label, observed, limit) in resource_checks {
            if let Some(observed) = observed {
                if observed > limit {
                    raise(
                        AlertKind::PerformanceDegradation,
                        AlertSeverity::Warning,
                        observed,
                        limit,
                        format!("High {label} usage: {observed:.1}%"),
                    );
                }
            }
        }

        if let Some(regression) = stats.duration_regression() {
            if regression > thresholds.performance_degradation {
                raise(
                    AlertKind::PerformanceDegradation,
                    AlertSeverity::Warning,
                    regression,
                    thresholds.performance_degradation,
                    format!(
                        "Latest run took {:.1}% longer than the previous average",
                        regression * 100.0
                    ),
                );
            }
        }

        events
    }
}
