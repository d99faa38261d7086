use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::workflows::quality::batch::{BatchOutcome, BatchStatus};

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Aggregates over the retained runs, the input to alert evaluation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_runs: usize,
    pub failed_runs: usize,
    pub scored_records: usize,
    pub non_compliant_records: usize,
    pub latest_duration_seconds: Option<f64>,
    pub mean_previous_duration_seconds: Option<f64>,
}

impl AggregateStats {
    pub fn non_compliant_rate(&self) -> Option<f64> {
        (self.scored_records > 0)
            .then(|| self.non_compliant_records as f64 / self.scored_records as f64)
    }

    pub fn failure_rate(&self) -> Option<f64> {
        (self.total_runs > 0).then(|| self.failed_runs as f64 / self.total_runs as f64)
    }

    /// Fractional slowdown of the latest run against the mean of earlier runs.
    pub fn duration_regression(&self) -> Option<f64> {
        match (
            self.latest_duration_seconds,
            self.mean_previous_duration_seconds,
        ) {
            (Some(latest), Some(mean)) if mean > 0.0 => Some((latest - mean) / mean),
            _ => None,
        }
    }
}

/// Bounded, oldest-first record of finished runs.
#[derive(Debug, Clone)]
pub struct RunHistory {
    capacity: usize,
    runs: VecDeque<BatchOutcome>,
}

impl Default for RunHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl RunHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            runs: VecDeque::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, outcome: BatchOutcome) {
        if self.runs.len() == self.capacity {
            self.runs.pop_front();
        }
        self.runs.push_back(outcome);
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<BatchOutcome> {
        self.runs.iter().rev().take(limit).cloned().collect()
    }

    pub fn stats(&self) -> AggregateStats {
        let mut stats = AggregateStats {
            total_runs: self.runs.len(),
            ..AggregateStats::default()
        };

        for outcome in &self.runs {
            if outcome.status == BatchStatus::Failure {
                stats.failed_runs += 1;
            }
            stats.scored_records += outcome.scored_records();
            stats.non_compliant_records += outcome.non_compliant_records;
        }

        // Duration baseline covers successful runs only.
        let mut durations = self
            .runs
            .iter()
            .filter(|run| run.status == BatchStatus::Success)
            .map(|run| run.duration_seconds)
            .rev();
        if let Some(latest) = durations.next() {
            stats.latest_duration_seconds = Some(latest);
            let (count, total) = durations.fold((0usize, 0.0), |(count, total), duration| {
                (count + 1, total + duration)
            });
            if count > 0 {
                stats.mean_previous_duration_seconds = Some(total / count as f64);
            }
        }

        stats
    }
}
