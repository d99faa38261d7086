//! Prometheus-style series recorded through the `metrics` facade.
//!
//! Nothing here installs a recorder; without one every call is a no-op.

use metrics::{counter, gauge, histogram};

use super::system::ResourceSnapshot;
use crate::workflows::quality::batch::BatchOutcome;
use crate::workflows::quality::validator::ViolationKey;

pub const PIPELINE_RUNS_TOTAL: &str = "pipeline_runs_total";
pub const PIPELINE_DURATION_SECONDS: &str = "pipeline_duration_seconds";
pub const PIPELINE_RECORDS_TOTAL: &str = "pipeline_records_total";
pub const DATA_QUALITY_SCORE: &str = "data_quality_score";
pub const QUALITY_VIOLATIONS_TOTAL: &str = "quality_violations_total";
pub const SYSTEM_CPU_USAGE: &str = "system_cpu_usage";
pub const SYSTEM_MEMORY_USAGE: &str = "system_memory_usage";
pub const SYSTEM_DISK_USAGE: &str = "system_disk_usage";

pub fn record_outcome(outcome: &BatchOutcome, dataset: &str) {
    counter!(
        PIPELINE_RUNS_TOTAL,
        "status" => outcome.status.label(),
        "pipeline" => outcome.pipeline.clone()
    )
    .increment(1);
    histogram!(PIPELINE_DURATION_SECONDS, "pipeline" => outcome.pipeline.clone())
        .record(outcome.duration_seconds);

    for (label, count) in [
        ("accepted", outcome.records_accepted),
        ("rejected", outcome.records_rejected),
        ("loaded", outcome.records_loaded),
    ] {
        counter!(PIPELINE_RECORDS_TOTAL, "outcome" => label).increment(count as u64);
    }

    if let Some(score) = outcome.average_score {
        gauge!(DATA_QUALITY_SCORE, "dataset" => dataset.to_string()).set(score);
    }
}

pub fn record_violations<'a>(
    violations: impl IntoIterator<Item = (&'a ViolationKey, &'a usize)>,
    dataset: &str,
) {
    for (key, count) in violations {
        counter!(
            QUALITY_VIOLATIONS_TOTAL,
            "violation_type" => key.metric_label(),
            "dataset" => dataset.to_string()
        )
        .increment(*count as u64);
    }
}

pub fn record_resources(snapshot: &ResourceSnapshot) {
    if let Some(cpu) = snapshot.cpu_percent {
        gauge!(SYSTEM_CPU_USAGE).set(cpu);
    }
    if let Some(memory) = snapshot.memory_percent {
        gauge!(SYSTEM_MEMORY_USAGE).set(memory);
    }
    if let Some(disk) = snapshot.disk_percent {
        gauge!(SYSTEM_DISK_USAGE).set(disk);
    }
}
