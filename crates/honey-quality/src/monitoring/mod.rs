//! Run history, alert evaluation, and metric/resource reporting.

pub mod alerts;
pub mod history;
pub mod metrics;
pub mod system;

pub use alerts::{AlertEvaluator, AlertEvent, AlertKind, AlertSeverity, AlertThresholds};
pub use history::{AggregateStats, RunHistory, DEFAULT_HISTORY_CAPACITY};
pub use system::{FixedSampler, ResourceSampler, ResourceSnapshot, SysinfoSampler};
