//! Rule-based quality assessment for honey lab measurements.
//!
//! The [`workflows::quality`] module holds the scoring engine and batch orchestrator,
//! [`workflows::ingest`] and [`workflows::export`] provide the CSV collaborators, and
//! [`monitoring`] turns run outcomes and resource readings into alerts and metrics.

pub mod config;
pub mod error;
pub mod monitoring;
pub mod telemetry;
pub mod workflows;
