use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{RunId, SampleRecord, ScoredRecord};
use super::summary::QualitySummary;

/// Extraction collaborator producing raw records for a run.
pub trait RecordSource: Send + Sync {
    /// Short name used as the dataset label in metrics and outcomes.
    fn name(&self) -> &str;
    fn extract(&self) -> Result<Vec<SampleRecord>, SourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("unable to read source {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error at row {row}: {source}")]
    Csv {
        row: usize,
        #[source]
        source: csv::Error,
    },
    #[error("source missing required column '{0}'")]
    MissingColumn(String),
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Metadata handed to the sink when a run's records are committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadMetadata {
    pub run_id: RunId,
    pub table: String,
    pub committed_at: DateTime<Utc>,
    pub row_count: usize,
    pub summary: QualitySummary,
}

/// Persistence collaborator. Each run acquires its own session.
pub trait RecordSink: Send + Sync {
    type Session<'a>: LoadSession
    where
        Self: 'a;

    fn begin(&self, run_id: &RunId, table: &str) -> Result<Self::Session<'_>, SinkError>;
}

/// Scoped write handle. Dropping an uncommitted session discards its writes.
pub trait LoadSession {
    fn write_chunk(&mut self, chunk: &[ScoredRecord]) -> Result<usize, SinkError>;
    fn commit(self, metadata: LoadMetadata) -> Result<(), SinkError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink io failure at {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("sink encoding failure: {0}")]
    Encoding(String),
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

impl From<csv::Error> for SinkError {
    fn from(value: csv::Error) -> Self {
        Self::Encoding(value.to_string())
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encoding(value.to_string())
    }
}
