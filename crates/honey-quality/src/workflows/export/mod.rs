//! CSV load sink with a JSON metadata sidecar per committed run.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::workflows::quality::domain::{RunId, ScoredRecord};
use crate::workflows::quality::repository::{LoadMetadata, LoadSession, RecordSink, SinkError};
use crate::workflows::quality::summary::QualitySummary;

const LEADING_COLUMNS: [&str; 5] = ["batch_id", "sample_id", "collection_date", "lab_id", "analyst"];
const TRAILING_COLUMNS: [&str; 4] = [
    "quality_score",
    "quality_category",
    "compliance_status",
    "processed_at",
];

/// Contents of `<table>_<run>.meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkMetadata {
    pub run_id: RunId,
    pub table: String,
    pub last_updated: DateTime<Utc>,
    pub row_count: usize,
    pub columns: Vec<String>,
    pub summary: QualitySummary,
}

/// Writes each run to `<output_dir>/<table>_<run_id>.csv`.
#[derive(Debug, Clone)]
pub struct CsvRecordSink {
    output_dir: PathBuf,
}

impl CsvRecordSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn data_path(&self, run_id: &RunId, table: &str) -> PathBuf {
        self.output_dir.join(format!("{table}_{run_id}.csv"))
    }

    pub fn metadata_path(&self, run_id: &RunId, table: &str) -> PathBuf {
        self.output_dir.join(format!("{table}_{run_id}.meta.json"))
    }
}

impl RecordSink for CsvRecordSink {
    type Session<'a> = CsvLoadSession;

    fn begin(&self, run_id: &RunId, table: &str) -> Result<CsvLoadSession, SinkError> {
        fs::create_dir_all(&self.output_dir).map_err(|source| SinkError::Io {
            location: self.output_dir.display().to_string(),
            source,
        })?;

        let data_path = self.data_path(run_id, table);
        let partial_path = data_path.with_extension("csv.partial");
        let file = File::create(&partial_path).map_err(|source| SinkError::Io {
            location: partial_path.display().to_string(),
            source,
        })?;

        let metadata_path = self.metadata_path(run_id, table);
        let metadata_partial_path = metadata_path.with_extension("json.partial");
        Ok(CsvLoadSession {
            file: Some(file),
            data_path,
            partial_path,
            metadata_path,
            metadata_partial_path,
            data_columns: BTreeSet::new(),
            pending: Vec::new(),
            committed: false,
        })
    }
}

/// Open write to `.partial` files, renamed into place on commit and removed on drop otherwise.
///
/// Rows are held until commit so the header covers every measurement and
/// attribute column seen across all chunks.
pub struct CsvLoadSession {
    file: Option<File>,
    data_path: PathBuf,
    partial_path: PathBuf,
    metadata_path: PathBuf,
    metadata_partial_path: PathBuf,
    data_columns: BTreeSet<String>,
    pending: Vec<ScoredRecord>,
    committed: bool,
}

impl CsvLoadSession {
    fn columns(&self) -> Vec<String> {
        LEADING_COLUMNS
            .iter()
            .map(|column| column.to_string())
            .chain(self.data_columns.iter().cloned())
            .chain(TRAILING_COLUMNS.iter().map(|column| column.to_string()))
            .collect()
    }

    fn write_data(&mut self) -> Result<(), SinkError> {
        let file = self
            .file
            .take()
            .ok_or_else(|| SinkError::Unavailable("session already closed".to_string()))?;
        let data_columns: Vec<String> = self.data_columns.iter().cloned().collect();

        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(self.columns())?;
        for scored in &self.pending {
            writer.write_record(row_for(scored, &data_columns))?;
        }
        writer.flush().map_err(|source| SinkError::Io {
            location: self.partial_path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    fn publish(&self) -> Result<(), SinkError> {
        fs::rename(&self.partial_path, &self.data_path).map_err(|source| SinkError::Io {
            location: self.data_path.display().to_string(),
            source,
        })?;
        if let Err(source) = fs::rename(&self.metadata_partial_path, &self.metadata_path) {
            remove_if_present(&self.data_path);
            return Err(SinkError::Io {
                location: self.metadata_path.display().to_string(),
                source,
            });
        }
        Ok(())
    }
}

fn remove_if_present(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), %err, "failed to discard partial export"),
    }
}

fn row_for(scored: &ScoredRecord, data_columns: &[String]) -> Vec<String> {
    let record = &scored.record;
    let mut row = vec![
        record.batch_id.clone(),
        record.sample_id.clone(),
        record
            .collected_at
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        record.lab_id.clone().unwrap_or_default(),
        record.analyst.clone().unwrap_or_default(),
    ];

    for column in data_columns {
        let cell = match record.measurements.get(column) {
            Some(value) => value.to_string(),
            None => record.attributes.get(column).cloned().unwrap_or_default(),
        };
        row.push(cell);
    }

    row.push(format!("{:.2}", scored.score));
    row.push(scored.category.label().to_string());
    row.push(scored.compliance.label().to_string());
    row.push(scored.processed_at.to_rfc3339());
    row
}

impl LoadSession for CsvLoadSession {
    fn write_chunk(&mut self, chunk: &[ScoredRecord]) -> Result<usize, SinkError> {
        if self.file.is_none() {
            return Err(SinkError::Unavailable("session already closed".to_string()));
        }
        for scored in chunk {
            self.data_columns.extend(
                scored
                    .record
                    .measurements
                    .keys()
                    .chain(scored.record.attributes.keys())
                    .cloned(),
            );
        }
        self.pending.extend_from_slice(chunk);
        Ok(chunk.len())
    }

    fn commit(mut self, metadata: LoadMetadata) -> Result<(), SinkError> {
        self.write_data()?;

        let sidecar = SinkMetadata {
            run_id: metadata.run_id,
            table: metadata.table,
            last_updated: metadata.committed_at,
            row_count: self.pending.len(),
            columns: self.columns(),
            summary: metadata.summary,
        };
        let body = serde_json::to_vec_pretty(&sidecar)?;
        fs::write(&self.metadata_partial_path, body).map_err(|source| SinkError::Io {
            location: self.metadata_partial_path.display().to_string(),
            source,
        })?;

        self.publish()?;
        self.committed = true;

        info!(
            path = %self.data_path.display(),
            rows = self.pending.len(),
            "batch exported"
        );
        Ok(())
    }
}

impl Drop for CsvLoadSession {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        self.file.take();
        remove_if_present(&self.partial_path);
        remove_if_present(&self.metadata_partial_path);
    }
}
