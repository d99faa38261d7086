use honey_quality::config::{ConfigError, QualityConfig};
use honey_quality::workflows::quality::{
    LoadMetadata, LoadSession, RecordSink, RunId, ScoredRecord, SinkError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

/// Committed runs kept per table before the oldest is evicted.
const RETAINED_RUNS: usize = 50;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Debug, Clone)]
pub(crate) struct StoredRun {
    pub(crate) metadata: LoadMetadata,
    pub(crate) rows: Vec<ScoredRecord>,
}

/// Keeps committed runs in process memory, keyed by table.
#[derive(Default, Clone)]
pub(crate) struct InMemoryRecordSink {
    tables: Arc<Mutex<HashMap<String, VecDeque<StoredRun>>>>,
}

impl InMemoryRecordSink {
    pub(crate) fn runs(&self, table: &str) -> Vec<StoredRun> {
        match self.tables.lock() {
            Ok(guard) => guard
                .get(table)
                .map(|runs| runs.iter().cloned().collect())
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }
}

impl RecordSink for InMemoryRecordSink {
    type Session<'a>
        = InMemorySession<'a>
    where
        Self: 'a;

    fn begin(&self, run_id: &RunId, table: &str) -> Result<InMemorySession<'_>, SinkError> {
        Ok(InMemorySession {
            sink: self,
            run_id: run_id.clone(),
            table: table.to_string(),
            rows: Vec::new(),
        })
    }
}

/// Buffers rows until commit; dropping the session discards them.
pub(crate) struct InMemorySession<'a> {
    sink: &'a InMemoryRecordSink,
    run_id: RunId,
    table: String,
    rows: Vec<ScoredRecord>,
}

impl LoadSession for InMemorySession<'_> {
    fn write_chunk(&mut self, chunk: &[ScoredRecord]) -> Result<usize, SinkError> {
        self.rows.extend_from_slice(chunk);
        Ok(chunk.len())
    }

    fn commit(self, metadata: LoadMetadata) -> Result<(), SinkError> {
        if metadata.run_id != self.run_id {
            return Err(SinkError::Unavailable(format!(
                "session for {} cannot commit {}",
                self.run_id, metadata.run_id
            )));
        }

        let mut guard = self
            .sink
            .tables
            .lock()
            .map_err(|_| SinkError::Unavailable("in-memory store poisoned".to_string()))?;
        let runs = guard.entry(self.table).or_default();
        if runs.len() == RETAINED_RUNS {
            runs.pop_front();
        }
        runs.push_back(StoredRun {
            metadata,
            rows: self.rows,
        });
        Ok(())
    }
}

/// Load the quality config, preferring an explicit path over the configured one.
pub(crate) fn load_quality_config(
    explicit: Option<&Path>,
    configured: &Path,
) -> Result<QualityConfig, ConfigError> {
    QualityConfig::load(explicit.unwrap_or(configured))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use honey_quality::workflows::quality::{
        ComplianceStatus, QualityCategory, QualitySummary, SampleRecord,
    };

    fn scored(sample_id: &str) -> ScoredRecord {
        ScoredRecord {
            record: SampleRecord::new("B-1", sample_id),
            score: 100.0,
            category: QualityCategory::Premium,
            compliance: ComplianceStatus::Compliant,
            processed_at: Utc::now(),
            breakdown: None,
        }
    }

    fn metadata(run_id: &RunId, rows: usize) -> LoadMetadata {
        LoadMetadata {
            run_id: run_id.clone(),
            table: "honey_quality_data".to_string(),
            committed_at: Utc::now(),
            row_count: rows,
            summary: QualitySummary::default(),
        }
    }

    #[test]
    fn committed_sessions_are_visible_per_table() {
        let sink = InMemoryRecordSink::default();
        let run_id = RunId("run-1".to_string());

        let mut session = sink.begin(&run_id, "honey_quality_data").expect("begin");
        session.write_chunk(&[scored("S-1"), scored("S-2")]).expect("write");
        session.write_chunk(&[scored("S-3")]).expect("write");
        session.commit(metadata(&run_id, 3)).expect("commit");

        let runs = sink.runs("honey_quality_data");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].rows.len(), 3);
        assert_eq!(runs[0].metadata.row_count, 3);
        assert!(sink.runs("other").is_empty());
    }

    #[test]
    fn dropped_sessions_leave_nothing_behind() {
        let sink = InMemoryRecordSink::default();
        let run_id = RunId("run-1".to_string());
        {
            let mut session = sink.begin(&run_id, "honey_quality_data").expect("begin");
            session.write_chunk(&[scored("S-1")]).expect("write");
        }
        assert!(sink.runs("honey_quality_data").is_empty());
    }

    #[test]
    fn oldest_runs_are_evicted() {
        let sink = InMemoryRecordSink::default();
        for n in 0..=RETAINED_RUNS {
            let run_id = RunId(format!("run-{n}"));
            let session = sink.begin(&run_id, "t").expect("begin");
            session.commit(metadata(&run_id, 0)).expect("commit");
        }

        let runs = sink.runs("t");
        assert_eq!(runs.len(), RETAINED_RUNS);
        assert_eq!(runs[0].metadata.run_id.0, "run-1");
    }
}
