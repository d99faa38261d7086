use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::config::{PipelineOptions, QualityConfig};
use crate::monitoring::{FixedSampler, ResourceSnapshot};
use crate::workflows::quality::classifier::ClassificationScheme;
use crate::workflows::quality::domain::{RunId, SampleRecord, ScoredRecord};
use crate::workflows::quality::repository::{
    LoadMetadata, LoadSession, RecordSink, RecordSource, SinkError, SourceError,
};
use crate::workflows::quality::rules::{Rule, RulePreset, RuleSet, Tier};
use crate::workflows::quality::{BatchOrchestrator, QualityPipelineService};

pub(super) fn etl_rules() -> Arc<RuleSet> {
    Arc::new(RuleSet::preset(RulePreset::Etl))
}

/// Moisture range [15, 20] with tiers (1,0) (2,5) (inf,15), other parameters from the etl preset.
pub(super) fn example_rules() -> Arc<RuleSet> {
    let moisture = Rule::range(
        "moisture",
        15.0,
        20.0,
        vec![Tier::new(1.0, 0.0), Tier::new(2.0, 5.0), Tier::catch_all(15.0)],
    )
    .expect("valid moisture rule");

    let rules = RuleSet::preset(RulePreset::Etl)
        .iter()
        .filter(|rule| rule.parameter() != "moisture")
        .cloned()
        .chain(std::iter::once(moisture))
        .collect::<Vec<_>>();
    Arc::new(RuleSet::new(rules).expect("unique parameters"))
}

pub(super) fn sample(sample_id: &str, moisture: f64, ph: f64, diastase: f64, hmf: f64) -> SampleRecord {
    SampleRecord::new("B-2025-01", sample_id)
        .with_measurement("moisture", moisture)
        .with_measurement("ph", ph)
        .with_measurement("diastase_activity", diastase)
        .with_measurement("h_m_f", hmf)
        .with_lab("LAB_A")
}

pub(super) fn ideal_sample(sample_id: &str) -> SampleRecord {
    sample(sample_id, 17.5, 5.0, 12.0, 20.0)
}

pub(super) fn options() -> PipelineOptions {
    PipelineOptions::default()
}

pub(super) struct VecSource {
    pub(super) records: Vec<SampleRecord>,
}

impl VecSource {
    pub(super) fn new(records: Vec<SampleRecord>) -> Self {
        Self { records }
    }
}

impl RecordSource for VecSource {
    fn name(&self) -> &str {
        "fixture"
    }

    fn extract(&self) -> Result<Vec<SampleRecord>, SourceError> {
        Ok(self.records.clone())
    }
}

pub(super) struct UnavailableSource;

impl RecordSource for UnavailableSource {
    fn name(&self) -> &str {
        "offline"
    }

    fn extract(&self) -> Result<Vec<SampleRecord>, SourceError> {
        Err(SourceError::Unavailable("lab export share offline".to_string()))
    }
}

pub(super) struct PanickingSource;

impl RecordSource for PanickingSource {
    fn name(&self) -> &str {
        "panicking"
    }

    fn extract(&self) -> Result<Vec<SampleRecord>, SourceError> {
        panic!("driver crashed")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct CommittedBatch {
    pub(super) run_id: RunId,
    pub(super) table: String,
    pub(super) rows: Vec<ScoredRecord>,
    pub(super) chunk_sizes: Vec<usize>,
    pub(super) metadata: LoadMetadata,
}

#[derive(Default, Clone)]
pub(super) struct MemorySink {
    committed: Arc<Mutex<Vec<CommittedBatch>>>,
    open_sessions: Arc<AtomicUsize>,
}

impl MemorySink {
    pub(super) fn committed(&self) -> Vec<CommittedBatch> {
        self.committed.lock().expect("sink mutex poisoned").clone()
    }

    pub(super) fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }
}

pub(super) struct MemorySession<'a> {
    sink: &'a MemorySink,
    run_id: RunId,
    table: String,
    rows: Vec<ScoredRecord>,
    chunk_sizes: Vec<usize>,
}

impl RecordSink for MemorySink {
    type Session<'a> = MemorySession<'a>;

    fn begin(&self, run_id: &RunId, table: &str) -> Result<MemorySession<'_>, SinkError> {
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySession {
            sink: self,
            run_id: run_id.clone(),
            table: table.to_string(),
            rows: Vec::new(),
            chunk_sizes: Vec::new(),
        })
    }
}

impl LoadSession for MemorySession<'_> {
    fn write_chunk(&mut self, chunk: &[ScoredRecord]) -> Result<usize, SinkError> {
        self.rows.extend_from_slice(chunk);
        self.chunk_sizes.push(chunk.len());
        Ok(chunk.len())
    }

    fn commit(mut self, metadata: LoadMetadata) -> Result<(), SinkError> {
        let batch = CommittedBatch {
            run_id: self.run_id.clone(),
            table: self.table.clone(),
            rows: std::mem::take(&mut self.rows),
            chunk_sizes: std::mem::take(&mut self.chunk_sizes),
            metadata,
        };
        self.sink
            .committed
            .lock()
            .expect("sink mutex poisoned")
            .push(batch);
        Ok(())
    }
}

impl Drop for MemorySession<'_> {
    fn drop(&mut self) {
        self.sink.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Accepts a session but fails every write.
#[derive(Default)]
pub(super) struct FailingSink {
    released: Arc<AtomicUsize>,
}

impl FailingSink {
    pub(super) fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

pub(super) struct FailingSession {
    released: Arc<AtomicUsize>,
}

impl RecordSink for FailingSink {
    type Session<'a> = FailingSession;

    fn begin(&self, _run_id: &RunId, _table: &str) -> Result<FailingSession, SinkError> {
        Ok(FailingSession {
            released: self.released.clone(),
        })
    }
}

impl LoadSession for FailingSession {
    fn write_chunk(&mut self, _chunk: &[ScoredRecord]) -> Result<usize, SinkError> {
        Err(SinkError::Unavailable("warehouse connection reset".to_string()))
    }

    fn commit(self, _metadata: LoadMetadata) -> Result<(), SinkError> {
        Ok(())
    }
}

impl Drop for FailingSession {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

pub(super) fn orchestrator(
    rules: Arc<RuleSet>,
    options: PipelineOptions,
) -> (BatchOrchestrator<MemorySink>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::default());
    let orchestrator =
        BatchOrchestrator::new(rules, ClassificationScheme::etl(), sink.clone(), options);
    (orchestrator, sink)
}

pub(super) fn quiet_sampler() -> Arc<FixedSampler> {
    Arc::new(FixedSampler(ResourceSnapshot {
        cpu_percent: Some(15.0),
        memory_percent: Some(40.0),
        disk_percent: Some(55.0),
    }))
}

pub(super) fn build_service() -> (QualityPipelineService<MemorySink>, Arc<MemorySink>) {
    build_service_with(QualityConfig::default())
}

pub(super) fn build_service_with(
    config: QualityConfig,
) -> (QualityPipelineService<MemorySink>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::default());
    let service = QualityPipelineService::new(config, sink.clone(), quiet_sampler());
    (service, sink)
}

/// Default configuration that fails validation once any record is rejected.
pub(super) fn strict_config() -> QualityConfig {
    QualityConfig {
        pipeline: PipelineOptions {
            max_rejection_rate: Some(0.0),
            ..PipelineOptions::default()
        },
        ..QualityConfig::default()
    }
}

pub(super) const GOOD_CSV: &str = "batch_id,sample_id,lab_id,moisture,ph,diastase,hmf\n\
B-7,S-1,LAB_A,17.5,5.0,12.0,20.0\n\
B-7,S-2,LAB_B,22.0,5.0,12.0,20.0\n\
B-7,S-3,LAB_B,35.0,5.0,12.0,20.0\n";

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
