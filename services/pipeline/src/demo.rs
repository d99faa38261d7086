use crate::commands::{render_alert_report, render_batch_report, CommandContext};
use chrono::NaiveDate;
use clap::Args;
use honey_quality::error::AppError;
use honey_quality::monitoring::SysinfoSampler;
use honey_quality::workflows::export::CsvRecordSink;
use honey_quality::workflows::ingest::CsvRecordSource;
use honey_quality::workflows::quality::QualityPipelineService;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEMO_FILE: &str = "demo_samples.csv";
const LABS: [&str; 3] = ["LAB_A", "LAB_B", "LAB_C"];
const ANALYSTS: [&str; 3] = ["Analyst_1", "Analyst_2", "Analyst_3"];

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of samples to generate
    #[arg(long, default_value_t = 100)]
    pub(crate) records: usize,
    /// Seed for the sample generator; the same seed yields the same file
    #[arg(long, default_value_t = 42)]
    pub(crate) seed: u64,
    /// Fraction of samples pushed outside the acceptable ranges (0.0 to 1.0)
    #[arg(long, default_value_t = 0.05, value_parser = parse_fraction)]
    pub(crate) defect_rate: f64,
    /// Quality config file (defaults to QUALITY_CONFIG_PATH)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    /// Directory for the generated input and the export (defaults to QUALITY_OUTPUT_DIR)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Skip the host resource sample and alert evaluation
    #[arg(long)]
    pub(crate) skip_alerts: bool,
}

/// One generated lab row, in input CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct DemoSample {
    pub(crate) batch_id: String,
    pub(crate) sample_id: String,
    pub(crate) collection_date: NaiveDate,
    pub(crate) lab_id: String,
    pub(crate) analyst: String,
    pub(crate) moisture: f64,
    pub(crate) ph: f64,
    pub(crate) diastase_activity: f64,
    pub(crate) h_m_f: f64,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        records,
        seed,
        defect_rate,
        config,
        output,
        skip_alerts,
    } = args;

    let CommandContext { app, quality } = CommandContext::load(config.as_deref())?;
    let output = output.unwrap_or(app.paths.output_dir);
    fs::create_dir_all(&output)?;

    let samples = generate_samples(records, seed, defect_rate);
    let input = output.join(DEMO_FILE);
    write_samples_csv(&input, &samples)?;

    println!("Honey quality demo");
    println!(
        "Generated {} samples (seed {}, defect rate {:.0}%) -> {}\n",
        samples.len(),
        seed,
        defect_rate * 100.0,
        input.display()
    );

    let table = quality.pipeline.table.clone();
    let sink = Arc::new(CsvRecordSink::new(&output));
    let service =
        QualityPipelineService::new(quality, sink.clone(), Arc::new(SysinfoSampler::new()));
    let report = service.process(&CsvRecordSource::from_path(&input))?;

    let export = report
        .outcome
        .is_success()
        .then(|| sink.data_path(&report.outcome.run_id, &table));
    render_batch_report(&report, export.as_deref());

    if !skip_alerts {
        println!();
        render_alert_report(&service.check_alerts()?);
    }

    match AppError::from_failed_outcome(&report.outcome) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Uniform draws inside the acceptable ranges, with `defect_rate` of the samples
/// pushed out on one parameter.
pub(crate) fn generate_samples(count: usize, seed: u64, defect_rate: f64) -> Vec<DemoSample> {
    let defect_rate = if (0.0..=1.0).contains(&defect_rate) {
        defect_rate
    } else {
        0.0
    };
    let mut rng = StdRng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();

    (1..=count)
        .map(|n| {
            let mut sample = DemoSample {
                batch_id: format!("BATCH_{n:03}"),
                sample_id: format!("SAMPLE_{n:06}"),
                collection_date: start + chrono::Duration::days(n as i64 - 1),
                lab_id: LABS[rng.gen_range(0..LABS.len())].to_string(),
                analyst: ANALYSTS[rng.gen_range(0..ANALYSTS.len())].to_string(),
                moisture: round2(rng.gen_range(15.0..20.0)),
                ph: round2(rng.gen_range(3.5..6.5)),
                diastase_activity: round2(rng.gen_range(8.0..15.0)),
                h_m_f: round2(rng.gen_range(20.0..40.0)),
            };

            if rng.gen_bool(defect_rate) {
                match rng.gen_range(0..3) {
                    0 => sample.moisture = round2(rng.gen_range(20.5..32.0)),
                    1 => sample.h_m_f = round2(rng.gen_range(45.0..95.0)),
                    _ => sample.diastase_activity = round2(rng.gen_range(1.0..7.5)),
                }
            }
            sample
        })
        .collect()
}

pub(crate) fn write_samples_csv(path: &Path, samples: &[DemoSample]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(io::Error::other)?;
    for sample in samples {
        writer.serialize(sample).map_err(io::Error::other)?;
    }
    writer.flush()?;
    Ok(())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn parse_fraction(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|err| format!("failed to parse '{raw}' as a number ({err})"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("'{raw}' must be between 0.0 and 1.0"))
    }
}
