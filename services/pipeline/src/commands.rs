use crate::infra::{load_quality_config, InMemoryRecordSink};
use clap::Args;
use honey_quality::config::{AppConfig, QualityConfig};
use honey_quality::error::AppError;
use honey_quality::monitoring::SysinfoSampler;
use honey_quality::telemetry;
use honey_quality::workflows::export::CsvRecordSink;
use honey_quality::workflows::ingest::CsvRecordSource;
use honey_quality::workflows::quality::{AlertReport, BatchReport, QualityPipelineService};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    /// Lab export to score (CSV with a header row)
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Quality config file (defaults to QUALITY_CONFIG_PATH)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    /// Directory for the scored CSV and its metadata sidecar (defaults to QUALITY_OUTPUT_DIR)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Print the full batch report as JSON instead of the text summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct RulesArgs {
    /// Quality config file (defaults to QUALITY_CONFIG_PATH)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct AlertsArgs {
    /// Quality config file (defaults to QUALITY_CONFIG_PATH)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    /// Lab exports to run before evaluating, so quality and failure alerts have history
    #[arg(long = "input")]
    pub(crate) inputs: Vec<PathBuf>,
}

/// Environment config and quality rules for a one-shot command, loaded after
/// logging is installed so config fallbacks are reported.
pub(crate) struct CommandContext {
    pub(crate) app: AppConfig,
    pub(crate) quality: QualityConfig,
}

impl CommandContext {
    pub(crate) fn load(config: Option<&Path>) -> Result<Self, AppError> {
        let app = AppConfig::load()?;
        telemetry::init(&app.telemetry)?;
        let quality = load_quality_config(config, &app.paths.quality_config)?;
        Ok(Self { app, quality })
    }
}

pub(crate) fn run_pipeline(args: RunArgs) -> Result<(), AppError> {
    let RunArgs {
        input,
        config,
        output,
        json,
    } = args;

    let CommandContext { app, quality } = CommandContext::load(config.as_deref())?;
    let table = quality.pipeline.table.clone();

    let sink = Arc::new(CsvRecordSink::new(output.unwrap_or(app.paths.output_dir)));
    let service =
        QualityPipelineService::new(quality, sink.clone(), Arc::new(SysinfoSampler::new()));
    let report = service.process(&CsvRecordSource::from_path(&input))?;

    if json {
        print_json(&report);
    } else {
        let export = report
            .outcome
            .is_success()
            .then(|| sink.data_path(&report.outcome.run_id, &table));
        render_batch_report(&report, export.as_deref());
    }

    match AppError::from_failed_outcome(&report.outcome) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

pub(crate) fn run_rules(args: RulesArgs) -> Result<(), AppError> {
    let context = CommandContext::load(args.config.as_deref())?;
    print_json(&context.quality.overview());
    Ok(())
}

pub(crate) fn run_alerts(args: AlertsArgs) -> Result<(), AppError> {
    let AlertsArgs { config, inputs } = args;

    let context = CommandContext::load(config.as_deref())?;
    let service = QualityPipelineService::new(
        context.quality,
        Arc::new(InMemoryRecordSink::default()),
        Arc::new(SysinfoSampler::new()),
    );

    for input in &inputs {
        let report = service.process(&CsvRecordSource::from_path(input))?;
        println!(
            "Processed {} -> {} ({} scored)",
            input.display(),
            report.outcome.status.label(),
            report.outcome.scored_records()
        );
    }

    let report = service.check_alerts()?;
    render_alert_report(&report);
    Ok(())
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(err) => println!("JSON output unavailable: {err}"),
    }
}

pub(crate) fn render_batch_report(report: &BatchReport, export: Option<&Path>) {
    let outcome = &report.outcome;
    println!(
        "Run {} [{}] -> {} in {:.3}s",
        outcome.run_id,
        outcome.pipeline,
        outcome.status.label(),
        outcome.duration_seconds
    );
    println!(
        "- {} records in | {} accepted | {} rejected | {} loaded",
        outcome.records_in, outcome.records_accepted, outcome.records_rejected, outcome.records_loaded
    );

    if let Some(stage) = outcome.failed_stage {
        println!(
            "- failed during {}: {}",
            stage.label(),
            outcome.error.as_deref().unwrap_or("no error message")
        );
    }

    let summary = &report.summary;
    if let (Some(average), Some(min), Some(max)) =
        (summary.average_score, summary.min_score, summary.max_score)
    {
        println!("- score average {average:.2} (min {min:.2}, max {max:.2})");
        println!(
            "- compliance rate {:.1}% | premium rate {:.1}%",
            summary.compliance_rate * 100.0,
            summary.premium_rate * 100.0
        );
    }

    if !summary.categories.is_empty() {
        println!("\nQuality categories");
        for (category, count) in &summary.categories {
            println!("- {}: {}", category.label(), count);
        }
    }

    if !summary.compliance.is_empty() {
        println!("\nCompliance");
        for (status, count) in &summary.compliance {
            println!("- {}: {}", status.label(), count);
        }
    }

    if !summary.labs.is_empty() {
        println!("\nLabs");
        for (lab, lab_summary) in &summary.labs {
            println!(
                "- {}: {} samples, average {:.2}",
                lab, lab_summary.samples, lab_summary.average_score
            );
        }
    }

    if report.violations.is_empty() {
        println!("\nRejections: none");
    } else {
        println!("\nRejections");
        for (violation, count) in &report.violations {
            println!("- {violation}: {count}");
        }
    }

    if let Some(path) = export {
        println!("\nExported to {}", path.display());
    }
}

pub(crate) fn render_alert_report(report: &AlertReport) {
    let percent = |value: Option<f64>| match value {
        Some(value) => format!("{value:.1}%"),
        None => "n/a".to_string(),
    };

    println!("Alert check at {}", report.checked_at.to_rfc3339());
    println!(
        "- cpu {} | memory {} | disk {}",
        percent(report.resources.cpu_percent),
        percent(report.resources.memory_percent),
        percent(report.resources.disk_percent)
    );
    println!(
        "- {} runs ({} failed), {} scored records",
        report.stats.total_runs, report.stats.failed_runs, report.stats.scored_records
    );

    if report.alerts.is_empty() {
        println!("Alerts: none");
    } else {
        println!("Alerts");
        for alert in &report.alerts {
            println!(
                "- [{:?}] {:?}: {} (observed {:.3}, threshold {:.3})",
                alert.severity, alert.kind, alert.message, alert.observed_value, alert.threshold
            );
        }
    }
}
