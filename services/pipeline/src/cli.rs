use crate::commands::{run_alerts, run_pipeline, run_rules, AlertsArgs, RulesArgs, RunArgs};
use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use honey_quality::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Honey Quality Pipeline",
    about = "Score, classify and export honey lab measurements",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run one batch from a CSV file and export the scored records
    Run(RunArgs),
    /// Print the active rule table, classification bands and thresholds
    Rules(RulesArgs),
    /// Sample host resources and evaluate alert thresholds
    Alerts(AlertsArgs),
    /// Generate seeded sample data and push it through the full pipeline
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Quality config file (defaults to QUALITY_CONFIG_PATH)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Run(args) => run_pipeline(args),
        Command::Rules(args) => run_rules(args),
        Command::Alerts(args) => run_alerts(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["honey-quality"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn run_requires_an_input_file() {
        assert!(Cli::try_parse_from(["honey-quality", "run"]).is_err());

        let cli = Cli::try_parse_from([
            "honey-quality",
            "run",
            "--input",
            "samples.csv",
            "--output",
            "exports",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Run(args)) => {
                assert_eq!(args.input, PathBuf::from("samples.csv"));
                assert_eq!(args.output, Some(PathBuf::from("exports")));
                assert!(!args.json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn demo_defaults_are_seeded() {
        let cli = Cli::try_parse_from(["honey-quality", "demo"]).expect("parses");
        match cli.command {
            Some(Command::Demo(args)) => {
                assert_eq!(args.records, 100);
                assert_eq!(args.seed, 42);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
