use clap::{Parser, Subcommand};
use coinrisk_cli::commands::{run_alerts, run_score, AlertsArgs, ScoreArgs};
use std::path::Path;

#[derive(Parser)]
#[command(name = "coinrisk")]
#[command(about = "Crypto time-series normalization, feature and risk scoring pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize, resample, derive features and score a raw CSV
    Score(ScoreArgs),
    /// Check latest prices against a stablecoin peg
    Alerts(AlertsArgs),
}

fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            // stdout carries the command's results
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Score(args) => args.log_file.as_deref(),
        Commands::Alerts(_) => None,
    };
    init_logging(log_file)?;

    match cli.command {
        Commands::Score(args) => run_score(args),
        Commands::Alerts(args) => run_alerts(args),
    }
}
