//! Score command.
//!
//! Reads a raw observation CSV, runs the full pipeline and writes the scored
//! table. Prints a per-asset summary and any peg alerts.

use crate::pipeline::run_pipeline;
use anyhow::{anyhow, Context, Result};
use clap::{Args, ValueEnum};
use coinrisk_data::{CsvStorage, ParquetStorage, StorageFormat};
use coinrisk_scoring::{check_alerts, summarize_latest};
use std::path::PathBuf;

/// Output file format.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
    Parquet,
}

impl From<OutputFormat> for StorageFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Csv => Self::Csv,
            OutputFormat::Json => Self::Json,
            OutputFormat::Parquet => Self::Parquet,
        }
    }
}

/// Arguments for the score command.
#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    /// Raw observation CSV (asset_id, timestamp, price, optional volume/high/low/...)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Destination for the scored table
    #[arg(short, long)]
    pub output: PathBuf,

    /// Output format (inferred from the output extension if omitted)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pipeline config file (defaults to config/Pipeline.toml)
    #[arg(short, long, env = "COINRISK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Config profile, merged from config/Pipeline.<profile>.toml
    #[arg(long)]
    pub profile: Option<String>,

    /// Optional log file path (logs to file instead of stderr)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Write Parquet partitioned by day and asset under --output (a directory)
    #[arg(long, conflicts_with = "format")]
    pub partitioned: bool,
}

/// Runs the score command.
///
/// # Errors
/// Returns an error if the input cannot be read, a pipeline stage fails, or
/// the output cannot be written.
pub fn run_score(args: ScoreArgs) -> Result<()> {
    let config = super::load_config(args.config.as_deref(), args.profile.as_deref())?;

    let format = match (args.partitioned, args.format) {
        (true, _) => None,
        (false, Some(format)) => Some(StorageFormat::from(format)),
        (false, None) => Some(StorageFormat::from_path(&args.output).ok_or_else(|| {
            anyhow!(
                "Cannot infer output format from {}; pass --format",
                args.output.display()
            )
        })?),
    };

    let raw = CsvStorage::read_raw_observations(&args.input)?;
    tracing::info!(rows = raw.len(), input = %args.input.display(), "Loaded raw observations");

    let scored = run_pipeline(&raw, &config)?;

    match format {
        Some(format) => {
            format
                .write(&args.output, &scored)
                .with_context(|| format!("Failed to write {}", args.output.display()))?;
            tracing::info!(
                rows = scored.len(),
                output = %args.output.display(),
                ?format,
                "Wrote scored table"
            );
        }
        None => {
            let files = ParquetStorage::write_partitioned(&args.output, &scored)
                .with_context(|| format!("Failed to write partitions under {}", args.output.display()))?;
            tracing::info!(
                rows = scored.len(),
                partitions = files.len(),
                output = %args.output.display(),
                "Wrote partitioned scored table"
            );
        }
    }

    println!("{:<16} {:>14} {:>6} {:>8}", "ASSET", "PRICE", "RISK", "LEVEL");
    for summary in summarize_latest(&scored) {
        let price = summary
            .price
            .map_or_else(|| "N/A".to_string(), |p| format!("{p:.4}"));
        let risk = summary
            .risk_score
            .map_or_else(|| "N/A".to_string(), |r| format!("{r:.0}"));
        let level = summary
            .level
            .map_or_else(|| "N/A".to_string(), |l| l.to_string());
        println!("{:<16} {price:>14} {risk:>6} {level:>8}", summary.asset_id);
    }

    if !config.alerts.assets.is_empty() {
        for alert in check_alerts(&scored, &config.alerts) {
            println!("ALERT: {alert}");
        }
    }

    Ok(())
}
