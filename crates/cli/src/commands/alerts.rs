//! Alerts command.
//!
//! Normalizes a raw observation CSV and checks each asset's latest price
//! against the configured peg.

use anyhow::{Context, Result};
use clap::Args;
use coinrisk_data::{normalize, CsvStorage};
use coinrisk_scoring::check_alerts;
use std::path::PathBuf;

/// Arguments for the alerts command.
#[derive(Args, Debug, Clone)]
pub struct AlertsArgs {
    /// Raw observation CSV
    #[arg(short, long)]
    pub input: PathBuf,

    /// Maximum tolerated absolute deviation from the peg (overrides config)
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Peg value (overrides config)
    #[arg(long)]
    pub peg: Option<f64>,

    /// Only check these assets (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub assets: Vec<String>,

    /// Print alerts as JSON
    #[arg(long)]
    pub json: bool,

    /// Pipeline config file (defaults to config/Pipeline.toml)
    #[arg(short, long, env = "COINRISK_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Runs the alerts command.
///
/// # Errors
/// Returns an error if the input cannot be read or normalized.
pub fn run_alerts(args: AlertsArgs) -> Result<()> {
    let mut config = super::load_config(args.config.as_deref(), None)?;
    if let Some(threshold) = args.threshold {
        config.alerts.threshold = threshold;
    }
    if let Some(peg) = args.peg {
        config.alerts.peg = peg;
    }
    if !args.assets.is_empty() {
        config.alerts.assets = args.assets;
    }

    let raw = CsvStorage::read_raw_observations(&args.input)?;
    let table = normalize(&raw, &config.normalize).context("Normalization failed")?;
    let alerts = check_alerts(&table, &config.alerts);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&alerts)?);
    } else if alerts.is_empty() {
        println!(
            "No peg deviations above {} (peg {})",
            config.alerts.threshold, config.alerts.peg
        );
    } else {
        for alert in &alerts {
            println!("{alert}");
        }
    }

    Ok(())
}
