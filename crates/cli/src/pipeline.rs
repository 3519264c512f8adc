//! End-to-end pipeline run shared by the CLI commands.

use anyhow::{Context, Result};
use coinrisk_core::{PipelineConfig, RawTable, Table};
use coinrisk_data::{normalize, resample_with_config};
use coinrisk_features::FeatureEngine;
use coinrisk_scoring::compute_risk_score;

/// Normalizes, resamples, derives features and scores a raw table.
///
/// # Errors
/// Returns the first stage error, annotated with the stage name.
pub fn run_pipeline(raw: &RawTable, config: &PipelineConfig) -> Result<Table> {
    let normalized = normalize(raw, &config.normalize).context("Normalization failed")?;
    tracing::info!(
        rows = normalized.len(),
        assets = normalized.assets().len(),
        "Normalized input"
    );

    let resampled =
        resample_with_config(&normalized, &config.resample).context("Resampling failed")?;
    if let Some(rule) = config.resample.rule {
        tracing::info!(%rule, rows = resampled.len(), "Resampled input");
    }

    let features = FeatureEngine::new(&config.features)
        .compute(&resampled)
        .context("Feature computation failed")?;

    compute_risk_score(&features, &config.weights).context("Risk scoring failed")
}
