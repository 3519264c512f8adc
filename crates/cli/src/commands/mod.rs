//! CLI commands for the risk scoring pipeline.

pub mod alerts;
pub mod score;

pub use alerts::{run_alerts, AlertsArgs};
pub use score::{run_score, ScoreArgs};

use anyhow::Result;
use coinrisk_core::{ConfigLoader, PipelineConfig};
use std::path::Path;

/// Loads pipeline configuration from an explicit file, a named profile, or
/// the default `config/Pipeline.toml`.
///
/// # Errors
/// Returns an error if the configuration cannot be parsed or is invalid.
pub fn load_config(config: Option<&Path>, profile: Option<&str>) -> Result<PipelineConfig> {
    match (config, profile) {
        (Some(path), _) => ConfigLoader::load_from(path),
        (None, Some(profile)) => ConfigLoader::load_with_profile(profile),
        (None, None) => ConfigLoader::load(),
    }
}
