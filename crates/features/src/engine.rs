use crate::drawdown::Drawdown;
use crate::liquidity::LiquidityProxy;
use crate::momentum::MomentumIndicators;
use crate::peg::PegDeviation;
use crate::rolling::RollingFeatures;
use crate::stage::FeatureStage;
use crate::volatility::VolatilityMetrics;
use crate::volume::VolumeFeatures;
use coinrisk_core::columns;
use coinrisk_core::{FeatureConfig, PipelineError, Result, Table};

/// Runs every feature stage in dependency order.
///
/// Stages run in registration order; the default set is rolling,
/// volatility, momentum, drawdown, volume, liquidity and (when a peg is
/// configured) peg deviation.
pub struct FeatureEngine {
    stages: Vec<Box<dyn FeatureStage>>,
}

impl Default for FeatureEngine {
    fn default() -> Self {
        Self::new(&FeatureConfig::default())
    }
}

impl FeatureEngine {
    /// Creates an engine with the standard stages configured from `config`.
    #[must_use]
    pub fn new(config: &FeatureConfig) -> Self {
        let mut engine = Self::empty()
            .with_stage(Box::new(RollingFeatures::new(config.windows.clone())))
            .with_stage(Box::new(VolatilityMetrics::new(config.windows.clone())))
            .with_stage(Box::new(MomentumIndicators::new(config.momentum.clone())))
            .with_stage(Box::new(Drawdown::new(config.drawdown_window)))
            .with_stage(Box::new(VolumeFeatures))
            .with_stage(Box::new(LiquidityProxy));
        if let Some(peg) = config.peg {
            engine = engine.with_stage(Box::new(PegDeviation::new(peg)));
        }
        engine
    }

    /// Creates an engine with no stages.
    #[must_use]
    pub fn empty() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a stage.
    #[must_use]
    pub fn with_stage(mut self, stage: Box<dyn FeatureStage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Names of the registered stages, in run order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Computes all features for a normalized table.
    ///
    /// An empty table is returned unchanged.
    ///
    /// # Errors
    /// Returns `MissingColumn("price")` if a non-empty table has no price
    /// column, or the first error a stage reports.
    pub fn compute(&self, table: &Table) -> Result<Table> {
        if table.is_empty() {
            tracing::debug!("Empty table; skipping feature stages");
            return Ok(table.clone());
        }
        if !table.has_column(columns::PRICE) {
            return Err(PipelineError::missing_column(columns::PRICE));
        }

        let mut current = table.clone();
        for stage in &self.stages {
            current = stage.apply(&current)?;
            tracing::debug!(
                stage = stage.name(),
                columns = current.columns().len(),
                "Feature stage complete"
            );
        }

        tracing::info!(
            rows = current.len(),
            assets = current.assets().len(),
            columns = current.columns().len(),
            "Computed features"
        );
        Ok(current)
    }
}
