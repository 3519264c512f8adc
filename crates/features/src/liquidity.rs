use crate::stage::{per_asset, FeatureStage};
use crate::window::{quantile, RollingWindow};
use coinrisk_core::columns;
use coinrisk_core::{Result, Series, Table};

const STABILITY_WINDOW: usize = 30;
const VOLUME_PERCENTILE: f64 = 0.95;

/// Score given to every row when no volume is available.
pub const NEUTRAL_LIQUIDITY: f64 = 50.0;

/// Adds `volume_stability` and `liquidity_score` (0 to 100, higher is more liquid).
///
/// Half the score comes from volume relative to the asset's 95th percentile,
/// half from `1 - std30/mean30` of volume. Without a volume column every row
/// gets a neutral score of 50.
///
/// # Errors
/// Returns `LengthMismatch` only if the table's columns are inconsistent.
pub fn compute_liquidity_proxy(table: &Table) -> Result<Table> {
    let mut out = table.clone();
    let Some(volume) = table.column(columns::VOLUME) else {
        tracing::debug!("No volume column; using neutral liquidity score");
        out.set_constant_column(columns::LIQUIDITY_SCORE, NEUTRAL_LIQUIDITY);
        return Ok(out);
    };

    let groups = table.asset_groups();
    let [stability, score] = per_asset(&groups, volume, table.len(), liquidity_series);

    tracing::debug!(rows = table.len(), "Computed liquidity proxy");
    out.set_column(columns::VOLUME_STABILITY, stability)?;
    out.set_column(columns::LIQUIDITY_SCORE, score)?;
    Ok(out)
}

fn liquidity_series(volume: &[Option<f64>]) -> [Series; 2] {
    let reference = quantile(volume, VOLUME_PERCENTILE).unwrap_or(0.0);
    let mut acc = RollingWindow::new(STABILITY_WINDOW);
    let mut stability = Vec::with_capacity(volume.len());
    let mut score = Vec::with_capacity(volume.len());

    for &v in volume {
        acc.push(v);
        let ratio = match (acc.std(STABILITY_WINDOW), acc.mean(STABILITY_WINDOW)) {
            (Some(std), Some(mean)) if acc.is_full() && mean != 0.0 => std / mean,
            _ => 0.0,
        };
        let stable = 1.0 - ratio;
        stability.push(Some(stable));

        score.push(v.map(|v| {
            let volume_score = if reference == 0.0 {
                0.0
            } else {
                (v / reference * 50.0).clamp(0.0, 50.0)
            };
            let stability_score = (stable * 50.0).clamp(0.0, 50.0);
            volume_score + stability_score
        }));
    }

    [stability, score]
}

/// Liquidity stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiquidityProxy;

impl FeatureStage for LiquidityProxy {
    fn name(&self) -> &'static str {
        "liquidity"
    }

    fn apply(&self, table: &Table) -> Result<Table> {
        compute_liquidity_proxy(table)
    }
}
