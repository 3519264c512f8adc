use crate::stage::{per_asset, FeatureStage};
use crate::window::RollingWindow;
use coinrisk_core::columns;
use coinrisk_core::{Result, Series, Table};

/// Adds `running_max`, `drawdown` (percent below the running max, never
/// positive) and `max_drawdown_30d` (worst drawdown over the trailing
/// `window` rows).
///
/// # Errors
/// Returns `MissingColumn("price")` if the table has no price column.
pub fn compute_drawdown(table: &Table, window: usize) -> Result<Table> {
    let price = table.require_column(columns::PRICE)?;
    let groups = table.asset_groups();

    let [running_max, drawdown, worst] =
        per_asset(&groups, price, table.len(), |series| drawdown_series(series, window));

    tracing::debug!(rows = table.len(), window, "Computed drawdown");

    table
        .clone()
        .with_column(columns::RUNNING_MAX, running_max)?
        .with_column(columns::DRAWDOWN, drawdown)?
        .with_column(columns::MAX_DRAWDOWN_30D, worst)
}

fn drawdown_series(prices: &[Option<f64>], window: usize) -> [Series; 3] {
    let mut peak: Option<f64> = None;
    let mut worst = RollingWindow::new(window);
    let mut running_max = Vec::with_capacity(prices.len());
    let mut drawdown = Vec::with_capacity(prices.len());
    let mut max_drawdown = Vec::with_capacity(prices.len());

    for &price in prices {
        let (current_max, current_dd) = match price {
            Some(p) => {
                let max = peak.map_or(p, |m| m.max(p));
                peak = Some(max);
                let dd = if max > 0.0 { ((p - max) / max * 100.0).min(0.0) } else { 0.0 };
                (Some(max), Some(dd))
            }
            None => (None, None),
        };
        worst.push(current_dd);
        running_max.push(current_max);
        drawdown.push(current_dd);
        max_drawdown.push(worst.min());
    }

    [running_max, drawdown, max_drawdown]
}

/// Drawdown stage.
#[derive(Debug, Clone)]
pub struct Drawdown {
    window: usize,
}

impl Drawdown {
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self { window }
    }
}

impl Default for Drawdown {
    fn default() -> Self {
        Self::new(30)
    }
}

impl FeatureStage for Drawdown {
    fn name(&self) -> &'static str {
        "drawdown"
    }

    fn apply(&self, table: &Table) -> Result<Table> {
        compute_drawdown(table, self.window)
    }
}
