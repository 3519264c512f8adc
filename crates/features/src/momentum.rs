//! RSI and MACD.

use crate::stage::{per_asset, FeatureStage};
use crate::window::{ema, RollingWindow};
use coinrisk_core::columns;
use coinrisk_core::{MomentumConfig, Result, Series, Table};

/// Adds `rsi`, `macd`, `macd_signal` and `macd_histogram`.
///
/// RSI averages gains and losses of price deltas over full windows; a zero
/// average loss gives 100. MACD is reported once `macd_slow` rows exist and
/// its signal line once `macd_signal` MACD values exist.
///
/// # Errors
/// Returns `MissingColumn("price")` if the table has no price column.
pub fn compute_momentum_indicators(table: &Table, config: &MomentumConfig) -> Result<Table> {
    let price = table.require_column(columns::PRICE)?;
    let groups = table.asset_groups();

    let [rsi_values] = per_asset(&groups, price, table.len(), |series| {
        [rsi(series, config.rsi_period)]
    });
    let [macd_line, signal, histogram] =
        per_asset(&groups, price, table.len(), |series| macd(series, config));

    tracing::debug!(
        rows = table.len(),
        rsi_period = config.rsi_period,
        "Computed momentum indicators"
    );

    table
        .clone()
        .with_column(columns::RSI, rsi_values)?
        .with_column(columns::MACD, macd_line)?
        .with_column(columns::MACD_SIGNAL, signal)?
        .with_column(columns::MACD_HISTOGRAM, histogram)
}

/// Relative strength index over `period` price deltas.
#[must_use]
pub fn rsi(prices: &[Option<f64>], period: usize) -> Series {
    let mut gains = RollingWindow::new(period);
    let mut losses = RollingWindow::new(period);
    let mut previous: Option<f64> = None;

    prices
        .iter()
        .map(|&price| {
            let delta = previous.zip(price).map(|(a, b)| b - a);
            previous = price;
            gains.push(delta.map(|d| d.max(0.0)));
            losses.push(delta.map(|d| (-d).max(0.0)));

            if !gains.is_full() {
                return None;
            }
            let gain = gains.mean(period)?;
            let loss = losses.mean(period)?;
            if loss <= 0.0 {
                return Some(100.0);
            }
            Some(100.0 - 100.0 / (1.0 + gain / loss))
        })
        .collect()
}

/// MACD line, signal line and histogram.
///
/// The EMAs run from the first row; values before `macd_slow` rows (and the
/// signal before `macd_signal` further MACD rows) are masked as missing.
#[must_use]
pub fn macd(prices: &[Option<f64>], config: &MomentumConfig) -> [Series; 3] {
    let fast = ema(prices, config.macd_fast);
    let slow = ema(prices, config.macd_slow);

    let raw: Series = fast
        .iter()
        .zip(&slow)
        .map(|(f, s)| f.zip(*s).map(|(f, s)| f - s))
        .collect();
    let raw_signal = ema(&raw, config.macd_signal);

    let macd_start = config.macd_slow.saturating_sub(1);
    let signal_start = macd_start + config.macd_signal.saturating_sub(1);

    let line: Series = raw
        .iter()
        .enumerate()
        .map(|(i, v)| if i >= macd_start { *v } else { None })
        .collect();
    let signal: Series = raw_signal
        .iter()
        .enumerate()
        .map(|(i, v)| if i >= signal_start { *v } else { None })
        .collect();
    let histogram: Series = line
        .iter()
        .zip(&signal)
        .map(|(m, s)| m.zip(*s).map(|(m, s)| m - s))
        .collect();

    [line, signal, histogram]
}

/// Momentum stage.
#[derive(Debug, Clone, Default)]
pub struct MomentumIndicators {
    config: MomentumConfig,
}

impl MomentumIndicators {
    #[must_use]
    pub fn new(config: MomentumConfig) -> Self {
        Self { config }
    }
}

impl FeatureStage for MomentumIndicators {
    fn name(&self) -> &'static str {
        "momentum"
    }

    fn apply(&self, table: &Table) -> Result<Table> {
        compute_momentum_indicators(table, &self.config)
    }
}
