//! Realized and Parkinson volatility plus the volatility score.

use crate::stage::{per_asset, FeatureStage};
use crate::window::{quantile, RollingWindow};
use coinrisk_core::columns;
use coinrisk_core::{Result, Series, Table};

/// Trading days per year used for annualization (crypto trades every day).
pub const ANNUALIZATION_DAYS: f64 = 365.0;

/// Percentile of realized volatility that maps to a score of 100.
pub const SCORE_PERCENTILE: f64 = 0.95;

/// Adds `log_return`, `realized_vol_w`, `parkinson_vol_w` (when high and low
/// are present) and `volatility_score`.
///
/// Volatility columns need a full window of valid values. The score scales
/// the smallest window's realized volatility by its 95th percentile over the
/// asset's whole series and clips to `[0, 100]`; a zero percentile yields a
/// score of 0 on every row.
///
/// # Errors
/// Returns `MissingColumn("price")` if the table has no price column.
pub fn compute_volatility_metrics(table: &Table, windows: &[usize]) -> Result<Table> {
    let price = table.require_column(columns::PRICE)?;
    let groups = table.asset_groups();
    let rows = table.len();
    let mut out = table.clone();

    let [returns] = per_asset(&groups, price, rows, |series| [log_returns(series)]);

    let mut score_source: Option<Series> = None;
    let mut sorted_windows = windows.to_vec();
    sorted_windows.sort_unstable();
    sorted_windows.dedup();

    for &window in &sorted_windows {
        let [realized] = per_asset(&groups, &returns, rows, |series| {
            [realized_volatility(series, window)]
        });
        if score_source.is_none() {
            score_source = Some(realized.clone());
        }
        out.set_column(columns::realized_vol(window), realized)?;
    }

    if let (Some(high), Some(low)) = (table.column(columns::HIGH), table.column(columns::LOW)) {
        let range: Series = high
            .iter()
            .zip(low)
            .map(|(h, l)| match (h, l) {
                (Some(h), Some(l)) if *h > 0.0 && *l > 0.0 => Some((h / l).ln().powi(2)),
                _ => None,
            })
            .collect();
        for &window in &sorted_windows {
            let [parkinson] = per_asset(&groups, &range, rows, |series| {
                [parkinson_volatility(series, window)]
            });
            out.set_column(columns::parkinson_vol(window), parkinson)?;
        }
    }

    if let Some(realized) = score_source {
        let [score] = per_asset(&groups, &realized, rows, |series| [volatility_score(series)]);
        out.set_column(columns::VOLATILITY_SCORE, score)?;
    }

    out.set_column(columns::LOG_RETURN, returns)?;

    tracing::debug!(rows, windows = ?sorted_windows, "Computed volatility metrics");
    Ok(out)
}

/// `ln(p[t] / p[t-1])`; missing for the first row and around gaps.
#[must_use]
pub fn log_returns(prices: &[Option<f64>]) -> Series {
    let mut out = Vec::with_capacity(prices.len());
    let mut previous: Option<f64> = None;
    for &price in prices {
        out.push(match (previous, price) {
            (Some(a), Some(b)) if a > 0.0 && b > 0.0 => Some((b / a).ln()),
            _ => None,
        });
        previous = price;
    }
    out
}

fn realized_volatility(log_returns: &[Option<f64>], window: usize) -> Series {
    let factor = ANNUALIZATION_DAYS.sqrt();
    let mut acc = RollingWindow::new(window);
    log_returns
        .iter()
        .map(|&r| {
            acc.push(r);
            if acc.is_full() {
                acc.std(window).map(|s| s * factor)
            } else {
                None
            }
        })
        .collect()
}

fn parkinson_volatility(squared_ranges: &[Option<f64>], window: usize) -> Series {
    let factor = ANNUALIZATION_DAYS.sqrt();
    let denominator = 4.0 * std::f64::consts::LN_2;
    let mut acc = RollingWindow::new(window);
    squared_ranges
        .iter()
        .map(|&v| {
            acc.push(v);
            if acc.is_full() {
                acc.mean(window).map(|m| (m / denominator).sqrt() * factor)
            } else {
                None
            }
        })
        .collect()
}

fn volatility_score(realized: &[Option<f64>]) -> Series {
    match quantile(realized, SCORE_PERCENTILE) {
        Some(q) if q == 0.0 => vec![Some(0.0); realized.len()],
        Some(q) => realized
            .iter()
            .map(|v| v.map(|v| (v / q * 100.0).clamp(0.0, 100.0)))
            .collect(),
        None => vec![None; realized.len()],
    }
}

/// Volatility stage.
#[derive(Debug, Clone)]
pub struct VolatilityMetrics {
    windows: Vec<usize>,
}

impl VolatilityMetrics {
    #[must_use]
    pub fn new(windows: Vec<usize>) -> Self {
        Self { windows }
    }
}

impl FeatureStage for VolatilityMetrics {
    fn name(&self) -> &'static str {
        "volatility"
    }

    fn apply(&self, table: &Table) -> Result<Table> {
        compute_volatility_metrics(table, &self.windows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use coinrisk_core::{Observation, PipelineError};

    fn ts(i: usize) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i as i64)
    }

    fn table_from(prices: &[f64]) -> Table {
        let rows: Vec<Observation> = prices
            .iter()
            .enumerate()
            .map(|(i, p)| Observation::new("btc", ts(i), *p).with_high_low(p * 1.02, p * 0.98))
            .collect();
        Table::from_observations(&rows)
    }

    #[test]
    fn log_return_starts_missing() {
        let out = log_returns(&[Some(100.0), Some(110.0), None, Some(121.0)]);
        assert_eq!(out[0], None);
        assert!((out[1].unwrap() - (1.1_f64).ln()).abs() < 1e-12);
        assert_eq!(out[2], None);
        assert_eq!(out[3], None);
    }

    #[test]
    fn realized_vol_needs_full_window() {
        let prices: Vec<f64> = (0..10).map(|i| 100.0 * (1.0 + 0.01 * f64::from(i % 3))).collect();
        let out = compute_volatility_metrics(&table_from(&prices), &[3]).unwrap();
        let vol = out.column("realized_vol_3").unwrap();
        assert!(vol[..3].iter().all(Option::is_none));
        assert!(vol[3].is_some());
        assert!(vol[3].unwrap() > 0.0);
    }

    #[test]
    fn parkinson_uses_high_low_range() {
        let prices = vec![100.0; 5];
        let out = compute_volatility_metrics(&table_from(&prices), &[3]).unwrap();
        let park = out.column("parkinson_vol_3").unwrap();
        assert_eq!(park[1], None);
        let expected = ((1.02_f64 / 0.98).ln().powi(2) / (4.0 * std::f64::consts::LN_2)).sqrt()
            * ANNUALIZATION_DAYS.sqrt();
        assert!((park[2].unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn score_is_bounded_and_uses_smallest_window() {
        let prices: Vec<f64> = (0..40)
            .map(|i| 100.0 + if i % 2 == 0 { f64::from(i) } else { -f64::from(i) / 2.0 })
            .collect();
        let out = compute_volatility_metrics(&table_from(&prices), &[14, 7]).unwrap();
        let score = out.column(columns::VOLATILITY_SCORE).unwrap();
        let realized = out.column("realized_vol_7").unwrap();
        assert_eq!(score[6], None);
        assert_eq!(realized[7].is_some(), score[7].is_some());
        assert!(score.iter().flatten().all(|s| (0.0..=100.0).contains(s)));
        assert!(score.iter().flatten().any(|s| (*s - 100.0).abs() < f64::EPSILON));
    }

    #[test]
    fn flat_prices_score_zero() {
        let out = compute_volatility_metrics(&table_from(&[5.0; 12]), &[3]).unwrap();
        let score = out.column(columns::VOLATILITY_SCORE).unwrap();
        assert!(score.iter().all(|s| *s == Some(0.0)));
    }

    #[test]
    fn missing_price_is_error() {
        let mut table = table_from(&[1.0, 2.0]);
        table.drop_column(columns::PRICE);
        assert_eq!(
            compute_volatility_metrics(&table, &[7]).unwrap_err(),
            PipelineError::MissingColumn("price".to_string())
        );
    }
}
