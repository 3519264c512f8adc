//! Simple rolling statistics over price.

use crate::stage::{per_asset, FeatureStage};
use crate::window::RollingWindow;
use coinrisk_core::columns;
use coinrisk_core::{Result, Series, Table};

/// Default window sizes for rolling features.
pub const DEFAULT_WINDOWS: [usize; 3] = [7, 14, 30];

/// Adds `ma_w`, `std_w`, `return_w`, `min_w`, `max_w` and `ma_distance_w`
/// for every window.
///
/// Means, minima and maxima need one valid value, the standard deviation
/// two. Without a price column the input is returned unchanged.
///
/// # Errors
/// Returns `LengthMismatch` only if the table's columns are inconsistent.
pub fn compute_rolling_features(table: &Table, windows: &[usize]) -> Result<Table> {
    let Some(price) = table.column(columns::PRICE) else {
        tracing::warn!("No price column; skipping rolling features");
        return Ok(table.clone());
    };

    let groups = table.asset_groups();
    let mut out = table.clone();

    for &window in windows {
        let [ma, std, ret, min, max, distance] =
            per_asset(&groups, price, table.len(), |series| rolling_stats(series, window));
        out.set_column(columns::moving_average(window), ma)?;
        out.set_column(columns::rolling_std(window), std)?;
        out.set_column(columns::rolling_return(window), ret)?;
        out.set_column(columns::rolling_min(window), min)?;
        out.set_column(columns::rolling_max(window), max)?;
        out.set_column(columns::ma_distance(window), distance)?;
    }

    tracing::debug!(rows = table.len(), ?windows, "Computed rolling features");
    Ok(out)
}

fn rolling_stats(prices: &[Option<f64>], window: usize) -> [Series; 6] {
    let n = prices.len();
    let mut ma = Vec::with_capacity(n);
    let mut std = Vec::with_capacity(n);
    let mut ret = Vec::with_capacity(n);
    let mut min = Vec::with_capacity(n);
    let mut max = Vec::with_capacity(n);
    let mut distance = Vec::with_capacity(n);

    let mut acc = RollingWindow::new(window);
    for (t, &price) in prices.iter().enumerate() {
        acc.push(price);
        let mean = acc.mean(1);
        ma.push(mean);
        std.push(acc.std(1));
        min.push(acc.min());
        max.push(acc.max());
        distance.push(match (price, mean) {
            (Some(p), Some(m)) if m != 0.0 => Some((p - m) / m),
            _ => None,
        });
        ret.push(
            t.checked_sub(window)
                .and_then(|base| pct_change(prices[base], price)),
        );
    }

    [ma, std, ret, min, max, distance]
}

fn pct_change(base: Option<f64>, current: Option<f64>) -> Option<f64> {
    match (base, current) {
        (Some(b), Some(c)) if b != 0.0 => Some((c - b) / b),
        _ => None,
    }
}

/// Rolling statistics stage.
#[derive(Debug, Clone)]
pub struct RollingFeatures {
    windows: Vec<usize>,
}

impl RollingFeatures {
    #[must_use]
    pub fn new(windows: Vec<usize>) -> Self {
        Self { windows }
    }
}

impl Default for RollingFeatures {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOWS.to_vec())
    }
}

impl FeatureStage for RollingFeatures {
    fn name(&self) -> &'static str {
        "rolling"
    }

    fn apply(&self, table: &Table) -> Result<Table> {
        compute_rolling_features(table, &self.windows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use coinrisk_core::Observation;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn prices(asset: &str, values: &[f64]) -> Vec<Observation> {
        values
            .iter()
            .zip(1..)
            .map(|(p, day)| Observation::new(asset, ts(day), *p))
            .collect()
    }

    #[test]
    fn moving_average_and_return_over_three_rows() {
        let table: Table = Table::from_observations(&prices("btc", &[1.0, 2.0, 3.0, 4.0, 5.0]));
        let out = compute_rolling_features(&table, &[3]).unwrap();

        let ma = out.column("ma_3").unwrap();
        assert!((ma[4].unwrap() - 4.0).abs() < f64::EPSILON);
        assert!((ma[0].unwrap() - 1.0).abs() < f64::EPSILON);

        let ret = out.column("return_3").unwrap();
        assert_eq!(&ret[..3], &[None, None, None]);
        assert!((ret[4].unwrap() - 1.5).abs() < f64::EPSILON);

        assert_eq!(out.column("min_3").unwrap()[4], Some(3.0));
        assert_eq!(out.column("max_3").unwrap()[4], Some(5.0));
        assert!((out.column("ma_distance_3").unwrap()[4].unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn std_needs_two_values() {
        let table: Table = Table::from_observations(&prices("btc", &[2.0, 4.0, 6.0]));
        let out = compute_rolling_features(&table, &[7]).unwrap();
        let std = out.column("std_7").unwrap();
        assert_eq!(std[0], None);
        assert!((std[1].unwrap() - 2.0_f64.sqrt()).abs() < 1e-12);
        assert!((std[2].unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn windows_do_not_cross_assets() {
        let mut rows = prices("btc", &[100.0, 100.0]);
        rows.extend(prices("eth", &[10.0, 20.0]));
        let table: Table = Table::from_observations(&rows);
        let out = compute_rolling_features(&table, &[7]).unwrap();

        let ma = out.column("ma_7").unwrap();
        assert_eq!(ma[2], Some(10.0));
        assert_eq!(ma[3], Some(15.0));
    }

    #[test]
    fn missing_price_returns_input() {
        let table: Table = Table::from_observations(&prices("btc", &[1.0]));
        let mut without = table.clone();
        without.drop_column(columns::PRICE);
        let out = compute_rolling_features(&without, &[3]).unwrap();
        assert_eq!(out, without);
    }
}
