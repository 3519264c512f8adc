//! Volume indicators.

use crate::stage::FeatureStage;
use crate::window::{RollingCorrelation, RollingWindow};
use coinrisk_core::columns;
use coinrisk_core::{Result, Series, Table};

const SHORT_WINDOW: usize = 7;
const LONG_WINDOW: usize = 30;

/// Adds `volume_ma_7`, `volume_ma_30`, `volume_ratio`, `price_volume_corr`
/// and `obv`. Tables without a volume column are returned unchanged; the
/// price-based columns are skipped when price is absent.
///
/// # Errors
/// Returns `LengthMismatch` only if the table's columns are inconsistent.
pub fn compute_volume_features(table: &Table) -> Result<Table> {
    let Some(volume) = table.column(columns::VOLUME) else {
        tracing::debug!("No volume column; skipping volume features");
        return Ok(table.clone());
    };
    let price = table.column(columns::PRICE);
    let rows = table.len();

    let mut ma_short: Series = vec![None; rows];
    let mut ma_long: Series = vec![None; rows];
    let mut ratio: Series = vec![None; rows];
    let mut corr: Series = vec![None; rows];
    let mut obv: Series = vec![None; rows];

    for group in table.asset_groups() {
        let v = group.gather(volume);
        let (short, long) = (moving_average(&v, SHORT_WINDOW), moving_average(&v, LONG_WINDOW));
        let r: Series = v
            .iter()
            .zip(&long)
            .map(|(v, m)| match (v, m) {
                (Some(v), Some(m)) if *m != 0.0 => Some(v / m),
                _ => None,
            })
            .collect();
        group.scatter(&mut ma_short, &short);
        group.scatter(&mut ma_long, &long);
        group.scatter(&mut ratio, &r);

        if let Some(price) = price {
            let p = group.gather(price);
            group.scatter(&mut corr, &price_volume_correlation(&p, &v, LONG_WINDOW));
            group.scatter(&mut obv, &on_balance_volume(&p, &v));
        }
    }

    let mut out = table
        .clone()
        .with_column(columns::VOLUME_MA_7, ma_short)?
        .with_column(columns::VOLUME_MA_30, ma_long)?
        .with_column(columns::VOLUME_RATIO, ratio)?;
    if price.is_some() {
        out.set_column(columns::PRICE_VOLUME_CORR, corr)?;
        out.set_column(columns::OBV, obv)?;
    }

    tracing::debug!(rows, "Computed volume features");
    Ok(out)
}

fn moving_average(values: &[Option<f64>], window: usize) -> Series {
    let mut acc = RollingWindow::new(window);
    values
        .iter()
        .map(|&v| {
            acc.push(v);
            acc.mean(1)
        })
        .collect()
}

fn price_volume_correlation(price: &[Option<f64>], volume: &[Option<f64>], window: usize) -> Series {
    let mut acc = RollingCorrelation::new(window);
    price
        .iter()
        .zip(volume)
        .map(|(&p, &v)| {
            acc.push(p, v);
            acc.correlation()
        })
        .collect()
}

/// Cumulative `sign(Δprice) × volume`; the first row and flat or missing
/// moves contribute nothing.
#[must_use]
pub fn on_balance_volume(price: &[Option<f64>], volume: &[Option<f64>]) -> Series {
    let mut total = 0.0;
    let mut previous: Option<f64> = None;
    price
        .iter()
        .zip(volume)
        .map(|(&p, &v)| {
            let direction = match (previous, p) {
                (Some(a), Some(b)) if b > a => 1.0,
                (Some(a), Some(b)) if b < a => -1.0,
                _ => 0.0,
            };
            if p.is_some() {
                previous = p;
            }
            total += direction * v.unwrap_or(0.0);
            Some(total)
        })
        .collect()
}

/// Volume stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeFeatures;

impl FeatureStage for VolumeFeatures {
    fn name(&self) -> &'static str {
        "volume"
    }

    fn apply(&self, table: &Table) -> Result<Table> {
        compute_volume_features(table)
    }
}
