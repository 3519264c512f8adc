//! Stablecoin peg alerts.

use chrono::{DateTime, Utc};
use coinrisk_core::columns;
use coinrisk_core::{AlertConfig, Table};
use serde::Serialize;
use std::fmt;

/// An asset whose latest price sits outside the tolerated peg band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PegAlert {
    pub asset_id: String,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    /// `price - peg`, signed
    pub deviation: f64,
}

impl fmt::Display for PegAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} deviated from peg: ${:.4}", self.asset_id, self.price)
    }
}

/// Checks each asset's most recent price against the configured peg.
///
/// Emits one alert per asset whose `|price - peg|` exceeds the threshold.
/// Assets outside `config.assets` (when non-empty) and assets whose latest
/// row has no price are skipped. A table without a price column yields no
/// alerts.
#[must_use]
pub fn check_alerts(table: &Table, config: &AlertConfig) -> Vec<PegAlert> {
    let Some(price) = table.column(columns::PRICE) else {
        tracing::warn!("No price column; skipping peg alerts");
        return Vec::new();
    };

    let alerts: Vec<PegAlert> = table
        .asset_groups()
        .into_iter()
        .filter(|group| config.covers(&group.asset_id))
        .filter_map(|group| {
            let row = group.last_index()?;
            let price = price[row]?;
            let deviation = price - config.peg;
            (deviation.abs() > config.threshold).then(|| PegAlert {
                asset_id: group.asset_id,
                timestamp: table.timestamps()[row],
                price,
                deviation,
            })
        })
        .collect();

    for alert in &alerts {
        tracing::warn!(
            asset = %alert.asset_id,
            price = alert.price,
            deviation = alert.deviation,
            "Peg deviation above threshold"
        );
    }
    tracing::debug!(
        assets = table.assets().len(),
        alerts = alerts.len(),
        threshold = config.threshold,
        "Checked peg alerts"
    );
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use coinrisk_core::Observation;

    fn t(days: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(days)
    }

    #[test]
    fn depegged_stablecoin_raises_one_alert() {
        let table: Table = Table::from_observations(&[
            Observation::new("dai", t(0), 1.0),
            Observation::new("dai", t(1), 0.985),
            Observation::new("usdc", t(1), 1.0005),
        ]);
        let alerts = check_alerts(&table, &AlertConfig::default());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].asset_id, "dai");
        assert_eq!(alerts[0].timestamp, t(1));
        assert!((alerts[0].deviation + 0.015).abs() < 1e-12);
        assert_eq!(alerts[0].to_string(), "dai deviated from peg: $0.9850");
    }

    #[test]
    fn only_latest_row_counts() {
        let table: Table = Table::from_observations(&[
            Observation::new("usdt", t(1), 1.0),
            Observation::new("usdt", t(0), 0.90),
        ]);
        assert!(check_alerts(&table, &AlertConfig::default()).is_empty());
    }

    #[test]
    fn threshold_is_strict() {
        let table: Table = Table::from_observations(&[Observation::new("dai", t(0), 1.5)]);
        assert!(check_alerts(&table, &AlertConfig::with_threshold(0.5)).is_empty());
        assert_eq!(check_alerts(&table, &AlertConfig::with_threshold(0.49)).len(), 1);
    }

    #[test]
    fn empty_table_and_asset_filter() {
        let empty: Table = Table::default();
        assert!(check_alerts(&empty, &AlertConfig::default()).is_empty());

        let table: Table = Table::from_observations(&[
            Observation::new("dai", t(0), 0.9),
            Observation::new("bitcoin", t(0), 40000.0),
        ]);
        let config = AlertConfig {
            assets: vec!["DAI".to_string()],
            ..AlertConfig::default()
        };
        let alerts = check_alerts(&table, &config);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].asset_id, "dai");
    }

    #[test]
    fn missing_latest_price_is_skipped() {
        let table: Table = Table::from_observations(&[
            Observation::new("dai", t(0), 0.5),
            Observation::without_price("dai", t(1)),
        ]);
        assert!(check_alerts(&table, &AlertConfig::default()).is_empty());
    }

    #[test]
    fn alert_serializes() {
        let table: Table = Table::from_observations(&[Observation::new("dai", t(0), 0.985)]);
        let json = serde_json::to_value(check_alerts(&table, &AlertConfig::default())).unwrap();
        assert_eq!(json[0]["asset_id"], "dai");
        assert_eq!(json[0]["price"], 0.985);
        assert_eq!(json[0]["timestamp"], "2024-01-01T00:00:00Z");
    }
}
