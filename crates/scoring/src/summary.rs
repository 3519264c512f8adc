use crate::risk::{component_values, RiskLevel};
use chrono::{DateTime, Utc};
use coinrisk_core::columns;
use coinrisk_core::{RiskComponent, Table};
use serde::Serialize;
use std::collections::BTreeMap;

/// Risk snapshot of one asset at its most recent observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetRiskSummary {
    pub asset_id: String,
    pub timestamp: DateTime<Utc>,
    pub price: Option<f64>,
    pub risk_score: Option<f64>,
    pub level: Option<RiskLevel>,
    pub components: BTreeMap<RiskComponent, f64>,
}

/// Summarizes each asset's latest row, in order of first appearance.
///
/// `risk_score` and `level` are `None` when the table has not been scored.
#[must_use]
pub fn summarize_latest(table: &Table) -> Vec<AssetRiskSummary> {
    let components: Vec<(RiskComponent, Vec<f64>)> = RiskComponent::ALL
        .into_iter()
        .map(|c| (c, component_values(table, c)))
        .collect();
    let price = table.column(columns::PRICE);
    let risk = table.column(columns::RISK_SCORE);

    table
        .asset_groups()
        .into_iter()
        .filter_map(|group| {
            let row = group.last_index()?;
            let risk_score = risk.and_then(|r| r[row]);
            Some(AssetRiskSummary {
                timestamp: table.timestamps()[row],
                price: price.and_then(|p| p[row]),
                risk_score,
                level: risk_score.map(RiskLevel::from_score),
                components: components.iter().map(|(c, v)| (*c, v[row])).collect(),
                asset_id: group.asset_id,
            })
        })
        .collect()
}
