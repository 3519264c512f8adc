//! Composite risk score.
//!
//! Each of the four components is a 0-100 risk value where higher means
//! riskier. The composite is their weighted sum, clipped and rounded.

use coinrisk_core::columns;
use coinrisk_core::{Result, RiskComponent, RiskWeights, Series, Table};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value used for any component whose source column or cell is missing.
pub const NEUTRAL_COMPONENT: f64 = 50.0;

const SCORE_MIN: f64 = 0.0;
const SCORE_MAX: f64 = 100.0;

/// Coarse bucket of a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Buckets a score: below 35 is low, below 50 medium, otherwise high.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score < 35.0 {
            Self::Low
        } else if score < 50.0 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Momentum risk from RSI: distance outside the 30-70 band, doubled.
///
/// Returns the neutral component for a missing or non-finite RSI.
#[must_use]
pub fn momentum_risk(rsi: Option<f64>) -> f64 {
    let Some(rsi) = rsi.filter(|v| v.is_finite()) else {
        return NEUTRAL_COMPONENT;
    };
    let excess = if rsi < 30.0 {
        30.0 - rsi
    } else if rsi > 70.0 {
        rsi - 70.0
    } else {
        0.0
    };
    (excess * 2.0).clamp(SCORE_MIN, SCORE_MAX)
}

/// Per-row values of one component, with the neutral fallback applied.
pub(crate) fn component_values(table: &Table, component: RiskComponent) -> Vec<f64> {
    let rows = table.len();
    let inverted = |name: &str| -> Vec<f64> {
        match table.column(name) {
            Some(values) => values
                .iter()
                .map(|v| match v {
                    Some(v) if v.is_finite() => SCORE_MAX - v,
                    _ => NEUTRAL_COMPONENT,
                })
                .collect(),
            None => vec![NEUTRAL_COMPONENT; rows],
        }
    };

    match component {
        RiskComponent::Volatility => match table.column(columns::VOLATILITY_SCORE) {
            Some(values) => values
                .iter()
                .map(|v| v.filter(|v| v.is_finite()).unwrap_or(NEUTRAL_COMPONENT))
                .collect(),
            None => vec![NEUTRAL_COMPONENT; rows],
        },
        RiskComponent::Liquidity => inverted(columns::LIQUIDITY_SCORE),
        RiskComponent::Sentiment => inverted(columns::SENTIMENT_SCORE),
        RiskComponent::Momentum => match table.column(columns::RSI) {
            Some(values) => values.iter().map(|v| momentum_risk(*v)).collect(),
            None => vec![NEUTRAL_COMPONENT; rows],
        },
    }
}

/// Clamps every `*_score` column into `[0, 100]` in place, returning how
/// many cells changed.
fn clamp_score_columns(table: &mut Table) -> usize {
    let mut clamped = 0;
    for column in table.columns_mut() {
        if !columns::is_score(column.name()) {
            continue;
        }
        for value in column.values_mut() {
            if let Some(v) = value {
                if *v < SCORE_MIN || *v > SCORE_MAX {
                    *v = v.clamp(SCORE_MIN, SCORE_MAX);
                    clamped += 1;
                }
            }
        }
    }
    clamped
}

/// Adds `risk_score`, the weighted composite of the four risk components.
///
/// Existing `*_score` columns are clamped into `[0, 100]` before the
/// components are read, so the composite and every score column end up in
/// range for any non-negative weights. Components without a weight do not
/// contribute.
///
/// # Errors
/// Returns `InvalidWeight` if any weight is negative or not finite.
pub fn compute_risk_score(table: &Table, weights: &RiskWeights) -> Result<Table> {
    weights.validate()?;

    let mut out = table.clone();
    let clamped = clamp_score_columns(&mut out);
    if clamped > 0 {
        tracing::info!(clamped, "Clamped out-of-range score values");
    }

    let mut composite = vec![0.0; out.len()];
    for (component, weight) in weights.iter() {
        for (total, value) in composite.iter_mut().zip(component_values(&out, component)) {
            *total += weight * value;
        }
    }

    let risk: Series = composite
        .into_iter()
        .map(|score| Some(score.clamp(SCORE_MIN, SCORE_MAX).round_ties_even()))
        .collect();

    tracing::debug!(
        rows = out.len(),
        total_weight = weights.total(),
        "Computed risk scores"
    );
    out.set_column(columns::RISK_SCORE, risk)?;
    Ok(out)
}
