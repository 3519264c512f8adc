use crate::rule::{AggConfig, ResampleRule};
use crate::weights::RiskWeights;
use serde::{Deserialize, Serialize};

/// Full pipeline configuration.
///
/// Every stage still receives its parameters explicitly; this struct only
/// groups them so a driver can load them from one place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub normalize: NormalizeConfig,
    pub resample: ResampleConfig,
    pub features: FeatureConfig,
    pub weights: RiskWeights,
    pub alerts: AlertConfig,
}

/// How gaps are handled after sparse columns are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    /// Propagate the last known value forward
    #[default]
    ForwardFill,
    /// Propagate the next known value backward
    BackwardFill,
    /// Linear interpolation between known numeric values
    Interpolate,
    /// Drop any row with a missing cell
    Drop,
}

/// Which row of a duplicate set survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepPolicy {
    First,
    #[default]
    Last,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub fill_method: FillMethod,
    /// Columns missing more than this fraction of values are dropped
    pub missing_threshold: f64,
    pub keep: KeepPolicy,
    /// Clip raw market columns to be non-negative
    pub clip_non_negative: bool,
    /// Optional ceiling for implausible prices
    pub max_price: Option<f64>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            fill_method: FillMethod::ForwardFill,
            missing_threshold: 0.5,
            keep: KeepPolicy::Last,
            clip_non_negative: true,
            max_price: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    /// Bucket width; `None` leaves the series on its native timestamps
    pub rule: Option<ResampleRule>,
    pub aggregations: AggConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumConfig {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Rolling window sizes; the smallest one drives the volatility score
    pub windows: Vec<usize>,
    pub momentum: MomentumConfig,
    /// Trailing window for the worst-drawdown column
    pub drawdown_window: usize,
    /// Peg to measure `deviation_from_peg` against, for stablecoin tables
    pub peg: Option<f64>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            windows: vec![7, 14, 30],
            momentum: MomentumConfig::default(),
            drawdown_window: 30,
            peg: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Maximum tolerated absolute deviation from the peg
    pub threshold: f64,
    pub peg: f64,
    /// Restrict evaluation to these assets; empty means every asset
    pub assets: Vec<String>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            threshold: 0.01,
            peg: 1.0,
            assets: Vec::new(),
        }
    }
}

impl AlertConfig {
    /// Creates a config with the given threshold and the default 1.0 peg.
    #[must_use]
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    /// Returns true if the asset should be checked.
    #[must_use]
    pub fn covers(&self, asset_id: &str) -> bool {
        self.assets.is_empty() || self.assets.iter().any(|a| a.eq_ignore_ascii_case(asset_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.normalize.fill_method, FillMethod::ForwardFill);
        assert!((config.normalize.missing_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.normalize.keep, KeepPolicy::Last);
        assert!(config.resample.rule.is_none());
        assert_eq!(config.features.windows, vec![7, 14, 30]);
        assert_eq!(config.features.momentum.rsi_period, 14);
        assert_eq!(config.features.drawdown_window, 30);
        assert!((config.alerts.threshold - 0.01).abs() < f64::EPSILON);
        assert!((config.alerts.peg - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"resample": {"rule": "1 hour"}, "normalize": {"fill_method": "interpolate"}}"#,
        )
        .unwrap();
        assert_eq!(config.resample.rule, Some(ResampleRule::hourly()));
        assert_eq!(config.normalize.fill_method, FillMethod::Interpolate);
        assert_eq!(config.features, FeatureConfig::default());
    }

    #[test]
    fn alert_config_covers_listed_assets() {
        let all = AlertConfig::default();
        assert!(all.covers("anything"));

        let stable = AlertConfig {
            assets: vec!["dai".to_string(), "USDC".to_string()],
            ..AlertConfig::default()
        };
        assert!(stable.covers("DAI"));
        assert!(stable.covers("usdc"));
        assert!(!stable.covers("bitcoin"));
    }
}
