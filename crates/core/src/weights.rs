//! Risk component weights.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One dimension of the composite risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskComponent {
    Volatility,
    Liquidity,
    Sentiment,
    Momentum,
}

impl RiskComponent {
    pub const ALL: [Self; 4] = [
        Self::Volatility,
        Self::Liquidity,
        Self::Sentiment,
        Self::Momentum,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Volatility => "volatility",
            Self::Liquidity => "liquidity",
            Self::Sentiment => "sentiment",
            Self::Momentum => "momentum",
        }
    }
}

impl fmt::Display for RiskComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskComponent {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "volatility" => Ok(Self::Volatility),
            "liquidity" => Ok(Self::Liquidity),
            "sentiment" => Ok(Self::Sentiment),
            "momentum" => Ok(Self::Momentum),
            other => Err(PipelineError::InvalidWeight {
                component: other.to_string(),
                weight: f64::NAN,
            }),
        }
    }
}

/// Weight per risk component.
///
/// Only components present in the map contribute to the composite. Weights
/// need not sum to one; the scorer clamps the composite regardless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskWeights(BTreeMap<RiskComponent, f64>);

impl Default for RiskWeights {
    fn default() -> Self {
        Self(BTreeMap::from([
            (RiskComponent::Volatility, 0.35),
            (RiskComponent::Liquidity, 0.25),
            (RiskComponent::Sentiment, 0.20),
            (RiskComponent::Momentum, 0.20),
        ]))
    }
}

impl RiskWeights {
    /// Creates an empty weight map (every composite is then 0).
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Sets one component's weight.
    #[must_use]
    pub fn with(mut self, component: RiskComponent, weight: f64) -> Self {
        self.0.insert(component, weight);
        self
    }

    /// Builds weights from string-keyed pairs such as a parsed JSON object.
    ///
    /// # Errors
    /// Returns `InvalidWeight` for unknown component names or invalid weights.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut weights = Self::empty();
        for (name, weight) in pairs {
            let component: RiskComponent = name.parse()?;
            weights.0.insert(component, weight);
        }
        weights.validate()?;
        Ok(weights)
    }

    #[must_use]
    pub fn get(&self, component: RiskComponent) -> Option<f64> {
        self.0.get(&component).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RiskComponent, f64)> + '_ {
        self.0.iter().map(|(c, w)| (*c, *w))
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    /// Checks every weight is finite and non-negative.
    ///
    /// # Errors
    /// Returns `InvalidWeight` naming the first offending component.
    pub fn validate(&self) -> Result<()> {
        for (component, weight) in self.iter() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(PipelineError::InvalidWeight {
                    component: component.to_string(),
                    weight,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_match_documented_split() {
        let weights = RiskWeights::default();
        assert_eq!(weights.get(RiskComponent::Volatility), Some(0.35));
        assert_eq!(weights.get(RiskComponent::Liquidity), Some(0.25));
        assert_eq!(weights.get(RiskComponent::Sentiment), Some(0.20));
        assert_eq!(weights.get(RiskComponent::Momentum), Some(0.20));
        assert!((weights.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn from_pairs_parses_names() {
        let weights = RiskWeights::from_pairs([("Volatility", 1.0), ("momentum", 0.5)]).unwrap();
        assert_eq!(weights.get(RiskComponent::Volatility), Some(1.0));
        assert_eq!(weights.get(RiskComponent::Momentum), Some(0.5));
        assert_eq!(weights.get(RiskComponent::Liquidity), None);
    }

    #[test]
    fn from_pairs_rejects_unknown_component() {
        let err = RiskWeights::from_pairs([("onchain", 0.1)]).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidWeight { component, .. } if component == "onchain"));
    }

    #[test]
    fn validate_rejects_negative_and_nan() {
        let negative = RiskWeights::empty().with(RiskComponent::Liquidity, -0.1);
        assert!(negative.validate().is_err());

        let nan = RiskWeights::empty().with(RiskComponent::Liquidity, f64::NAN);
        assert!(nan.validate().is_err());
    }

    #[test]
    fn weights_serialize_as_plain_map() {
        let json = serde_json::to_string(&RiskWeights::default()).unwrap();
        assert!(json.contains("\"volatility\":0.35"));

        let parsed: RiskWeights = serde_json::from_str(r#"{"sentiment": 2.0}"#).unwrap();
        assert_eq!(parsed.get(RiskComponent::Sentiment), Some(2.0));
        assert_eq!(parsed.get(RiskComponent::Volatility), None);
    }
}
