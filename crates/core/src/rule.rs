//! Resample rules and bucket aggregations.

use crate::columns;
use crate::error::{PipelineError, Result};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SECOND: i64 = 1;
const MINUTE: i64 = 60 * SECOND;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;

/// Widest rule whose millisecond width still fits in an `i64`.
const MAX_SECONDS: i64 = i64::MAX / 1000;

/// Fixed bucket width used by the resampler.
///
/// Parses human and pandas-style strings: `"1 hour"`, `"1h"`, `"5min"`,
/// `"15T"`, `"1 day"`, `"1D"`, `"30s"`, `"1w"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResampleRule {
    seconds: i64,
}

impl ResampleRule {
    /// Creates a rule from a width in seconds.
    ///
    /// # Errors
    /// Returns `InvalidRule` if the width is not positive or too wide to
    /// express in milliseconds.
    pub fn from_seconds(seconds: i64) -> Result<Self> {
        if seconds <= 0 || seconds > MAX_SECONDS {
            return Err(PipelineError::InvalidRule(format!("{seconds}s")));
        }
        Ok(Self { seconds })
    }

    #[must_use]
    pub const fn hourly() -> Self {
        Self { seconds: HOUR }
    }

    #[must_use]
    pub const fn daily() -> Self {
        Self { seconds: DAY }
    }

    #[must_use]
    pub const fn seconds(&self) -> i64 {
        self.seconds
    }

    #[must_use]
    pub const fn millis(&self) -> i64 {
        self.seconds * 1000
    }

    #[must_use]
    pub fn width(&self) -> TimeDelta {
        TimeDelta::seconds(self.seconds)
    }
}

impl FromStr for ResampleRule {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        let split = text
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(text.len());
        let (count, unit) = text.split_at(split);

        let count: i64 = if count.is_empty() {
            1
        } else {
            count
                .parse()
                .map_err(|_| PipelineError::InvalidRule(s.to_string()))?
        };

        let unit_seconds = match unit.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => SECOND,
            "t" | "min" | "mins" | "minute" | "minutes" => MINUTE,
            "h" | "hr" | "hrs" | "hour" | "hours" => HOUR,
            "d" | "day" | "days" => DAY,
            "w" | "week" | "weeks" => WEEK,
            _ => return Err(PipelineError::InvalidRule(s.to_string())),
        };

        count
            .checked_mul(unit_seconds)
            .filter(|secs| (1..=MAX_SECONDS).contains(secs))
            .map(|seconds| Self { seconds })
            .ok_or_else(|| PipelineError::InvalidRule(s.to_string()))
    }
}

impl TryFrom<String> for ResampleRule {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ResampleRule> for String {
    fn from(rule: ResampleRule) -> Self {
        rule.to_string()
    }
}

impl fmt::Display for ResampleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.seconds;
        if s % WEEK == 0 {
            write!(f, "{}w", s / WEEK)
        } else if s % DAY == 0 {
            write!(f, "{}d", s / DAY)
        } else if s % HOUR == 0 {
            write!(f, "{}h", s / HOUR)
        } else if s % MINUTE == 0 {
            write!(f, "{}min", s / MINUTE)
        } else {
            write!(f, "{s}s")
        }
    }
}

/// How a bucket's values collapse into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    First,
    Last,
    Max,
    Min,
    Sum,
    Mean,
    Count,
}

impl FromStr for Aggregation {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            "sum" => Ok(Self::Sum),
            "mean" | "avg" => Ok(Self::Mean),
            "count" => Ok(Self::Count),
            other => Err(PipelineError::InvalidRule(format!(
                "unknown aggregation '{other}'"
            ))),
        }
    }
}

/// Aggregation applied to one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSpec {
    pub column: String,
    pub aggregation: Aggregation,
}

/// Ordered per-column aggregation config for the resampler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggConfig(Vec<AggregationSpec>);

impl Default for AggConfig {
    /// OHLCV conventions plus `price=mean` for spot-only series.
    fn default() -> Self {
        Self::empty()
            .with(columns::OPEN, Aggregation::First)
            .with(columns::HIGH, Aggregation::Max)
            .with(columns::LOW, Aggregation::Min)
            .with(columns::CLOSE, Aggregation::Last)
            .with(columns::VOLUME, Aggregation::Sum)
            .with(columns::PRICE, Aggregation::Mean)
    }
}

impl AggConfig {
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Adds or replaces the aggregation for a column.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, aggregation: Aggregation) -> Self {
        let column = column.into();
        if let Some(spec) = self.0.iter_mut().find(|s| s.column == column) {
            spec.aggregation = aggregation;
        } else {
            self.0.push(AggregationSpec {
                column,
                aggregation,
            });
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &AggregationSpec> {
        self.0.iter()
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<Aggregation> {
        self.0
            .iter()
            .find(|s| s.column == column)
            .map(|s| s.aggregation)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================
    // ResampleRule Tests
    // ============================================

    #[test]
    fn parses_human_rules() {
        assert_eq!("1 hour".parse::<ResampleRule>().unwrap().seconds(), 3600);
        assert_eq!("1 day".parse::<ResampleRule>().unwrap().seconds(), 86_400);
        assert_eq!("2 hours".parse::<ResampleRule>().unwrap().seconds(), 7200);
        assert_eq!("30 seconds".parse::<ResampleRule>().unwrap().seconds(), 30);
    }

    #[test]
    fn parses_pandas_rules() {
        assert_eq!("1h".parse::<ResampleRule>().unwrap().seconds(), 3600);
        assert_eq!("5min".parse::<ResampleRule>().unwrap().seconds(), 300);
        assert_eq!("15T".parse::<ResampleRule>().unwrap().seconds(), 900);
        assert_eq!("1D".parse::<ResampleRule>().unwrap().seconds(), 86_400);
        assert_eq!("H".parse::<ResampleRule>().unwrap().seconds(), 3600);
        assert_eq!("1w".parse::<ResampleRule>().unwrap().seconds(), 604_800);
    }

    #[test]
    fn rejects_bad_rules() {
        assert!("0h".parse::<ResampleRule>().is_err());
        assert!("1 fortnight".parse::<ResampleRule>().is_err());
        assert!("".parse::<ResampleRule>().is_err());
        assert!(ResampleRule::from_seconds(0).is_err());
    }

    #[test]
    fn rejects_rules_too_wide_for_millis() {
        assert!(matches!(
            "10000000000000d".parse::<ResampleRule>(),
            Err(PipelineError::InvalidRule(_))
        ));
        assert!(ResampleRule::from_seconds(MAX_SECONDS + 1).is_err());

        let widest = ResampleRule::from_seconds(MAX_SECONDS).unwrap();
        assert_eq!(widest.millis(), MAX_SECONDS * 1000);
    }

    #[test]
    fn displays_canonical_form() {
        assert_eq!(ResampleRule::hourly().to_string(), "1h");
        assert_eq!(ResampleRule::daily().to_string(), "1d");
        assert_eq!("90s".parse::<ResampleRule>().unwrap().to_string(), "90s");
        assert_eq!("15T".parse::<ResampleRule>().unwrap().to_string(), "15min");
    }

    #[test]
    fn rule_serde_uses_string_form() {
        let json = serde_json::to_string(&ResampleRule::hourly()).unwrap();
        assert_eq!(json, "\"1h\"");
        let parsed: ResampleRule = serde_json::from_str("\"1 day\"").unwrap();
        assert_eq!(parsed, ResampleRule::daily());
    }

    // ============================================
    // Aggregation Tests
    // ============================================

    #[test]
    fn default_agg_config_is_ohlcv_plus_price() {
        let config = AggConfig::default();
        assert_eq!(config.len(), 6);
        assert_eq!(config.get(columns::OPEN), Some(Aggregation::First));
        assert_eq!(config.get(columns::HIGH), Some(Aggregation::Max));
        assert_eq!(config.get(columns::LOW), Some(Aggregation::Min));
        assert_eq!(config.get(columns::CLOSE), Some(Aggregation::Last));
        assert_eq!(config.get(columns::VOLUME), Some(Aggregation::Sum));
        assert_eq!(config.get(columns::PRICE), Some(Aggregation::Mean));
    }

    #[test]
    fn with_replaces_existing_entry() {
        let config = AggConfig::default().with(columns::PRICE, Aggregation::Last);
        assert_eq!(config.len(), 6);
        assert_eq!(config.get(columns::PRICE), Some(Aggregation::Last));
    }

    #[test]
    fn aggregation_parses_pandas_names() {
        assert_eq!("mean".parse::<Aggregation>().unwrap(), Aggregation::Mean);
        assert_eq!("LAST".parse::<Aggregation>().unwrap(), Aggregation::Last);
        assert!("median".parse::<Aggregation>().is_err());
    }
}
