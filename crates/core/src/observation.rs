//! Row-oriented observation types.
//!
//! Ingestion collaborators usually think in rows (one decoded API record per
//! observation). These types let them build a [`Table`](crate::Table) without
//! touching the columnar layout directly.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A timestamp exactly as it arrived from a data provider.
///
/// Providers disagree on encodings: CoinGecko hands out epoch milliseconds,
/// some exchanges use epoch seconds, CSV exports carry ISO strings.
/// `normalize_timestamps` in the data crate resolves all of them to UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    /// Epoch seconds or milliseconds, decided per column.
    Numeric(f64),
    /// A textual timestamp to be parsed.
    Text(String),
    /// A timestamp without zone information, assumed to be UTC.
    Naive(NaiveDateTime),
    /// A timestamp carrying an explicit offset.
    Zoned(DateTime<FixedOffset>),
    /// Already UTC.
    Utc(DateTime<Utc>),
}

impl fmt::Display for RawTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Naive(dt) => write!(f, "{dt}"),
            Self::Zoned(dt) => write!(f, "{}", dt.to_rfc3339()),
            Self::Utc(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

impl From<i64> for RawTimestamp {
    fn from(value: i64) -> Self {
        Self::Numeric(value as f64)
    }
}

impl From<f64> for RawTimestamp {
    fn from(value: f64) -> Self {
        Self::Numeric(value)
    }
}

impl From<&str> for RawTimestamp {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawTimestamp {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDateTime> for RawTimestamp {
    fn from(value: NaiveDateTime) -> Self {
        Self::Naive(value)
    }
}

impl From<DateTime<FixedOffset>> for RawTimestamp {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::Zoned(value)
    }
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Utc(value)
    }
}

/// One price/volume observation for an asset.
///
/// Generic over the timestamp type so the same struct serves raw ingestion
/// (`RawObservation`) and normalized rows (`Observation`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation<T = DateTime<Utc>> {
    /// Asset identifier (e.g., "bitcoin", "dai")
    pub asset_id: String,
    /// Observation time
    pub timestamp: T,
    /// Spot price; `None` only for gaps awaiting missing-value handling
    pub price: Option<f64>,
    /// Traded volume over the observation period
    pub volume: Option<f64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    /// Ticker symbol (e.g., "BTC")
    pub symbol: Option<String>,
    /// Additional numeric inputs such as an externally computed `sentiment_score`
    #[serde(default)]
    pub extra: BTreeMap<String, f64>,
}

/// An observation whose timestamp has not been normalized yet.
pub type RawObservation = Observation<RawTimestamp>;

impl<T> Observation<T> {
    /// Creates an observation carrying only a price.
    pub fn new(asset_id: impl Into<String>, timestamp: impl Into<T>, price: f64) -> Self {
        Self {
            asset_id: asset_id.into(),
            timestamp: timestamp.into(),
            price: Some(price),
            volume: None,
            open: None,
            high: None,
            low: None,
            close: None,
            symbol: None,
            extra: BTreeMap::new(),
        }
    }

    /// Creates an observation whose price is missing.
    pub fn without_price(asset_id: impl Into<String>, timestamp: impl Into<T>) -> Self {
        let mut obs = Self::new(asset_id, timestamp, 0.0);
        obs.price = None;
        obs
    }

    #[must_use]
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Sets the intra-period high and low.
    #[must_use]
    pub fn with_high_low(mut self, high: f64, low: f64) -> Self {
        self.high = Some(high);
        self.low = Some(low);
        self
    }

    /// Sets the period open and close.
    #[must_use]
    pub fn with_open_close(mut self, open: f64, close: f64) -> Self {
        self.open = Some(open);
        self.close = Some(close);
        self
    }

    #[must_use]
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Attaches an additional named numeric input.
    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.extra.insert(name.into(), value);
        self
    }
}
