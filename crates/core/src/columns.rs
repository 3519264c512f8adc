//! Well-known column names.
//!
//! Input columns come from ingestion; derived columns are written by the
//! feature and scoring stages. Window-parameterized names are built with the
//! helper functions at the bottom.

pub const ASSET_ID: &str = "asset_id";
pub const TIMESTAMP: &str = "timestamp";
pub const SYMBOL: &str = "symbol";

pub const PRICE: &str = "price";
pub const VOLUME: &str = "volume";
pub const OPEN: &str = "open";
pub const HIGH: &str = "high";
pub const LOW: &str = "low";
pub const CLOSE: &str = "close";
pub const SENTIMENT_SCORE: &str = "sentiment_score";

pub const LOG_RETURN: &str = "log_return";
pub const VOLATILITY_SCORE: &str = "volatility_score";
pub const RSI: &str = "rsi";
pub const MACD: &str = "macd";
pub const MACD_SIGNAL: &str = "macd_signal";
pub const MACD_HISTOGRAM: &str = "macd_histogram";
pub const RUNNING_MAX: &str = "running_max";
pub const DRAWDOWN: &str = "drawdown";
pub const MAX_DRAWDOWN_30D: &str = "max_drawdown_30d";
pub const VOLUME_MA_7: &str = "volume_ma_7";
pub const VOLUME_MA_30: &str = "volume_ma_30";
pub const VOLUME_RATIO: &str = "volume_ratio";
pub const PRICE_VOLUME_CORR: &str = "price_volume_corr";
pub const OBV: &str = "obv";
pub const VOLUME_STABILITY: &str = "volume_stability";
pub const LIQUIDITY_SCORE: &str = "liquidity_score";
pub const DEVIATION_FROM_PEG: &str = "deviation_from_peg";
pub const RISK_SCORE: &str = "risk_score";

/// Suffix shared by every bounded score column.
pub const SCORE_SUFFIX: &str = "_score";

/// Raw market columns that can never be negative.
pub const NON_NEGATIVE: [&str; 6] = [PRICE, VOLUME, OPEN, HIGH, LOW, CLOSE];

#[must_use]
pub fn moving_average(window: usize) -> String {
    format!("ma_{window}")
}

#[must_use]
pub fn rolling_std(window: usize) -> String {
    format!("std_{window}")
}

#[must_use]
pub fn rolling_return(window: usize) -> String {
    format!("return_{window}")
}

#[must_use]
pub fn rolling_min(window: usize) -> String {
    format!("min_{window}")
}

#[must_use]
pub fn rolling_max(window: usize) -> String {
    format!("max_{window}")
}

#[must_use]
pub fn ma_distance(window: usize) -> String {
    format!("ma_distance_{window}")
}

#[must_use]
pub fn realized_vol(window: usize) -> String {
    format!("realized_vol_{window}")
}

#[must_use]
pub fn parkinson_vol(window: usize) -> String {
    format!("parkinson_vol_{window}")
}

/// Returns true if the column holds a bounded 0-100 score.
#[must_use]
pub fn is_score(name: &str) -> bool {
    name.ends_with(SCORE_SUFFIX)
}
