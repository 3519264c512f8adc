//! Feature derivation for normalized crypto price/volume tables.
//!
//! Every function works per asset over the chronological series and never
//! looks ahead, except the volatility and liquidity scores, which scale by a
//! percentile taken over each asset's whole series.

pub mod drawdown;
pub mod engine;
pub mod liquidity;
pub mod momentum;
pub mod peg;
pub mod rolling;
mod stage;
pub mod volatility;
pub mod volume;
pub mod window;

pub use drawdown::{compute_drawdown, Drawdown};
pub use engine::FeatureEngine;
pub use liquidity::{compute_liquidity_proxy, LiquidityProxy};
pub use momentum::{compute_momentum_indicators, macd, rsi, MomentumIndicators};
pub use peg::{compute_peg_deviation, PegDeviation};
pub use rolling::{compute_rolling_features, RollingFeatures};
pub use stage::FeatureStage;
pub use volatility::{compute_volatility_metrics, log_returns, VolatilityMetrics};
pub use volume::{compute_volume_features, on_balance_volume, VolumeFeatures};
pub use window::{ema, quantile, RollingCorrelation, RollingWindow};
