//! Composite risk scoring, per-asset summaries and peg alerts over feature
//! tables produced by `coinrisk-features`.

pub mod alerts;
pub mod risk;
pub mod summary;

pub use alerts::{check_alerts, PegAlert};
pub use risk::{compute_risk_score, momentum_risk, RiskLevel, NEUTRAL_COMPONENT};
pub use summary::{summarize_latest, AssetRiskSummary};
