pub mod columns;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod observation;
pub mod rule;
pub mod table;
pub mod weights;

pub use config::{
    AlertConfig, FeatureConfig, FillMethod, KeepPolicy, MomentumConfig, NormalizeConfig,
    PipelineConfig, ResampleConfig,
};
pub use config_loader::ConfigLoader;
pub use error::{PipelineError, Result};
pub use observation::{Observation, RawObservation, RawTimestamp};
pub use rule::{AggConfig, Aggregation, AggregationSpec, ResampleRule};
pub use table::{AssetGroup, Column, RawTable, Series, Table, TableParts};
pub use weights::{RiskComponent, RiskWeights};
