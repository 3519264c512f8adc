//! Command-line driver for the crypto risk scoring pipeline.

pub mod commands;
pub mod pipeline;

pub use pipeline::run_pipeline;
