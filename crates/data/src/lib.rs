//! Data preparation and storage for the risk scoring pipeline.
//!
//! This crate provides:
//! - Normalization of raw observation tables (timestamps, duplicates, gaps, ranges)
//! - Fixed-frequency resampling
//! - CSV, JSON and Parquet storage utilities

pub mod csv_storage;
pub mod json_storage;
pub mod normalize;
pub mod parquet_storage;
pub mod resample;

use anyhow::Result;
use coinrisk_core::Table;
use std::path::Path;

// Re-export commonly used types
pub use csv_storage::CsvStorage;
pub use json_storage::JsonStorage;
pub use normalize::{
    handle_missing_values, normalize, normalize_timestamps, remove_duplicates,
    sort_chronologically, standardize_symbols, validate_numeric_range, Deduplicated,
};
pub use parquet_storage::{partition_path, ParquetStorage};
pub use resample::{resample, resample_with_config};

/// Output format for a scored table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageFormat {
    Csv,
    Json,
    Parquet,
}

impl StorageFormat {
    /// Guesses the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "parquet" | "pq" => Some(Self::Parquet),
            _ => None,
        }
    }

    /// Writes a table in this format.
    ///
    /// # Errors
    /// Returns error if the file cannot be written.
    pub fn write(self, path: &Path, table: &Table) -> Result<()> {
        match self {
            Self::Csv => CsvStorage::write_table(path, table),
            Self::Json => JsonStorage::write_table(path, table),
            Self::Parquet => ParquetStorage::write_table(path, table),
        }
    }
}
