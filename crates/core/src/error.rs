//! Error type shared by every pipeline stage.

use thiserror::Error;

/// Errors surfaced synchronously by pipeline stages.
///
/// Absent optional columns are not errors: stages fall back to neutral
/// constants instead. Only inputs a stage cannot work around end up here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// A timestamp value could not be interpreted.
    #[error("Malformed timestamp: {value}")]
    MalformedTimestamp { value: String },

    /// A column the operation requires is not present.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A resample rule string could not be parsed.
    #[error("Invalid resample rule: {0}")]
    InvalidRule(String),

    /// A risk weight is negative or not finite.
    #[error("Invalid weight {weight} for component {component}")]
    InvalidWeight { component: String, weight: f64 },

    /// A column was supplied with the wrong number of rows.
    #[error("Column {column} has {actual} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

impl PipelineError {
    /// Builds a `MalformedTimestamp` error from any displayable value.
    pub fn malformed_timestamp(value: impl std::fmt::Display) -> Self {
        Self::MalformedTimestamp {
            value: value.to_string(),
        }
    }

    /// Builds a `MissingColumn` error.
    pub fn missing_column(name: impl Into<String>) -> Self {
        Self::MissingColumn(name.into())
    }
}

/// Result alias used across the pipeline crates.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_timestamp_message_includes_value() {
        let err = PipelineError::malformed_timestamp("not-a-date");
        assert_eq!(err.to_string(), "Malformed timestamp: not-a-date");
    }

    #[test]
    fn missing_column_message_includes_name() {
        let err = PipelineError::missing_column("price");
        assert_eq!(err.to_string(), "Missing column: price");
    }

    #[test]
    fn invalid_weight_message() {
        let err = PipelineError::InvalidWeight {
            component: "volatility".to_string(),
            weight: -0.5,
        };
        assert!(err.to_string().contains("volatility"));
        assert!(err.to_string().contains("-0.5"));
    }
}
