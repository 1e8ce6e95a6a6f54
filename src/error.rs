//! Error types for ohlcv-features

use thiserror::Error;

/// Main error type for the feature pipeline
#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid split ratio {0}: must be in (0, 1]")]
    InvalidSplitRatio(f64),

    #[error("Indicator {kind} unavailable for {ticker} (period {period})")]
    IndicatorUnavailable {
        kind: String,
        ticker: String,
        period: u32,
    },

    #[error("Date parse error: {0}")]
    DateParse(String),

    #[error("Invalid pipeline step: {0}")]
    InvalidStep(String),

    #[error("Column '{0}' is not numeric")]
    NonNumericColumn(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Result type alias for feature pipeline operations
pub type Result<T> = std::result::Result<T, FeatureError>;
