//! # ohlcv-features
//!
//! Feature engineering for daily OHLCV price tables.
//!
//! A price table is extended with technical-indicator columns (moving
//! averages, momentum, oscillators, volatility, Bollinger bands), percentage
//! changes and categorical direction labels. Every transform returns the new
//! table together with [`FeatureMetadata`](metadata::FeatureMetadata), which
//! lists the continuous and categorical columns for model training.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ohlcv_features::prelude::*;
//! use std::path::Path;
//!
//! fn main() -> Result<()> {
//!     let prices = load_price_csv(Path::new("AMZN.csv"), false)?;
//!     let pipeline = FeaturePipeline::new(
//!         CsvIndicatorCache::new("cache"),
//!         PipelineConfig::default(),
//!     )?;
//!
//!     let steps = parse_steps(["close-pct", "direction:Close", "ma:ema:10:ohlc", "macd"])?;
//!     let (table, meta) = pipeline.run(prices, &Ticker::from("AMZN"), &steps)?;
//!     println!("{} rows, {} features", table.height(), meta.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod indicators;
pub mod ingest;
pub mod merge;
pub mod metadata;
pub mod pipeline;
pub mod split;
pub mod table;
pub mod transforms;
pub mod types;
pub mod variance;

pub mod prelude {
    //! Commonly used types and functions
    pub use crate::config::PipelineConfig;
    pub use crate::error::{FeatureError, Result};
    pub use crate::indicators::{CsvIndicatorCache, InMemoryIndicatorCache, IndicatorKind, IndicatorSource};
    pub use crate::ingest::{load_price_csv, rename_vendor_columns};
    pub use crate::merge::merge_indicator;
    pub use crate::metadata::{FeatureMetadata, Transformed};
    pub use crate::pipeline::{parse_steps, FeaturePipeline, FeatureStep};
    pub use crate::split::split_data;
    pub use crate::transforms::moving_average::{MovingAverage, MovingAverageKind};
    pub use crate::transforms::{DiffMode, DirectionLabel};
    pub use crate::types::*;
    pub use crate::variance::OnlineVariance;
}
