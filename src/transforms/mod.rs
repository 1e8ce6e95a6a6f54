//! Feature transforms
//!
//! Each transform consumes a table and its metadata and returns both updated
//! (see [`Transformed`]). Transforms in [`moving_average`] and [`technical`]
//! also take an [`IndicatorSource`](crate::indicators::IndicatorSource) and
//! merge fetched tables on `Date`; the others only look at the table itself.
//! [`FeaturePipeline`](crate::pipeline::FeaturePipeline) wraps all of them.

pub mod basic;
pub mod direction;
pub mod moving_average;
pub mod ohlc;
pub mod technical;
pub mod volatility;

pub use basic::{
    add_abs_percent_change, add_datepart, add_next_y, add_percent_change, add_previous_values,
    close_only, fill_nan, min_max_normalize,
};
pub use direction::{add_direction, classify, DirectionLabel, DirectionThresholds};
pub use moving_average::MovingAverageKind;
pub use ohlc::add_ohlc_avg;
pub use volatility::add_volatility;

use crate::error::Result;
use crate::metadata::{FeatureMetadata, Transformed};
use crate::table::with_difference;
use crate::types::OHLC;
use polars::prelude::DataFrame;

/// Optional distance features against a reference column
///
/// At most one mode applies per call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DiffMode {
    /// No distance columns
    #[default]
    None,
    /// `<column>_<reference>_Diff` for one price column
    Column(String),
    /// `<price>_<reference>_Diff` for each of Open, High, Low, Close
    Ohlc,
}

impl DiffMode {
    /// Build from the two boolean switches; `add_diff` wins when both are set
    pub fn from_flags(add_diff: bool, diff_col: &str, add_ohlc_diff: bool) -> Self {
        if add_diff {
            DiffMode::Column(diff_col.to_string())
        } else if add_ohlc_diff {
            DiffMode::Ohlc
        } else {
            DiffMode::None
        }
    }
}

/// Name of the distance column between a price column and a reference
pub fn diff_column_name(price: &str, reference: &str) -> String {
    format!("{}_{}_Diff", price, reference)
}

/// Add the distance columns selected by `mode` against `reference`
pub fn apply_diff(df: DataFrame, meta: FeatureMetadata, reference: &str, mode: &DiffMode) -> Result<Transformed> {
    let targets: Vec<&str> = match mode {
        DiffMode::None => Vec::new(),
        DiffMode::Column(column) => vec![column.as_str()],
        DiffMode::Ohlc => OHLC.to_vec(),
    };

    let mut df = df;
    let mut meta = meta;
    for target in targets {
        let name = diff_column_name(target, reference);
        df = with_difference(df, &name, target, reference)?;
        meta = meta.with_continuous(name);
    }
    Ok((df, meta))
}
