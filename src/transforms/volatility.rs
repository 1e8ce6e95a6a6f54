//! Volatility feature
//!
//! One [`OnlineVariance`] estimator per column is fed every lagged copy of the
//! column for lags `0..window`. The resulting standard deviation is a single
//! figure for the whole series and is written to every row.

use crate::error::{FeatureError, Result};
use crate::metadata::{FeatureMetadata, Transformed};
use crate::table::{f64_values, put_f64_column};
use crate::variance::OnlineVariance;
use polars::prelude::DataFrame;

/// One trading year
pub const DEFAULT_VOLATILITY_WINDOW: usize = 255;

/// Column name of the volatility of `column`
pub fn volatility_column_name(column: &str) -> String {
    format!("{}-volatility", column)
}

/// Standard deviation over all lagged copies of `values`
///
/// Lag `n` contributes `values[0..len - n]`; rows shifted in from before the
/// start of the series, and missing values, are skipped.
pub fn lagged_volatility(values: &[Option<f64>], window: usize) -> f64 {
    let mut estimator = OnlineVariance::new();
    for lag in 0..window.min(values.len()) {
        estimator.extend(values[..values.len() - lag].iter().flatten().copied());
    }
    estimator.std()
}

/// Add `<column>-volatility`, one value broadcast to every row
pub fn add_volatility(df: DataFrame, meta: FeatureMetadata, column: &str, window: usize) -> Result<Transformed> {
    if window == 0 {
        return Err(FeatureError::InvalidParameter("volatility window must be positive".into()));
    }

    let volatility = lagged_volatility(&f64_values(&df, column)?, window);
    log::debug!("{} volatility over {} lags: {}", column, window, volatility);

    let name = volatility_column_name(column);
    let values = vec![Some(volatility); df.height()];
    let df = put_f64_column(df, &name, values)?;
    Ok((df, meta.with_continuous(name)))
}
