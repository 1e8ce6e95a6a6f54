//! Ordered train/test split

use crate::error::{FeatureError, Result};
use polars::prelude::DataFrame;

/// Split into `(train, test)`; the first ⌊len × ratio⌋ rows are training data
///
/// Rows are not shuffled. `ratio` must be in (0, 1]; a ratio of 1 leaves the
/// test table empty.
pub fn split_data(df: &DataFrame, ratio: f64) -> Result<(DataFrame, DataFrame)> {
    if !(ratio > 0.0 && ratio <= 1.0) {
        return Err(FeatureError::InvalidSplitRatio(ratio));
    }

    let len = df.height();
    let train_size = ((len as f64) * ratio).floor() as usize;
    let train = df.slice(0, train_size);
    let test = df.slice(train_size as i64, len - train_size);

    log::debug!(
        "Split {} rows: {} training, {} testing",
        len,
        train.height(),
        test.height()
    );
    Ok((train, test))
}
