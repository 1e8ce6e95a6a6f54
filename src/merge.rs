//! Merging indicator tables into the price table
//!
//! An indicator table is prepared (raw `date` renamed to `Date`, value columns
//! renamed to their feature names, dates normalized) and then inner-joined on
//! `Date`. Rows whose date is missing from either side are dropped from the
//! result; that loss is logged, never reported as an error.

use crate::error::Result;
use crate::indicators::RAW_DATE;
use crate::table::{date_keys, has_column, normalize_dates, rename_if_present};
use crate::types::DATE;
use hashbrown::HashMap;
use polars::prelude::*;

/// Suffix given to indicator columns whose name is already taken
pub const DUPLICATE_SUFFIX: &str = "_right";

/// Rename the raw date and value columns and normalize the dates
pub fn prepare_indicator(table: DataFrame, renames: &[(&str, &str)]) -> Result<DataFrame> {
    let mut table = rename_if_present(table, RAW_DATE, DATE)?;
    for (old, new) in renames {
        table = rename_if_present(table, old, new)?;
    }
    normalize_dates(table, DATE)
}

/// Names of the indicator columns, i.e. everything but the join key
pub fn value_column_names(table: &DataFrame) -> Vec<String> {
    table
        .get_column_names()
        .into_iter()
        .filter(|name| *name != DATE)
        .map(str::to_string)
        .collect()
}

/// Inner join on `Date`, keeping the row order of `left`
///
/// Every right-hand row with a matching date is emitted, so a duplicated date
/// in `right` duplicates the left row. Right-hand columns that clash with an
/// existing left column get [`DUPLICATE_SUFFIX`].
pub fn inner_join_on_date(left: &DataFrame, right: &DataFrame) -> Result<DataFrame> {
    let left = normalize_dates(left.clone(), DATE)?;
    let right = normalize_dates(right.clone(), DATE)?;

    let mut index: HashMap<i32, Vec<IdxSize>> = HashMap::new();
    for (row, key) in date_keys(&right, DATE)?.into_iter().enumerate() {
        if let Some(key) = key {
            index.entry(key).or_default().push(row as IdxSize);
        }
    }

    let mut left_rows: Vec<IdxSize> = Vec::new();
    let mut right_rows: Vec<IdxSize> = Vec::new();
    for (row, key) in date_keys(&left, DATE)?.into_iter().enumerate() {
        if let Some(matches) = key.and_then(|k| index.get(&k)) {
            for right_row in matches {
                left_rows.push(row as IdxSize);
                right_rows.push(*right_row);
            }
        }
    }

    let joined_left = left.take(&IdxCa::from_vec("left", left_rows))?;
    let joined_right = right
        .drop(DATE)?
        .take(&IdxCa::from_vec("right", right_rows))?;

    let mut columns: Vec<Series> = Vec::with_capacity(joined_right.width());
    for series in joined_right.get_columns() {
        let mut series = series.clone();
        if has_column(&joined_left, series.name()) {
            let renamed = format!("{}{}", series.name(), DUPLICATE_SUFFIX);
            series.rename(&renamed);
        }
        columns.push(series);
    }

    let merged = joined_left.hstack(&columns)?;
    log::debug!(
        "Inner join on {}: left {} rows, right {} rows, merged {} rows",
        DATE,
        left.height(),
        right.height(),
        merged.height()
    );
    Ok(merged)
}

/// Prepare an indicator table and inner-join it onto `prices`
pub fn merge_indicator(prices: &DataFrame, indicator: DataFrame, renames: &[(&str, &str)]) -> Result<DataFrame> {
    let indicator = prepare_indicator(indicator, renames)?;
    inner_join_on_date(prices, &indicator)
}
