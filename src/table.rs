//! Price table helpers on top of polars data frames
//!
//! Missing values are represented as polars nulls; derived columns are built
//! from `Vec<Option<f64>>` so the first row of any shift stays missing.

use crate::error::{FeatureError, Result};
use crate::types::{Bar, CLOSE, DATE, HIGH, LOW, OPEN, VOLUME};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;

/// Days between 0001-01-01 (CE day 1) and 1970-01-01
const UNIX_EPOCH_FROM_CE: i32 = 719_163;

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%Y%m%d"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Check whether the table has a column with the given name
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| *c == name)
}

/// Get a column, mapping absence to [`FeatureError::MissingColumn`]
pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map_err(|_| FeatureError::MissingColumn(name.to_string()))
}

/// Read a numeric column as floats
pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = require_column(df, name)?;
    if !series.dtype().is_numeric() {
        return Err(FeatureError::NonNumericColumn(name.to_string()));
    }
    let series = series.cast(&DataType::Float64)?;
    let values = series.f64()?.into_iter().collect();
    Ok(values)
}

/// Insert or replace a float column
pub fn put_f64_column(mut df: DataFrame, name: &str, values: Vec<Option<f64>>) -> Result<DataFrame> {
    df.with_column(Series::new(name, values))?;
    Ok(df)
}

/// Percentage change `value[t] / value[t-1] - 1`; the first row is missing
///
/// Gaps are padded with the last seen value first, so a missing row gets a
/// zero change and the row after it is measured against the last value.
/// Rows before the first value stay missing.
pub fn pct_change(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut last: Option<f64> = None;
    for current in values {
        let current = current.or(last);
        out.push(match (last, current) {
            (Some(p), Some(c)) => Some(c / p - 1.0),
            _ => None,
        });
        last = current;
    }
    out
}

/// Element-wise `left - right`
pub fn difference(left: &[Option<f64>], right: &[Option<f64>]) -> Vec<Option<f64>> {
    left.iter()
        .zip(right.iter())
        .map(|(l, r)| match (l, r) {
            (Some(l), Some(r)) => Some(l - r),
            _ => None,
        })
        .collect()
}

/// Add `<target> - <reference>` as a new column
pub fn with_difference(df: DataFrame, name: &str, target: &str, reference: &str) -> Result<DataFrame> {
    let diff = difference(&f64_values(&df, target)?, &f64_values(&df, reference)?);
    put_f64_column(df, name, diff)
}

/// Build a base price table from bars
pub fn from_bars(bars: &[Bar]) -> Result<DataFrame> {
    let days: Vec<i32> = bars.iter().map(|b| days_since_epoch(b.date)).collect();
    let dates = Series::new(DATE, days).cast(&DataType::Date)?;

    let df = DataFrame::new(vec![
        Series::new(OPEN, bars.iter().map(|b| b.open).collect::<Vec<_>>()),
        Series::new(HIGH, bars.iter().map(|b| b.high).collect::<Vec<_>>()),
        Series::new(LOW, bars.iter().map(|b| b.low).collect::<Vec<_>>()),
        Series::new(CLOSE, bars.iter().map(|b| b.close).collect::<Vec<_>>()),
        Series::new(VOLUME, bars.iter().map(|b| b.volume).collect::<Vec<_>>()),
        dates,
    ])?;
    Ok(df)
}

/// Days since 1970-01-01, the physical representation of a polars date
pub fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_FROM_CE
}

/// Inverse of [`days_since_epoch`]
pub fn date_from_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_FROM_CE)
}

/// Read a normalized date column as day numbers
pub fn date_keys(df: &DataFrame, name: &str) -> Result<Vec<Option<i32>>> {
    let series = require_column(df, name)?;
    if series.dtype() != &DataType::Date {
        return Err(FeatureError::DateParse(format!(
            "column '{}' has type {} and must be normalized first",
            name,
            series.dtype()
        )));
    }
    let series = series.cast(&DataType::Int32)?;
    let keys = series.i32()?.into_iter().collect();
    Ok(keys)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DateFormat {
    Date(&'static str),
    DateTime(&'static str),
}

impl DateFormat {
    fn parse(self, text: &str) -> Option<NaiveDate> {
        match self {
            DateFormat::Date(fmt) => NaiveDate::parse_from_str(text, fmt).ok(),
            DateFormat::DateTime(fmt) => NaiveDateTime::parse_from_str(text, fmt)
                .ok()
                .map(|dt| dt.date()),
        }
    }
}

/// Pick the first known format that parses the sample
fn infer_date_format(sample: &str) -> Option<DateFormat> {
    DATE_FORMATS
        .into_iter()
        .map(DateFormat::Date)
        .chain(DATETIME_FORMATS.into_iter().map(DateFormat::DateTime))
        .find(|format| format.parse(sample).is_some())
}

/// Parse a single date string with an inferred format
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    infer_date_format(text)
        .and_then(|format| format.parse(text))
        .ok_or_else(|| FeatureError::DateParse(format!("unrecognized date '{}'", text)))
}

/// Coerce a date column to the polars `Date` type
///
/// Text columns are parsed with the format inferred from their first
/// non-missing value; datetimes are truncated to the day.
pub fn normalize_dates(mut df: DataFrame, name: &str) -> Result<DataFrame> {
    let series = require_column(&df, name)?;

    let normalized = match series.dtype() {
        DataType::Date => return Ok(df),
        DataType::Datetime(_, _) => series.cast(&DataType::Date)?,
        DataType::String => {
            let text = series.str()?;
            let format = match text.into_iter().flatten().next() {
                Some(sample) => infer_date_format(sample.trim()).ok_or_else(|| {
                    FeatureError::DateParse(format!(
                        "cannot infer date format of '{}' in column '{}'",
                        sample, name
                    ))
                })?,
                None => DateFormat::Date(DATE_FORMATS[0]),
            };

            let mut days = Vec::with_capacity(text.len());
            for value in text.into_iter() {
                days.push(match value {
                    Some(raw) => {
                        let date = format.parse(raw.trim()).ok_or_else(|| {
                            FeatureError::DateParse(format!(
                                "'{}' in column '{}' does not match the inferred format",
                                raw, name
                            ))
                        })?;
                        Some(days_since_epoch(date))
                    }
                    None => None,
                });
            }
            Series::new(name, days).cast(&DataType::Date)?
        }
        other => {
            return Err(FeatureError::DateParse(format!(
                "column '{}' has type {} which is not a date",
                name, other
            )))
        }
    };

    df.with_column(normalized)?;
    Ok(df)
}

/// Rename a column when present; absent columns are ignored
pub fn rename_if_present(mut df: DataFrame, old: &str, new: &str) -> Result<DataFrame> {
    if old != new && has_column(&df, old) {
        df.rename(old, new)?;
    }
    Ok(df)
}
