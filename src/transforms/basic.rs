//! Table-only transforms: changes, lags, date parts, cleaning and scaling

use crate::error::{FeatureError, Result};
use crate::metadata::{FeatureMetadata, Transformed};
use crate::table::{
    date_from_days, date_keys, days_since_epoch, f64_values, normalize_dates, pct_change, put_f64_column,
    require_column,
};
use crate::types::{CLOSE, HIGH, LOW, OPEN, VOLUME};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use statrs::statistics::Statistics;

/// Column name of the percentage change of `column`
pub fn pct_column_name(column: &str) -> String {
    format!("{}-pct", column)
}

/// Add `<column>-pct`, the simple daily percentage change
pub fn add_percent_change(df: DataFrame, meta: FeatureMetadata, column: &str) -> Result<Transformed> {
    let name = pct_column_name(column);
    let change = pct_change(&f64_values(&df, column)?);
    let df = put_f64_column(df, &name, change)?;
    Ok((df, meta.with_continuous(name)))
}

/// Add `<column>-abs-pct`, the absolute percentage change scaled to percent
pub fn add_abs_percent_change(df: DataFrame, meta: FeatureMetadata, column: &str) -> Result<Transformed> {
    let name = format!("{}-abs-pct", column);
    let change = pct_change(&f64_values(&df, column)?)
        .into_iter()
        .map(|v| v.map(|v| v.abs() * 100.0))
        .collect();
    let df = put_f64_column(df, &name, change)?;
    Ok((df, meta.with_continuous(name)))
}

/// Add `<column>-1` … `<column>-<count>`, each holding the value `n` rows back
pub fn add_previous_values(mut df: DataFrame, meta: FeatureMetadata, column: &str, count: usize) -> Result<Transformed> {
    let mut meta = meta;
    for n in 1..=count {
        let name = format!("{}-{}", column, n);
        let lagged = require_column(&df, column)?.shift(n as i64).with_name(&name);
        df.with_column(lagged)?;
        meta = meta.with_continuous(name);
    }
    Ok((df, meta))
}

/// Add `y`, the value of `column` `periods` rows ahead
pub fn add_next_y(mut df: DataFrame, meta: FeatureMetadata, column: &str, periods: usize) -> Result<Transformed> {
    let name = "y";
    let ahead = require_column(&df, column)?.shift(-(periods as i64)).with_name(name);
    df.with_column(ahead)?;
    Ok((df, meta.with_continuous(name)))
}

/// Keep the close price only: drops Open, High, Low and Volume
pub fn close_only(df: DataFrame, meta: FeatureMetadata) -> Result<Transformed> {
    let dropped = [OPEN, HIGH, LOW, VOLUME];
    for column in dropped {
        require_column(&df, column)?;
    }
    let df = df.drop_many(&dropped);
    Ok((df, meta.with_continuous(CLOSE)))
}

const DATEPART_CATEGORIES: [&str; 12] = [
    "Year",
    "Month",
    "Week",
    "Day",
    "Dayofweek",
    "Dayofyear",
    "Is_month_end",
    "Is_month_start",
    "Is_quarter_end",
    "Is_quarter_start",
    "Is_year_end",
    "Is_year_start",
];

fn date_part<T>(dates: &[Option<NaiveDate>], part: impl Fn(NaiveDate) -> T) -> Vec<Option<T>> {
    dates.iter().map(|d| d.map(&part)).collect()
}

fn is_month_end(date: NaiveDate) -> bool {
    date.succ_opt().map_or(true, |next| next.month() != date.month())
}

/// Expand a date column into calendar categories plus `Elapsed` seconds
///
/// The prefix of the new columns is the date column name without a trailing
/// `Date`/`date`, so the default `Date` column yields `Year`, `Month`, ….
pub fn add_datepart(df: DataFrame, meta: FeatureMetadata, date_column: &str) -> Result<Transformed> {
    let mut df = normalize_dates(df, date_column)?;
    let dates: Vec<Option<NaiveDate>> = date_keys(&df, date_column)?
        .into_iter()
        .map(|days| days.and_then(date_from_days))
        .collect();

    let prefix = date_column
        .strip_suffix("Date")
        .or_else(|| date_column.strip_suffix("date"))
        .unwrap_or(date_column);
    let name = |part: &str| format!("{}{}", prefix, part);

    let columns = vec![
        Series::new(&name("Year"), date_part(&dates, |d| d.year())),
        Series::new(&name("Month"), date_part(&dates, |d| d.month() as i32)),
        Series::new(&name("Week"), date_part(&dates, |d| d.iso_week().week() as i32)),
        Series::new(&name("Day"), date_part(&dates, |d| d.day() as i32)),
        Series::new(&name("Dayofweek"), date_part(&dates, |d| d.weekday().num_days_from_monday() as i32)),
        Series::new(&name("Dayofyear"), date_part(&dates, |d| d.ordinal() as i32)),
        Series::new(&name("Is_month_end"), date_part(&dates, is_month_end)),
        Series::new(&name("Is_month_start"), date_part(&dates, |d| d.day() == 1)),
        Series::new(&name("Is_quarter_end"), date_part(&dates, |d| d.month() % 3 == 0 && is_month_end(d))),
        Series::new(&name("Is_quarter_start"), date_part(&dates, |d| d.day() == 1 && (d.month() - 1) % 3 == 0)),
        Series::new(&name("Is_year_end"), date_part(&dates, |d| d.month() == 12 && d.day() == 31)),
        Series::new(&name("Is_year_start"), date_part(&dates, |d| d.ordinal() == 1)),
        Series::new(
            &name("Elapsed"),
            date_part(&dates, |d| i64::from(days_since_epoch(d)) * 86_400),
        ),
    ];
    for series in columns {
        df.with_column(series)?;
    }

    let meta = DATEPART_CATEGORIES
        .into_iter()
        .fold(meta, |meta, part| meta.with_categorical(name(part)))
        .with_continuous(name("Elapsed"));
    Ok((df, meta))
}

/// Replace missing and NaN numeric values with zero
pub fn fill_nan(df: DataFrame) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(df.width());
    for series in df.get_columns() {
        let filled = match series.dtype() {
            DataType::Float64 | DataType::Float32 => {
                let values: Vec<f64> = series
                    .cast(&DataType::Float64)?
                    .f64()?
                    .into_iter()
                    .map(|v| v.filter(|v| !v.is_nan()).unwrap_or(0.0))
                    .collect();
                Series::new(series.name(), values)
            }
            dtype if dtype.is_numeric() => series.fill_null(FillNullStrategy::Zero)?,
            _ => series.clone(),
        };
        columns.push(filled);
    }
    Ok(DataFrame::new(columns)?)
}

/// Min-max scale every column to `0..=max_scale`
///
/// Missing values are zero-filled first. Columns named in `exclude` are kept
/// unchanged and moved to the front; every other column must be numeric. A
/// constant column scales to NaN.
pub fn min_max_normalize(df: DataFrame, max_scale: f64, exclude: &[&str]) -> Result<DataFrame> {
    let df = fill_nan(df)?;

    let mut columns = Vec::with_capacity(df.width());
    for name in exclude {
        columns.push(require_column(&df, name)?.clone());
    }

    for series in df.get_columns() {
        let name = series.name();
        if exclude.contains(&name) {
            continue;
        }
        if !series.dtype().is_numeric() {
            return Err(FeatureError::NonNumericColumn(name.to_string()));
        }
        let values: Vec<f64> = f64_values(&df, name)?.into_iter().map(|v| v.unwrap_or(0.0)).collect();
        let min = Statistics::min(values.iter());
        let max = Statistics::max(values.iter());
        let range = max - min;
        let scaled: Vec<f64> = values.iter().map(|v| (v - min) / range * max_scale).collect();
        columns.push(Series::new(name, scaled));
    }

    Ok(DataFrame::new(columns)?)
}
