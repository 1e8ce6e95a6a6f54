//! Oscillator, volume and band indicators merged from the indicator source
//!
//! ADX, OBV, MOM and RSI are single-value indicators with an optional
//! percentage change computed after the merge. MACD always adds its signal
//! spread and the change of each line. Bollinger bands are renamed to
//! `BB_UP`, `BB_MID` and `BB_LOW` and can be measured against the prices.

use super::{apply_diff, DiffMode};
use crate::error::Result;
use crate::indicators::{IndicatorKind, IndicatorSource};
use crate::merge::{inner_join_on_date, prepare_indicator, value_column_names};
use crate::metadata::{FeatureMetadata, Transformed};
use crate::table::{f64_values, pct_change, put_f64_column, with_difference};
use crate::types::Ticker;
use polars::prelude::DataFrame;

pub const MACD: &str = "MACD";
pub const MACD_SIGNAL: &str = "MACD_Signal";
pub const MACD_HIST: &str = "MACD_Hist";
pub const MACD_SIGN_DIFF: &str = "MACD_SIGN_DIFF";

pub const BB_UP: &str = "BB_UP";
pub const BB_MID: &str = "BB_MID";
pub const BB_LOW: &str = "BB_LOW";

const BAND_RENAMES: [(&str, &str); 3] = [
    ("Real Upper Band", BB_UP),
    ("Real Middle Band", BB_MID),
    ("Real Lower Band", BB_LOW),
];

fn fetch_and_merge<S>(df: &DataFrame, source: &S, ticker: &Ticker, kind: IndicatorKind, period: u32, renames: &[(&str, &str)]) -> Result<DataFrame>
where
    S: IndicatorSource + ?Sized,
{
    let table = source.fetch_indicator(kind, ticker, period)?;
    let table = prepare_indicator(table, renames)?;
    inner_join_on_date(df, &table)
}

/// Merge a single-value indicator and optionally its change as `change_name`
fn add_single_value<S>(
    df: DataFrame,
    meta: FeatureMetadata,
    source: &S,
    ticker: &Ticker,
    kind: IndicatorKind,
    period: u32,
    change_name: Option<String>,
) -> Result<Transformed>
where
    S: IndicatorSource + ?Sized,
{
    let column = kind.tag();
    let merged = fetch_and_merge(&df, source, ticker, kind, period, &[])?;
    let meta = meta.with_continuous(column);

    match change_name {
        Some(name) => {
            let change = pct_change(&f64_values(&merged, column)?);
            let merged = put_f64_column(merged, &name, change)?;
            Ok((merged, meta.with_continuous(name)))
        }
        None => Ok((merged, meta)),
    }
}

/// Average directional movement index, `ADX` and optionally `ADX_CHANGE`
pub fn add_adx<S>(df: DataFrame, meta: FeatureMetadata, source: &S, ticker: &Ticker, period: u32, change: bool) -> Result<Transformed>
where
    S: IndicatorSource + ?Sized,
{
    let change_name = change.then(|| "ADX_CHANGE".to_string());
    add_single_value(df, meta, source, ticker, IndicatorKind::Adx, period, change_name)
}

/// On-balance volume, `OBV` and optionally `OBV_CHANGE`
pub fn add_obv<S>(df: DataFrame, meta: FeatureMetadata, source: &S, ticker: &Ticker, period: u32, change: bool) -> Result<Transformed>
where
    S: IndicatorSource + ?Sized,
{
    let change_name = change.then(|| "OBV_CHANGE".to_string());
    add_single_value(df, meta, source, ticker, IndicatorKind::Obv, period, change_name)
}

/// Momentum, `MOM` and optionally `MOM-pct`
pub fn add_mom<S>(df: DataFrame, meta: FeatureMetadata, source: &S, ticker: &Ticker, period: u32, change: bool) -> Result<Transformed>
where
    S: IndicatorSource + ?Sized,
{
    let change_name = change.then(|| "MOM-pct".to_string());
    add_single_value(df, meta, source, ticker, IndicatorKind::Mom, period, change_name)
}

/// Relative strength index, `RSI` and optionally `RSI_CHANGE`
pub fn add_rsi<S>(df: DataFrame, meta: FeatureMetadata, source: &S, ticker: &Ticker, period: u32, change: bool) -> Result<Transformed>
where
    S: IndicatorSource + ?Sized,
{
    let change_name = change.then(|| "RSI_CHANGE".to_string());
    add_single_value(df, meta, source, ticker, IndicatorKind::Rsi, period, change_name)
}

/// MACD lines, `MACD_SIGN_DIFF` = MACD − signal, and `<line>_Change` for each line
pub fn add_macd<S>(df: DataFrame, meta: FeatureMetadata, source: &S, ticker: &Ticker, period: u32) -> Result<Transformed>
where
    S: IndicatorSource + ?Sized,
{
    let table = source.fetch_indicator(IndicatorKind::Macd, ticker, period)?;
    let table = prepare_indicator(table, &[])?;
    let lines = value_column_names(&table);

    let mut merged = inner_join_on_date(&df, &table)?;
    let mut meta = meta
        .with_continuous(MACD)
        .with_continuous(MACD_SIGNAL)
        .with_continuous(MACD_HIST);

    merged = with_difference(merged, MACD_SIGN_DIFF, MACD, MACD_SIGNAL)?;
    meta = meta.with_continuous(MACD_SIGN_DIFF);

    for line in &lines {
        let name = format!("{}_Change", line);
        let change = pct_change(&f64_values(&merged, line)?);
        merged = put_f64_column(merged, &name, change)?;
        meta = meta.with_continuous(name);
    }
    Ok((merged, meta))
}

/// Bollinger bands with the distance columns selected by `mode`
///
/// With a single price column this adds `<col>_BB_UP_Diff`, `<col>_BB_MID_Diff`
/// and `<col>_BB_LOW_Diff`; with all four prices it adds twelve columns, band
/// by band.
pub fn add_bbands<S>(df: DataFrame, meta: FeatureMetadata, source: &S, ticker: &Ticker, period: u32, mode: &DiffMode) -> Result<Transformed>
where
    S: IndicatorSource + ?Sized,
{
    let table = source.fetch_indicator(IndicatorKind::Bbands, ticker, period)?;
    let table = prepare_indicator(table, &BAND_RENAMES)?;
    let meta = meta.with_merged_columns(table.get_column_names());

    let (mut merged, mut meta) = (inner_join_on_date(&df, &table)?, meta);
    for band in value_column_names(&table) {
        (merged, meta) = apply_diff(merged, meta, &band, mode)?;
    }
    Ok((merged, meta))
}
