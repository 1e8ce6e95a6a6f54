//! Moving-average features
//!
//! A moving average is fetched from the indicator source, its value column is
//! renamed to `<KIND>_<period>` (e.g. `EMA_10`) and its percentage change is
//! taken over the full indicator history before the table is inner-joined onto
//! the prices. Spread features compare two moving averages and only fetch the
//! ones not already on the table.

use super::{apply_diff, DiffMode};
use crate::error::Result;
use crate::indicators::{IndicatorKind, IndicatorSource};
use crate::merge::{inner_join_on_date, prepare_indicator};
use crate::metadata::{FeatureMetadata, Transformed};
use crate::table::{f64_values, has_column, pct_change, put_f64_column, with_difference};
use crate::types::Ticker;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Moving-average flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MovingAverageKind {
    /// Simple moving average, also the fallback for unknown tags
    #[default]
    Sma,
    /// Exponential moving average
    Ema,
    /// Weighted moving average
    Wma,
}

const KIND_TAGS: [(&str, MovingAverageKind); 3] = [
    ("sma", MovingAverageKind::Sma),
    ("ema", MovingAverageKind::Ema),
    ("wma", MovingAverageKind::Wma),
];

impl MovingAverageKind {
    /// Look up a tag case-insensitively; anything unknown is a simple moving average
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim();
        KIND_TAGS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(tag))
            .map(|(_, kind)| *kind)
            .unwrap_or_else(|| {
                log::debug!("Unknown moving average '{}', using {}", tag, MovingAverageKind::default());
                MovingAverageKind::default()
            })
    }

    pub fn indicator(self) -> IndicatorKind {
        match self {
            MovingAverageKind::Sma => IndicatorKind::Sma,
            MovingAverageKind::Ema => IndicatorKind::Ema,
            MovingAverageKind::Wma => IndicatorKind::Wma,
        }
    }

    /// Feature column for a period, e.g. `WMA_5`
    pub fn column_name(self, period: u32) -> String {
        format!("{}_{}", self.indicator().tag(), period)
    }
}

impl fmt::Display for MovingAverageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.indicator().tag())
    }
}

impl FromStr for MovingAverageKind {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from_tag(s))
    }
}

/// A moving average of a given kind and period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MovingAverage {
    pub kind: MovingAverageKind,
    pub period: u32,
}

impl MovingAverage {
    pub const fn new(kind: MovingAverageKind, period: u32) -> Self {
        Self { kind, period }
    }

    pub fn column_name(&self) -> String {
        self.kind.column_name(self.period)
    }
}

pub const WMA_5: MovingAverage = MovingAverage::new(MovingAverageKind::Wma, 5);
pub const WMA_20: MovingAverage = MovingAverage::new(MovingAverageKind::Wma, 20);
pub const WMA_60: MovingAverage = MovingAverage::new(MovingAverageKind::Wma, 60);
pub const EMA_10: MovingAverage = MovingAverage::new(MovingAverageKind::Ema, 10);
pub const EMA_30: MovingAverage = MovingAverage::new(MovingAverageKind::Ema, 30);
pub const SMA_20: MovingAverage = MovingAverage::new(MovingAverageKind::Sma, 20);
pub const SMA_200: MovingAverage = MovingAverage::new(MovingAverageKind::Sma, 200);

/// Merge `<KIND>_<period>` and `<KIND>_<period>_CHANGE`, plus the distance
/// columns selected by `mode`
pub fn add_moving_average<S>(
    df: DataFrame,
    meta: FeatureMetadata,
    source: &S,
    ticker: &Ticker,
    average: MovingAverage,
    mode: &DiffMode,
) -> Result<Transformed>
where
    S: IndicatorSource + ?Sized,
{
    let kind = average.kind.indicator();
    let name = average.column_name();
    let change_name = format!("{}_CHANGE", name);

    let table = source.fetch_indicator(kind, ticker, average.period)?;
    let table = prepare_indicator(table, &[(kind.tag(), name.as_str())])?;
    let change = pct_change(&f64_values(&table, &name)?);
    let table = put_f64_column(table, &change_name, change)?;

    let meta = meta.with_continuous(name.as_str()).with_continuous(change_name);
    let merged = inner_join_on_date(&df, &table)?;
    apply_diff(merged, meta, &name, mode)
}

/// Name of the spread column between two moving averages
pub fn spread_column_name(fast: MovingAverage, slow: MovingAverage) -> String {
    format!("{}_{}_Diff", fast.column_name(), slow.column_name())
}

/// Add `<fast>_<slow>_Diff` = fast − slow
///
/// Each moving average is merged with `mode` first unless its column is
/// already on the table.
pub fn add_moving_average_spread<S>(
    df: DataFrame,
    meta: FeatureMetadata,
    source: &S,
    ticker: &Ticker,
    fast: MovingAverage,
    slow: MovingAverage,
    mode: &DiffMode,
) -> Result<Transformed>
where
    S: IndicatorSource + ?Sized,
{
    let (mut df, mut meta) = (df, meta);
    for average in [fast, slow] {
        if !has_column(&df, &average.column_name()) {
            (df, meta) = add_moving_average(df, meta, source, ticker, average, mode)?;
        }
    }

    let name = spread_column_name(fast, slow);
    let df = with_difference(df, &name, &fast.column_name(), &slow.column_name())?;
    Ok((df, meta.with_continuous(name)))
}

/// `WMA_5_WMA_20_Diff`
pub fn add_wma5_wma20_diff<S>(df: DataFrame, meta: FeatureMetadata, source: &S, ticker: &Ticker, mode: &DiffMode) -> Result<Transformed>
where
    S: IndicatorSource + ?Sized,
{
    add_moving_average_spread(df, meta, source, ticker, WMA_5, WMA_20, mode)
}

/// `WMA_20_WMA_60_Diff`
pub fn add_wma20_wma60_diff<S>(df: DataFrame, meta: FeatureMetadata, source: &S, ticker: &Ticker, mode: &DiffMode) -> Result<Transformed>
where
    S: IndicatorSource + ?Sized,
{
    add_moving_average_spread(df, meta, source, ticker, WMA_20, WMA_60, mode)
}

/// `EMA_10_EMA_30_Diff`
pub fn add_ema10_ema30_diff<S>(df: DataFrame, meta: FeatureMetadata, source: &S, ticker: &Ticker, mode: &DiffMode) -> Result<Transformed>
where
    S: IndicatorSource + ?Sized,
{
    add_moving_average_spread(df, meta, source, ticker, EMA_10, EMA_30, mode)
}

/// `SMA_20_SMA_200_Diff`; the averages only ever get the four OHLC distances
pub fn add_sma20_sma200_diff<S>(df: DataFrame, meta: FeatureMetadata, source: &S, ticker: &Ticker, add_ohlc_diff: bool) -> Result<Transformed>
where
    S: IndicatorSource + ?Sized,
{
    let mode = DiffMode::from_flags(false, "", add_ohlc_diff);
    add_moving_average_spread(df, meta, source, ticker, SMA_20, SMA_200, &mode)
}
