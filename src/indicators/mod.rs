//! Technical indicator sources
//!
//! Indicator tables are computed elsewhere and served from a cache keyed by
//! indicator kind, ticker and time period:
//! - [`InMemoryIndicatorCache`]: pre-loaded tables, also used as a test double
//! - [`CsvIndicatorCache`]: one CSV file per `(ticker, kind, period)`
//!
//! Every table carries a lowercase `date` column plus the kind-specific value
//! columns listed by [`IndicatorKind::value_columns`].

pub mod csv_cache;
pub mod memory;

pub use csv_cache::CsvIndicatorCache;
pub use memory::InMemoryIndicatorCache;

use crate::error::{FeatureError, Result};
use crate::types::Ticker;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Date column name used by indicator tables before normalization
pub const RAW_DATE: &str = "date";

/// Technical indicators the cache can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndicatorKind {
    Sma,
    Ema,
    Wma,
    Adx,
    Obv,
    Mom,
    Rsi,
    Macd,
    Bbands,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 9] = [
        IndicatorKind::Sma,
        IndicatorKind::Ema,
        IndicatorKind::Wma,
        IndicatorKind::Adx,
        IndicatorKind::Obv,
        IndicatorKind::Mom,
        IndicatorKind::Rsi,
        IndicatorKind::Macd,
        IndicatorKind::Bbands,
    ];

    /// Upper-case tag, as used in file names and raw value columns
    pub fn tag(&self) -> &'static str {
        match self {
            IndicatorKind::Sma => "SMA",
            IndicatorKind::Ema => "EMA",
            IndicatorKind::Wma => "WMA",
            IndicatorKind::Adx => "ADX",
            IndicatorKind::Obv => "OBV",
            IndicatorKind::Mom => "MOM",
            IndicatorKind::Rsi => "RSI",
            IndicatorKind::Macd => "MACD",
            IndicatorKind::Bbands => "BBANDS",
        }
    }

    /// Value columns of the raw indicator table
    pub fn value_columns(&self) -> &'static [&'static str] {
        match self {
            IndicatorKind::Sma => &["SMA"],
            IndicatorKind::Ema => &["EMA"],
            IndicatorKind::Wma => &["WMA"],
            IndicatorKind::Adx => &["ADX"],
            IndicatorKind::Obv => &["OBV"],
            IndicatorKind::Mom => &["MOM"],
            IndicatorKind::Rsi => &["RSI"],
            IndicatorKind::Macd => &["MACD", "MACD_Signal", "MACD_Hist"],
            IndicatorKind::Bbands => &["Real Upper Band", "Real Middle Band", "Real Lower Band"],
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for IndicatorKind {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self> {
        IndicatorKind::ALL
            .into_iter()
            .find(|kind| kind.tag().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FeatureError::InvalidParameter(format!("unknown indicator '{}'", s)))
    }
}

/// Source of pre-computed indicator tables
///
/// A call blocks until the table is available; failures propagate to the
/// caller without retry or substitution.
pub trait IndicatorSource {
    /// Fetch the indicator table for a ticker and time period
    fn fetch_indicator(&self, kind: IndicatorKind, ticker: &Ticker, period: u32) -> Result<DataFrame>;
}

impl<T: IndicatorSource + ?Sized> IndicatorSource for &T {
    fn fetch_indicator(&self, kind: IndicatorKind, ticker: &Ticker, period: u32) -> Result<DataFrame> {
        (**self).fetch_indicator(kind, ticker, period)
    }
}

impl<T: IndicatorSource + ?Sized> IndicatorSource for Box<T> {
    fn fetch_indicator(&self, kind: IndicatorKind, ticker: &Ticker, period: u32) -> Result<DataFrame> {
        (**self).fetch_indicator(kind, ticker, period)
    }
}

pub(crate) fn unavailable(kind: IndicatorKind, ticker: &Ticker, period: u32) -> FeatureError {
    FeatureError::IndicatorUnavailable {
        kind: kind.tag().to_string(),
        ticker: ticker.to_string(),
        period,
    }
}
