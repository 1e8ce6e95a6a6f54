//! In-memory indicator cache
//!
//! Holds pre-loaded indicator tables, keyed by `(kind, ticker, period)`.
//! Useful for tests and for callers that fetch everything up front.

use super::{unavailable, IndicatorKind, IndicatorSource, RAW_DATE};
use crate::error::{FeatureError, Result};
use crate::table::has_column;
use crate::types::Ticker;
use hashbrown::HashMap;
use polars::prelude::*;

/// In-memory indicator table storage
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndicatorCache {
    tables: HashMap<(IndicatorKind, Ticker, u32), DataFrame>,
}

impl InMemoryIndicatorCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a table, replacing any previous table for the same key
    ///
    /// The table must carry the `date` column and every value column of `kind`.
    pub fn insert(
        &mut self,
        kind: IndicatorKind,
        ticker: Ticker,
        period: u32,
        table: DataFrame,
    ) -> Result<()> {
        for column in std::iter::once(RAW_DATE).chain(kind.value_columns().iter().copied()) {
            if !has_column(&table, column) {
                return Err(FeatureError::MissingColumn(format!(
                    "{} (required by {} table)",
                    column, kind
                )));
            }
        }
        self.tables.insert((kind, ticker, period), table);
        Ok(())
    }

    /// Store a single-value indicator from `(date, value)` pairs
    pub fn insert_series(
        &mut self,
        kind: IndicatorKind,
        ticker: Ticker,
        period: u32,
        rows: &[(&str, f64)],
    ) -> Result<()> {
        let value_column = kind.value_columns()[0];
        let table = DataFrame::new(vec![
            Series::new(RAW_DATE, rows.iter().map(|(d, _)| *d).collect::<Vec<_>>()),
            Series::new(value_column, rows.iter().map(|(_, v)| *v).collect::<Vec<_>>()),
        ])?;
        self.insert(kind, ticker, period, table)
    }

    /// Number of cached tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl IndicatorSource for InMemoryIndicatorCache {
    fn fetch_indicator(&self, kind: IndicatorKind, ticker: &Ticker, period: u32) -> Result<DataFrame> {
        self.tables
            .get(&(kind, ticker.clone(), period))
            .cloned()
            .ok_or_else(|| unavailable(kind, ticker, period))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_fetch() {
        let mut cache = InMemoryIndicatorCache::new();
        let ticker = Ticker::from("AMZN");
        cache
            .insert_series(IndicatorKind::Rsi, ticker.clone(), 14, &[("2020-01-02", 55.0)])
            .unwrap();

        let table = cache.fetch_indicator(IndicatorKind::Rsi, &ticker, 14).unwrap();
        assert_eq!(table.height(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_miss_is_unavailable() {
        let cache = InMemoryIndicatorCache::new();
        let err = cache
            .fetch_indicator(IndicatorKind::Adx, &Ticker::from("AMZN"), 20)
            .unwrap_err();

        assert!(matches!(err, FeatureError::IndicatorUnavailable { period: 20, .. }));
        assert!(err.to_string().contains("ADX"));
    }

    #[test]
    fn test_insert_rejects_missing_value_column() {
        let mut cache = InMemoryIndicatorCache::new();
        let table = DataFrame::new(vec![
            Series::new("date", &["2020-01-02"]),
            Series::new("MACD", &[1.0]),
        ])
        .unwrap();

        let result = cache.insert(IndicatorKind::Macd, Ticker::from("AMZN"), 20, table);
        assert!(matches!(result, Err(FeatureError::MissingColumn(_))));
    }
}
