//! CSV-backed indicator cache
//!
//! Tables live in one directory as `<TICKER>_<KIND>_<period>.csv`, e.g.
//! `AMZN_SMA_20.csv`, read with [`read_csv_table`].

use super::{unavailable, IndicatorKind, IndicatorSource};
use crate::error::{FeatureError, Result};
use crate::ingest::read_csv_table;
use crate::table::has_column;
use crate::types::Ticker;
use polars::prelude::*;
use std::path::{Path, PathBuf};

/// Indicator cache reading CSV files from a directory
#[derive(Debug, Clone)]
pub struct CsvIndicatorCache {
    root: PathBuf,
}

impl CsvIndicatorCache {
    /// Create a cache rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the table for a key
    pub fn path_for(&self, kind: IndicatorKind, ticker: &Ticker, period: u32) -> PathBuf {
        self.root
            .join(format!("{}_{}_{}.csv", ticker.as_str().to_uppercase(), kind.tag(), period))
    }
}

impl IndicatorSource for CsvIndicatorCache {
    fn fetch_indicator(&self, kind: IndicatorKind, ticker: &Ticker, period: u32) -> Result<DataFrame> {
        let path = self.path_for(kind, ticker, period);
        if !path.exists() {
            log::warn!("No cached {} table at {}", kind, path.display());
            return Err(unavailable(kind, ticker, period));
        }

        let table = read_csv_table(&path)?;
        for column in kind.value_columns() {
            if !has_column(&table, column) {
                return Err(FeatureError::MissingColumn(format!(
                    "{} in {}",
                    column,
                    path.display()
                )));
            }
        }

        log::debug!("Loaded {} rows of {} for {} from {}", table.height(), kind, ticker, path.display());
        Ok(table)
    }
}
