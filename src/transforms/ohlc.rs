//! Average of the four prices of a bar

use super::{apply_diff, DiffMode};
use crate::error::Result;
use crate::metadata::{FeatureMetadata, Transformed};
use crate::table::{f64_values, put_f64_column};
use crate::types::OHLC;
use polars::prelude::DataFrame;

pub const OHLC_AVG: &str = "ohlc_avg";

/// Add `ohlc_avg`, the mean of Open, High, Low and Close, plus the distance
/// columns selected by `mode`
pub fn add_ohlc_avg(df: DataFrame, meta: FeatureMetadata, mode: &DiffMode) -> Result<Transformed> {
    let prices = OHLC
        .iter()
        .map(|column| f64_values(&df, column))
        .collect::<Result<Vec<_>>>()?;

    let average: Vec<Option<f64>> = (0..df.height())
        .map(|row| {
            let mut sum = 0.0;
            for column in &prices {
                sum += column[row]?;
            }
            Some(sum / OHLC.len() as f64)
        })
        .collect();

    let df = put_f64_column(df, OHLC_AVG, average)?;
    apply_diff(df, meta.with_continuous(OHLC_AVG), OHLC_AVG, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn bars() -> DataFrame {
        DataFrame::new(vec![
            Series::new("Open", &[Some(10.0), Some(1.0)]),
            Series::new("High", &[Some(14.0), None]),
            Series::new("Low", &[Some(8.0), Some(1.0)]),
            Series::new("Close", &[Some(12.0), Some(1.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_average_only() {
        let (df, meta) = add_ohlc_avg(bars(), FeatureMetadata::new(), &DiffMode::None).unwrap();

        assert_eq!(f64_values(&df, OHLC_AVG).unwrap(), vec![Some(11.0), None]);
        assert_eq!(meta.continuous(), &["ohlc_avg"]);
    }

    #[test]
    fn test_close_distance() {
        let mode = DiffMode::Column("Close".into());
        let (df, meta) = add_ohlc_avg(bars(), FeatureMetadata::new(), &mode).unwrap();

        assert_eq!(f64_values(&df, "Close_ohlc_avg_Diff").unwrap()[0], Some(1.0));
        assert_eq!(meta.continuous(), &["ohlc_avg", "Close_ohlc_avg_Diff"]);
    }

    #[test]
    fn test_all_four_distances() {
        let (_, meta) = add_ohlc_avg(bars(), FeatureMetadata::new(), &DiffMode::Ohlc).unwrap();
        assert_eq!(meta.len(), 5);
        assert_eq!(meta.continuous()[4], "Close_ohlc_avg_Diff");
    }
}
