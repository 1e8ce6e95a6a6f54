//! Direction labels from the distribution of percentage changes
//!
//! Thresholds are recomputed for every table: the 10th, 25th, 75th, 85th and
//! 95th percentiles of the change column, plus a noise band taken from the
//! strictly positive and strictly negative changes. Labels are assigned by an
//! ordered list of open intervals where a later interval overwrites an earlier
//! one. Values on a boundary or inside a gap between intervals keep no label.

use super::basic::{add_percent_change, pct_column_name};
use crate::error::{FeatureError, Result};
use crate::metadata::{FeatureMetadata, Transformed};
use crate::table::{f64_values, has_column};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Default noise percentile
pub const DEFAULT_NOISE_THRESHOLD: f64 = 0.07;

/// Direction categories, encoded as integers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum DirectionLabel {
    /// Below the 10th percentile
    SkyFall = -7,
    /// Between the 10th and 25th percentile
    StrongDown = -3,
    /// Negative beyond the noise band, above the 25th percentile
    Down = -1,
    /// Inside the noise band
    Zero = 0,
    /// Positive beyond the noise band, below the 75th percentile
    Up = 1,
    /// Between the 75th and 85th percentile
    MoreUp = 3,
    /// Between the 85th and 95th percentile
    StrongUp = 5,
    /// Above the 95th percentile
    SkyUp = 7,
}

impl DirectionLabel {
    pub fn value(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for DirectionLabel {
    type Error = FeatureError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            -7 => Ok(DirectionLabel::SkyFall),
            -3 => Ok(DirectionLabel::StrongDown),
            -1 => Ok(DirectionLabel::Down),
            0 => Ok(DirectionLabel::Zero),
            1 => Ok(DirectionLabel::Up),
            3 => Ok(DirectionLabel::MoreUp),
            5 => Ok(DirectionLabel::StrongUp),
            7 => Ok(DirectionLabel::SkyUp),
            other => Err(FeatureError::InvalidParameter(format!("no direction label {}", other))),
        }
    }
}

/// Percentile thresholds of one change series
///
/// A threshold computed from an empty subset is NaN, which no comparison
/// satisfies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionThresholds {
    pub p10: f64,
    pub p25: f64,
    pub p75: f64,
    pub p85: f64,
    pub p95: f64,
    /// `noise_threshold` percentile of the strictly positive changes
    pub min_positive: f64,
    /// `1 - noise_threshold` percentile of the strictly negative changes
    pub min_negative: f64,
}

fn quantile(values: Vec<f64>, q: f64) -> Result<f64> {
    let ca = Float64Chunked::from_vec("pct", values);
    Ok(ca.quantile(q, QuantileInterpolOptions::Linear)?.unwrap_or(f64::NAN))
}

impl DirectionThresholds {
    /// Compute thresholds from a change series; missing and NaN values are skipped
    pub fn from_changes(changes: &[Option<f64>], noise_threshold: f64) -> Result<Self> {
        if !(noise_threshold > 0.0 && noise_threshold < 1.0) {
            return Err(FeatureError::InvalidParameter(format!(
                "noise threshold {} must be in (0, 1)",
                noise_threshold
            )));
        }

        let present: Vec<f64> = changes.iter().flatten().copied().filter(|v| !v.is_nan()).collect();
        let positive: Vec<f64> = present.iter().copied().filter(|v| *v > 0.0).collect();
        let negative: Vec<f64> = present.iter().copied().filter(|v| *v < 0.0).collect();

        Ok(Self {
            p10: quantile(present.clone(), 0.10)?,
            p25: quantile(present.clone(), 0.25)?,
            p75: quantile(present.clone(), 0.75)?,
            p85: quantile(present.clone(), 0.85)?,
            p95: quantile(present, 0.95)?,
            min_positive: quantile(positive, noise_threshold)?,
            min_negative: quantile(negative, 1.0 - noise_threshold)?,
        })
    }

    /// Labeling intervals `(lower, upper, label)`, exclusive on both ends, in
    /// the order they are applied
    ///
    /// The outermost bands are open on one side, so infinite changes are
    /// still labeled.
    pub fn bands(&self) -> [(Option<f64>, Option<f64>, DirectionLabel); 8] {
        [
            (None, Some(self.p10), DirectionLabel::SkyFall),
            (Some(self.p10), Some(self.p25), DirectionLabel::StrongDown),
            (Some(self.p25), Some(self.min_negative), DirectionLabel::Down),
            (Some(self.min_negative), Some(self.min_positive), DirectionLabel::Zero),
            (Some(self.min_positive), Some(self.p75), DirectionLabel::Up),
            (Some(self.p75), Some(self.p85), DirectionLabel::MoreUp),
            (Some(self.p85), Some(self.p95), DirectionLabel::StrongUp),
            (Some(self.p95), None, DirectionLabel::SkyUp),
        ]
    }
}

/// Label each change; the last matching band wins
pub fn classify(changes: &[Option<f64>], thresholds: &DirectionThresholds) -> Vec<Option<DirectionLabel>> {
    let bands = thresholds.bands();
    changes
        .iter()
        .map(|change| {
            let value = (*change)?;
            bands
                .iter()
                .filter(|(lower, upper, _)| {
                    lower.map_or(true, |lower| value > lower) && upper.map_or(true, |upper| value < upper)
                })
                .last()
                .map(|(_, _, label)| *label)
        })
        .collect()
}

/// Column name of the direction labels of `column`
pub fn direction_column_name(column: &str) -> String {
    format!("{}-direction", column)
}

/// Add `<column>-direction` from `<column>-pct`, deriving the change first if absent
pub fn add_direction(df: DataFrame, meta: FeatureMetadata, column: &str, noise_threshold: f64) -> Result<Transformed> {
    let target = pct_column_name(column);
    let (mut df, meta) = if has_column(&df, &target) {
        (df, meta)
    } else {
        add_percent_change(df, meta, column)?
    };

    let changes = f64_values(&df, &target)?;
    let thresholds = DirectionThresholds::from_changes(&changes, noise_threshold)?;
    log::debug!("Direction thresholds for {}: {:?}", target, thresholds);

    let labels: Vec<Option<i32>> = classify(&changes, &thresholds)
        .into_iter()
        .map(|label| label.map(DirectionLabel::value))
        .collect();

    let name = direction_column_name(column);
    df.with_column(Series::new(&name, labels))?;
    Ok((df, meta.with_categorical(name)))
}
