//! Incremental variance estimation (Welford's method)

/// Running mean and variance accumulator
///
/// Values are folded in one at a time without storing them. With fewer than
/// two samples the variance is reported as 0.
#[derive(Debug, Clone, Default)]
pub struct OnlineVariance {
    count: u64,
    mean: f64,
    sum_squared_deltas: f64,
}

impl OnlineVariance {
    /// Create an empty estimator
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a value into the running statistics
    pub fn include(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.sum_squared_deltas += delta * delta2;
    }

    /// Number of values included so far
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Running mean
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance (n - 1 denominator)
    pub fn variance(&self) -> f64 {
        if self.count > 1 {
            self.sum_squared_deltas / (self.count - 1) as f64
        } else {
            0.0
        }
    }

    /// Sample standard deviation
    pub fn std(&self) -> f64 {
        self.variance().sqrt()
    }
}

impl Extend<f64> for OnlineVariance {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for value in iter {
            self.include(value);
        }
    }
}

impl FromIterator<f64> for OnlineVariance {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut estimator = Self::new();
        estimator.extend(iter);
        estimator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use statrs::statistics::Statistics;

    #[test]
    fn test_constant_sequence_has_zero_variance() {
        let estimator: OnlineVariance = std::iter::repeat(42.0).take(10).collect();

        assert_eq!(estimator.variance(), 0.0);
        assert_eq!(estimator.std(), 0.0);
    }

    #[test]
    fn test_matches_closed_form_sample_variance() {
        let estimator: OnlineVariance = vec![1.0, 2.0, 3.0, 4.0, 5.0].into_iter().collect();

        assert_eq!(estimator.count(), 5);
        assert_relative_eq!(estimator.mean(), 3.0, epsilon = 1e-12);
        assert_relative_eq!(estimator.variance(), 2.5, epsilon = 1e-12);
        assert_relative_eq!(estimator.std(), 2.5f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_fewer_than_two_samples() {
        let mut estimator = OnlineVariance::new();
        assert_eq!(estimator.variance(), 0.0);

        estimator.include(7.0);
        assert_eq!(estimator.variance(), 0.0);
        assert_eq!(estimator.mean(), 7.0);
    }

    proptest! {
        #[test]
        fn prop_agrees_with_two_pass_variance(values in prop::collection::vec(-1.0e3f64..1.0e3, 2..200)) {
            let estimator: OnlineVariance = values.iter().copied().collect();
            let expected = values.iter().variance();

            prop_assert!((estimator.variance() - expected).abs() <= 1e-6 * expected.abs().max(1.0));
        }
    }
}
