//! Error construction and message formatting

use ohlcv_features::error::FeatureError;

#[cfg(test)]
mod feature_error_tests {
    use super::*;

    #[test]
    fn test_indicator_unavailable_message() {
        let err = FeatureError::IndicatorUnavailable {
            kind: "MACD".to_string(),
            ticker: "AMZN".to_string(),
            period: 20,
        };

        let msg = err.to_string();
        assert!(msg.contains("MACD"));
        assert!(msg.contains("AMZN"));
        assert!(msg.contains("20"));
    }

    #[test]
    fn test_split_ratio_message() {
        let msg = FeatureError::InvalidSplitRatio(1.5).to_string();
        assert!(msg.contains("1.5"));
        assert!(msg.contains("(0, 1]"));
    }

    #[test]
    fn test_missing_column_message() {
        let msg = FeatureError::MissingColumn("Close-pct".to_string()).to_string();
        assert_eq!(msg, "Column not found: Close-pct");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "prices.csv");
        let err: FeatureError = io.into();
        assert!(matches!(err, FeatureError::IoError(_)));
        assert!(err.to_string().contains("prices.csv"));
    }

    #[test]
    fn test_toml_error_conversion() {
        let parsed: Result<toml::Value, _> = toml::from_str("verbose = ");
        let err: FeatureError = parsed.unwrap_err().into();
        assert!(matches!(err, FeatureError::TomlError(_)));
    }

    #[test]
    fn test_errors_are_std_errors() {
        fn assert_error<E: std::error::Error + Send + Sync + 'static>(_: &E) {}
        assert_error(&FeatureError::InvalidStep("bogus".into()));
    }
}
