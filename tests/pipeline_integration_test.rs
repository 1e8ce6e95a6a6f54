//! End-to-end tests of the feature pipeline against an in-memory indicator cache

use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use ohlcv_features::prelude::*;
use ohlcv_features::table::{date_keys, f64_values, from_bars, has_column};
use ohlcv_features::transforms::{add_percent_change, min_max_normalize};
use polars::prelude::*;

const TICKER: &str = "AMZN";

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn date_text(offset: i64) -> String {
    (start() + Duration::days(offset)).format("%Y-%m-%d").to_string()
}

/// 100 daily bars with a wavy close and uneven candle shapes
fn prices() -> DataFrame {
    let bars: Vec<Bar> = (0..100)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.7).sin() * 3.0 + i as f64 * 0.05;
            let open = close - 0.4 + (i % 4) as f64 * 0.2;
            let high = close + 1.0 + (i % 3) as f64 * 0.1;
            let low = close - 1.2 - (i % 5) as f64 * 0.1;
            Bar::new(start() + Duration::days(i), open, high, low, close, 1_000.0 + i as f64)
        })
        .collect();
    from_bars(&bars).unwrap()
}

/// Indicator rows for days `from..to`
fn indicator(column: &str, from: i64, to: i64, value: impl Fn(i64) -> f64) -> DataFrame {
    let dates: Vec<String> = (from..to).map(date_text).collect();
    let values: Vec<f64> = (from..to).map(value).collect();
    DataFrame::new(vec![Series::new("date", dates), Series::new(column, values)]).unwrap()
}

fn cache() -> InMemoryIndicatorCache {
    let ticker = Ticker::from(TICKER);
    let mut cache = InMemoryIndicatorCache::new();

    // ADX starts ten days late, so merging it drops ten price rows
    cache
        .insert(IndicatorKind::Adx, ticker.clone(), 20, indicator("ADX", 10, 100, |i| 20.0 + (i % 7) as f64))
        .unwrap();
    cache
        .insert(IndicatorKind::Rsi, ticker.clone(), 20, indicator("RSI", 0, 120, |i| 40.0 + (i % 11) as f64))
        .unwrap();
    for (kind, period) in [(IndicatorKind::Ema, 10), (IndicatorKind::Ema, 30), (IndicatorKind::Sma, 20)] {
        let tag = kind.tag();
        cache
            .insert(kind, ticker.clone(), period, indicator(tag, 0, 100, |i| 100.0 + i as f64 / period as f64))
            .unwrap();
    }
    cache
}

fn pipeline() -> FeaturePipeline<InMemoryIndicatorCache> {
    FeaturePipeline::new(cache(), PipelineConfig::default()).unwrap()
}

#[test]
fn test_run_composes_steps() {
    let steps = parse_steps(["close-pct", "direction:Close", "adx:change", "ma:ema:10:Close", "volatility:Close"]).unwrap();
    let (table, meta) = pipeline().run(prices(), &Ticker::from(TICKER), &steps).unwrap();

    assert_eq!(table.height(), 90);
    assert_eq!(
        meta.continuous(),
        &[
            "Close-pct",
            "ADX",
            "ADX_CHANGE",
            "EMA_10",
            "EMA_10_CHANGE",
            "Close_EMA_10_Diff",
            "Close-volatility"
        ]
    );
    assert_eq!(meta.categorical(), &["Close-direction"]);
    for name in meta.continuous().iter().chain(meta.categorical()) {
        assert!(has_column(&table, name), "missing column {}", name);
    }
}

#[test]
fn test_direction_reuses_existing_change() {
    let pipeline = pipeline();
    let (df, meta) = add_percent_change(prices(), FeatureMetadata::new(), "Close").unwrap();
    let (_, meta) = pipeline.add_direction(df, meta, "Close").unwrap();

    assert_eq!(meta.occurrences("Close-pct"), 1);
}

#[test]
fn test_repeated_transform_duplicates_metadata() {
    let pipeline = pipeline();
    let ticker = Ticker::from(TICKER);
    let (df, meta) = pipeline.add_rsi(prices(), FeatureMetadata::new(), &ticker, false).unwrap();
    let (df, meta) = pipeline.add_rsi(df, meta, &ticker, false).unwrap();

    assert_eq!(meta.continuous(), &["RSI", "RSI"]);
    assert!(has_column(&df, "RSI_right"));

    let steps = parse_steps(["close-pct", "close-pct"]).unwrap();
    let (_, meta) = pipeline.run(prices(), &ticker, &steps).unwrap();
    assert_eq!(meta.occurrences("Close-pct"), 2);
}

#[test]
fn test_unknown_average_kind_uses_sma() {
    let steps = parse_steps(["ma:tema:20"]).unwrap();
    let (table, meta) = pipeline().run(prices(), &Ticker::from(TICKER), &steps).unwrap();

    assert!(has_column(&table, "SMA_20"));
    assert_eq!(meta.continuous(), &["SMA_20", "SMA_20_CHANGE"]);
}

#[test]
fn test_spread_fetches_both_averages() {
    let pipeline = pipeline();
    let ticker = Ticker::from(TICKER);
    let (table, meta) = pipeline
        .add_ema10_ema30_diff(prices(), FeatureMetadata::new(), &ticker, &DiffMode::None)
        .unwrap();

    assert_eq!(meta.continuous().last().map(String::as_str), Some("EMA_10_EMA_30_Diff"));
    let spread = f64_values(&table, "EMA_10_EMA_30_Diff").unwrap();
    // EMA_10 = 100 + i/10, EMA_30 = 100 + i/30
    assert_relative_eq!(spread[30].unwrap(), 3.0 - 1.0, epsilon = 1e-9);
}

#[test]
fn test_missing_indicator_propagates() {
    let steps = parse_steps(["close-pct", "macd"]).unwrap();
    let result = pipeline().run(prices(), &Ticker::from(TICKER), &steps);

    match result {
        Err(FeatureError::IndicatorUnavailable { kind, ticker, period }) => {
            assert_eq!(kind, "MACD");
            assert_eq!(ticker, TICKER);
            assert_eq!(period, 20);
        }
        other => panic!("expected an unavailable indicator, got {:?}", other.map(|(df, _)| df.height())),
    }
}

#[test]
fn test_split_eighty_twenty() {
    let pipeline = pipeline();
    let (train, test) = pipeline.split(&prices()).unwrap();

    assert_eq!(train.height(), 80);
    assert_eq!(test.height(), 20);
    let train_dates = date_keys(&train, DATE).unwrap();
    let test_dates = date_keys(&test, DATE).unwrap();
    assert!(train_dates.iter().all(|d| !test_dates.contains(d)));
    assert!(train_dates.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(test_dates[0], Some(train_dates[79].unwrap() + 1));
}

#[test]
fn test_normalize_excluding_date() {
    let steps = parse_steps(["close-pct", "ohlc-avg:ohlc"]).unwrap();
    let (table, _) = pipeline().run(prices(), &Ticker::from(TICKER), &steps).unwrap();
    let original_dates = table.column(DATE).unwrap().clone();

    let scaled = min_max_normalize(table, 100.0, &[DATE]).unwrap();

    assert_eq!(scaled.get_column_names()[0], DATE);
    assert!(scaled.column(DATE).unwrap().equals(&original_dates));
    for name in scaled.get_column_names().into_iter().skip(1) {
        let values: Vec<f64> = f64_values(&scaled, name).unwrap().into_iter().flatten().collect();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert_relative_eq!(min, 0.0, epsilon = 1e-9);
        assert_relative_eq!(max, 100.0, epsilon = 1e-9);
    }
}

#[test]
fn test_verbose_pipeline_runs_configured_steps() {
    let config = PipelineConfig::from_toml_str(
        r#"
        verbose = true
        steps = ["datepart", "prev:Close:2", "next-y:Close", "fill-nan"]
        "#,
    )
    .unwrap();
    let pipeline = FeaturePipeline::new(cache(), config).unwrap();
    let (table, meta) = pipeline.run_configured(prices(), &Ticker::from(TICKER)).unwrap();

    assert_eq!(meta.categorical().len(), 12);
    assert!(meta.continuous().contains(&"Elapsed".to_string()));
    assert!(meta.continuous().contains(&"Close-2".to_string()));
    // fill-nan replaced the missing lags and the missing target
    assert_eq!(f64_values(&table, "Close-2").unwrap()[0], Some(0.0));
    assert_eq!(f64_values(&table, "y").unwrap()[99], Some(0.0));
}
