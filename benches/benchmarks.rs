use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ohlcv_features::{
    merge::merge_indicator,
    metadata::FeatureMetadata,
    table::from_bars,
    transforms::{add_direction, classify, DirectionThresholds},
    types::Bar,
    variance::OnlineVariance,
};
use polars::prelude::{DataFrame, NamedFrom, Series};

fn bars(days: i64) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
    (0..days)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.37).sin() * 5.0 + i as f64 * 0.01;
            Bar::new(start + Duration::days(i), close - 0.5, close + 1.0, close - 1.0, close, 10_000.0)
        })
        .collect()
}

fn changes(len: usize) -> Vec<Option<f64>> {
    (0..len).map(|i| Some((i as f64 * 0.61).sin() * 0.02)).collect()
}

fn benchmark_online_variance(c: &mut Criterion) {
    let values: Vec<f64> = (0..10_000).map(|i| (i as f64 * 0.13).cos()).collect();

    c.bench_function("online_variance_10000", |b| {
        b.iter(|| {
            let estimator: OnlineVariance = black_box(&values).iter().copied().collect();
            estimator.std()
        });
    });
}

fn benchmark_direction_classifier(c: &mut Criterion) {
    let series = changes(2_500);

    c.bench_function("direction_thresholds_2500", |b| {
        b.iter(|| DirectionThresholds::from_changes(black_box(&series), 0.07));
    });

    let thresholds = DirectionThresholds::from_changes(&series, 0.07).unwrap();
    c.bench_function("direction_classify_2500", |b| {
        b.iter(|| classify(black_box(&series), &thresholds));
    });

    let table = from_bars(&bars(2_500)).unwrap();
    c.bench_function("add_direction_2500", |b| {
        b.iter(|| add_direction(table.clone(), FeatureMetadata::new(), "Close", 0.07));
    });
}

fn benchmark_merge(c: &mut Criterion) {
    let prices = from_bars(&bars(2_500)).unwrap();
    let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
    let dates: Vec<String> = (0..2_500)
        .map(|i| (start + Duration::days(i)).format("%Y-%m-%d").to_string())
        .collect();
    let values: Vec<f64> = (0..2_500).map(|i| 20.0 + (i % 40) as f64).collect();
    let indicator = DataFrame::new(vec![Series::new("date", dates), Series::new("ADX", values)]).unwrap();

    c.bench_function("merge_indicator_2500", |b| {
        b.iter(|| merge_indicator(black_box(&prices), indicator.clone(), &[]));
    });
}

criterion_group!(
    benches,
    benchmark_online_variance,
    benchmark_direction_classifier,
    benchmark_merge
);
criterion_main!(benches);
