//! Criterion benchmarks for the engine hot paths.
//!
//! 1. Indicator snapshot (every indicator at the latest point)
//! 2. Forecast fit + band projection
//! 3. Holdout backtest

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chartinsight_core::domain::PricePoint;
use chartinsight_core::forecast::{forecast_band, holdout_accuracy, ArimaForecaster, ForecastConfig};
use chartinsight_core::normalize::normalize;
use chartinsight_core::snapshot::{IndicatorConfig, IndicatorSnapshot};

fn make_points(n: usize) -> Vec<PricePoint> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0 + i as f64 * 0.02;
            PricePoint {
                date: base_date + chrono::Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000_000.0 + (i % 500) as f64 * 1_000.0,
            }
        })
        .collect()
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicator_snapshot");
    let cfg = IndicatorConfig::default();

    for &count in &[252, 1260, 2520] {
        let series = normalize(&make_points(count), 60).unwrap();
        group.bench_with_input(BenchmarkId::new("all", count), &count, |b, _| {
            b.iter(|| IndicatorSnapshot::compute(black_box(&series), black_box(&cfg)))
        });
    }

    group.finish();
}

fn bench_forecast(c: &mut Criterion) {
    let mut group = c.benchmark_group("forecast");
    let cfg = ForecastConfig::default();
    let forecaster = ArimaForecaster::new(cfg.clone());

    for &count in &[252, 1260] {
        let series = normalize(&make_points(count), 60).unwrap();
        group.bench_with_input(BenchmarkId::new("band_63", count), &count, |b, _| {
            b.iter(|| forecast_band(&forecaster, black_box(&series), 63, &cfg))
        });
        group.bench_with_input(BenchmarkId::new("holdout_63", count), &count, |b, _| {
            b.iter(|| holdout_accuracy(&forecaster, black_box(&series), 63))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_snapshot, bench_forecast);
criterion_main!(benches);
