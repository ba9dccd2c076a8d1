//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. SMA20 reacts to a level shift strictly faster than SMA60
//! 2. RSI14 stays in [0, 100]; monotone series pin it to 100 / 0
//! 3. Forecast band ordering: lower <= mean <= upper at every point
//! 4. A forecast scored against itself has zero error
//! 5. trendScore and riskScore stay in [0, 100] for any finite snapshot
//! 6. The decision table is total

use chartinsight_core::domain::PricePoint;
use chartinsight_core::forecast::accuracy::{mae, mape, rmse};
use chartinsight_core::forecast::{forecast_band, ArimaForecaster, ForecastConfig, Forecaster};
use chartinsight_core::indicators::{latest, Indicator, Rsi, Sma};
use chartinsight_core::normalize::normalize;
use chartinsight_core::scoring::{score, ScoringConfig, Signal};
use chartinsight_core::snapshot::{
    BollingerReading, FearGreed, IndicatorSnapshot, MacdReading, MacdState,
    SNAPSHOT_SCHEMA_VERSION,
};
use chrono::NaiveDate;
use proptest::prelude::*;

fn points_from_closes(closes: &[f64]) -> Vec<PricePoint> {
    let base = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PricePoint {
            date: base + chrono::Duration::days(i as i64),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 10_000.0,
        })
        .collect()
}

// ── Strategies (proptest) ────────────────────────────────────────────

/// Geometric random walk starting at `start`, steps in ±4%.
fn arb_walk(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    (
        10.0..500.0_f64,
        prop::collection::vec(-0.04..0.04_f64, min_len..max_len),
    )
        .prop_map(|(start, steps)| {
            let mut price = start;
            steps
                .into_iter()
                .map(|s| {
                    price *= 1.0 + s;
                    price
                })
                .collect()
        })
}

fn arb_opt(range: std::ops::Range<f64>) -> impl Strategy<Value = Option<f64>> {
    prop::option::of(range)
}

prop_compose! {
    fn arb_snapshot()(
        close in 0.01..1e6_f64,
        sma20 in arb_opt(0.01..1e6),
        sma60 in arb_opt(0.01..1e6),
        macd in prop::option::of((-1e4..1e4_f64, -1e4..1e4_f64)),
        hv in arb_opt(0.0..500.0),
        atr_pct in arb_opt(0.0..200.0),
        mdd in arb_opt(0.0..100.0),
    ) -> IndicatorSnapshot {
        IndicatorSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            as_of: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            close,
            change_rate_pct: None,
            sma20,
            sma60,
            macd: macd.map(|(line, signal)| MacdReading {
                line,
                signal,
                hist: line - signal,
                state: MacdState::Neutral,
            }),
            rsi14: None,
            rsi_zone: None,
            bollinger: Some(BollingerReading { upper: close, mid: close, lower: close }),
            hv20_pct: hv,
            atr14: atr_pct.map(|p| p * close / 100.0),
            atr_pct,
            mdd_pct: mdd,
            momentum20_pct: None,
            volume_last: 0.0,
            volume_avg20: None,
            volume_ratio_pct: None,
            investor_psychology_pct: None,
            fear_greed: Some(FearGreed::Neutral),
        }
    }
}

// ── 1. SMA convergence ───────────────────────────────────────────────

proptest! {
    #[test]
    fn sma20_converges_faster_than_sma60(
        base in 10.0..200.0_f64,
        shift in prop_oneof![-50.0..-1.0_f64, 1.0..50.0_f64],
        prefix in 60usize..120,
        after in 1usize..60,
    ) {
        let mut closes = vec![base; prefix];
        closes.extend(std::iter::repeat(base + shift).take(after));
        let points = points_from_closes(&closes);

        let sma20 = latest(&Sma::new(20).compute(&points));
        let sma60 = latest(&Sma::new(60).compute(&points));
        prop_assert!(sma20.is_some() && sma60.is_some());

        let target = base + shift;
        let gap20 = (sma20.unwrap() - target).abs();
        let gap60 = (sma60.unwrap() - target).abs();
        prop_assert!(gap20 < gap60, "gap20={} gap60={}", gap20, gap60);
    }

    #[test]
    fn sma_defined_at_last_index_for_60_points(closes in arb_walk(60, 200)) {
        let series = normalize(&points_from_closes(&closes), 60).unwrap();
        prop_assert!(latest(&Sma::new(20).compute(series.points())).is_some());
        prop_assert!(latest(&Sma::new(60).compute(series.points())).is_some());
    }
}

// ── 2. RSI bounds ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn rsi_always_bounded(closes in arb_walk(15, 300)) {
        let values = Rsi::new(14).compute(&points_from_closes(&closes));
        for v in values.into_iter().filter(|v| !v.is_nan()) {
            prop_assert!((0.0..=100.0).contains(&v), "rsi={}", v);
        }
    }

    #[test]
    fn rsi_pinned_on_monotone_series(
        start in 10.0..100.0_f64,
        steps in prop::collection::vec(0.01..5.0_f64, 14..80),
    ) {
        let mut up = vec![start];
        let mut down = vec![start + steps.iter().sum::<f64>() + 1.0];
        for s in &steps {
            up.push(up.last().unwrap() + s);
            down.push(down.last().unwrap() - s);
        }
        let rsi_up = latest(&Rsi::new(14).compute(&points_from_closes(&up)));
        let rsi_down = latest(&Rsi::new(14).compute(&points_from_closes(&down)));
        prop_assert_eq!(rsi_up, Some(100.0));
        prop_assert_eq!(rsi_down, Some(0.0));
    }
}

// ── 3. Band ordering ─────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn band_is_ordered(closes in arb_walk(30, 250), horizon in 1usize..=126) {
        let series = normalize(&points_from_closes(&closes), 20).unwrap();
        let cfg = ForecastConfig::default();
        if let Ok(band) = forecast_band(&ArimaForecaster::new(cfg.clone()), &series, horizon, &cfg) {
            prop_assert_eq!(band.len(), horizon);
            for p in band.points() {
                prop_assert!(p.lower <= p.mean && p.mean <= p.upper);
                prop_assert!(p.upper - p.lower >= 0.0);
                prop_assert!(p.time > series.last_date().unwrap());
            }
        }
    }
}

// ── 4. Self-consistency of accuracy metrics ──────────────────────────

proptest! {
    #[test]
    fn holdout_forecast_against_itself_is_zero(closes in arb_walk(40, 120), holdout in 1usize..20) {
        let split = closes.len() - holdout;
        if let Ok(projection) = ArimaForecaster::default().forecast(&closes[..split], holdout) {
            prop_assert_eq!(mae(&projection.mean, &projection.mean), 0.0);
            prop_assert_eq!(rmse(&projection.mean, &projection.mean), 0.0);
            prop_assert_eq!(mape(&projection.mean, &projection.mean), 0.0);
        }
    }
}

// ── 5. Score ranges ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn scores_bounded(snapshot in arb_snapshot()) {
        let scores = score(&snapshot, None, None, &ScoringConfig::default());
        prop_assert!((0.0..=100.0).contains(&scores.trend_score));
        prop_assert!((0.0..=100.0).contains(&scores.risk_score));
        prop_assert!((0.0..=100.0).contains(&scores.confidence_score));
    }

    #[test]
    fn scores_bounded_with_band(closes in arb_walk(40, 150), horizon in 1usize..63) {
        let series = normalize(&points_from_closes(&closes), 20).unwrap();
        let cfg = ForecastConfig::default();
        let band = forecast_band(&ArimaForecaster::new(cfg.clone()), &series, horizon, &cfg).ok();
        let snapshot = IndicatorSnapshot::compute(&series, &Default::default());
        let scores = score(&snapshot, band.as_ref(), None, &ScoringConfig::default());
        prop_assert!((0.0..=100.0).contains(&scores.trend_score));
        prop_assert!((0.0..=100.0).contains(&scores.risk_score));
    }

    #[test]
    fn decision_table_never_panics(trend in -1e3..1e3_f64, risk in -1e3..1e3_f64) {
        let signal = ScoringConfig::default().signal(trend, risk);
        prop_assert!(matches!(signal, Signal::Buy | Signal::Hold | Signal::Sell));
    }
}

// ── 6. Decision-table totality on the grid ───────────────────────────

#[test]
fn decision_table_total_on_grid() {
    let cfg = ScoringConfig::default();
    let mut counts = [0usize; 3];
    for trend in (0..=100).step_by(10) {
        for risk in (0..=100).step_by(10) {
            let idx = match cfg.signal(trend as f64, risk as f64) {
                Signal::Buy => 0,
                Signal::Hold => 1,
                Signal::Sell => 2,
            };
            counts[idx] += 1;
        }
    }
    assert_eq!(counts.iter().sum::<usize>(), 121);
    assert!(counts.iter().all(|&c| c > 0));
}
