use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chartinsight_core::forecast::{ArimaForecaster, ForecastError, Forecaster, Projection};
use chartinsight_core::PricePoint;
use chartinsight_runner::provider::synthetic::generate_random_walk;
use chartinsight_runner::{
    EngineConfig, InsightCache, InsightEngine, InsightError, InsightRequest, NarrativeMode,
    NarrativeRequest, NarrativeSettings, TtlCache,
};
use chrono::NaiveDate;

/// Wraps the ARIMA forecaster, counting fits and optionally stalling each one.
struct CountingForecaster {
    inner: ArimaForecaster,
    calls: AtomicUsize,
    delay: Duration,
}

impl CountingForecaster {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: ArimaForecaster::default(),
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Forecaster for CountingForecaster {
    fn name(&self) -> &str {
        "counting"
    }

    fn forecast(&self, closes: &[f64], horizon: usize) -> Result<Projection, ForecastError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.inner.forecast(closes, horizon)
    }
}

fn end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
}

fn walk(symbol: &str, n: usize) -> Vec<PricePoint> {
    generate_random_walk(symbol, end_date(), n)
}

fn engine_with(
    forecaster: Arc<CountingForecaster>,
    ttl: Duration,
) -> (InsightEngine, Arc<TtlCache>) {
    let cache = Arc::new(TtlCache::new(ttl));
    let engine = InsightEngine::new(
        EngineConfig::default(),
        NarrativeSettings::rule_only(5),
        forecaster,
        Arc::clone(&cache) as Arc<dyn InsightCache>,
    )
    .unwrap();
    (engine, cache)
}

// ── 1. Coalescing ─────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_requests_fit_once() {
    // 100 points with horizon 63 is too short for a holdout backtest, so the
    // only forecaster call is the band fit itself.
    let forecaster = CountingForecaster::new(Duration::from_millis(300));
    // No caching: only coalescing can keep the fit count at one.
    let (engine, _cache) = engine_with(Arc::clone(&forecaster), Duration::ZERO);
    let raw = Arc::new(walk("SPY", 100));
    let request = InsightRequest::new("SPY").with_horizon(63);

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let engine = engine.clone();
        let raw = Arc::clone(&raw);
        let request = request.clone();
        tasks.spawn(async move { engine.insight(&request, &raw).await });
    }

    let mut bundles = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        bundles.push(joined.unwrap().unwrap());
    }

    assert_eq!(forecaster.calls(), 1);
    assert_eq!(bundles.len(), 8);
    for bundle in &bundles[1..] {
        assert!(Arc::ptr_eq(&bundles[0], bundle));
    }
    assert!(bundles[0].accuracy.is_none());
    assert!(!bundles[0].meta.forecast_degraded);

    // The in-flight entry is gone once the build completes.
    engine.insight(&request, &raw).await.unwrap();
    assert_eq!(forecaster.calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_share_band_and_backtest() {
    // 300 points covers twice the horizon, so each build fits the band and
    // then refits once for the holdout backtest.
    let forecaster = CountingForecaster::new(Duration::from_millis(200));
    let (engine, _cache) = engine_with(Arc::clone(&forecaster), Duration::ZERO);
    let raw = Arc::new(walk("DIA", 300));
    let request = InsightRequest::new("DIA").with_horizon(63);

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let engine = engine.clone();
        let raw = Arc::clone(&raw);
        let request = request.clone();
        tasks.spawn(async move { engine.insight(&request, &raw).await });
    }

    let mut bundles = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        bundles.push(joined.unwrap().unwrap());
    }

    assert_eq!(forecaster.calls(), 2);
    for bundle in &bundles[1..] {
        assert!(Arc::ptr_eq(&bundles[0], bundle));
    }
    let accuracy = bundles[0].accuracy.expect("backtest ran");
    assert_eq!(accuracy.holdout, 63);
    assert!(!bundles[0].meta.forecast_degraded);
}

#[tokio::test]
async fn two_joined_requests_share_one_bundle() {
    let forecaster = CountingForecaster::new(Duration::from_millis(50));
    let (engine, _cache) = engine_with(Arc::clone(&forecaster), Duration::from_secs(300));
    let raw = walk("QQQ", 100);
    let request = InsightRequest::new("qqq").with_horizon(63);

    let (a, b) = tokio::join!(engine.insight(&request, &raw), engine.insight(&request, &raw));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(forecaster.calls(), 1);
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(
        serde_json::to_string(&*a).unwrap(),
        serde_json::to_string(&*b).unwrap()
    );
}

#[tokio::test]
async fn different_keys_do_not_coalesce() {
    let forecaster = CountingForecaster::new(Duration::ZERO);
    let (engine, cache) = engine_with(Arc::clone(&forecaster), Duration::from_secs(300));
    let raw = walk("IWM", 100);

    let rule = InsightRequest::new("IWM")
        .with_horizon(63)
        .with_narrative(NarrativeRequest::Rule);
    let auto = InsightRequest::new("IWM").with_horizon(63);
    let a = engine.insight(&rule, &raw).await.unwrap();
    let b = engine.insight(&auto, &raw).await.unwrap();

    assert_eq!(forecaster.calls(), 2);
    assert_ne!(a.meta.cache_key, b.meta.cache_key);
    assert_eq!(cache.len(), 2);
}

// ── 2. Cache lifecycle ───────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn cache_serves_until_ttl_expires() {
    let forecaster = CountingForecaster::new(Duration::ZERO);
    let (engine, _cache) = engine_with(Arc::clone(&forecaster), Duration::from_secs(60));
    let raw = walk("SPY", 100);
    let request = InsightRequest::new("SPY").with_horizon(63);

    let first = engine.insight(&request, &raw).await.unwrap();
    let second = engine.insight(&request, &raw).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(forecaster.calls(), 1);

    tokio::time::advance(Duration::from_secs(61)).await;
    let third = engine.insight(&request, &raw).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(forecaster.calls(), 2);
}

#[tokio::test]
async fn new_data_changes_the_key() {
    let forecaster = CountingForecaster::new(Duration::ZERO);
    let (engine, _cache) = engine_with(Arc::clone(&forecaster), Duration::from_secs(300));
    let raw = walk("SPY", 100);
    let request = InsightRequest::new("SPY").with_horizon(63);

    let before = engine.insight(&request, &raw).await.unwrap();
    let mut extended = raw.clone();
    let mut next = *extended.last().unwrap();
    next.date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
    next.close *= 1.01;
    extended.push(next);
    let after = engine.insight(&request, &extended).await.unwrap();

    assert_ne!(before.meta.cache_key, after.meta.cache_key);
    assert_eq!(forecaster.calls(), 2);
}

// ── 3. Degradation and failures ──────────────────────────────────────

#[tokio::test]
async fn constant_series_degrades_forecast_with_low_risk() {
    let raw: Vec<PricePoint> = walk("FLAT", 30)
        .into_iter()
        .map(|p| PricePoint {
            open: 50.0,
            high: 50.0,
            low: 50.0,
            close: 50.0,
            volume: 1_000.0,
            ..p
        })
        .collect();
    let engine =
        InsightEngine::with_defaults(EngineConfig::default(), NarrativeSettings::rule_only(5))
            .unwrap();

    let bundle = engine.insight(&InsightRequest::new("FLAT"), &raw).await.unwrap();

    assert!(bundle.meta.forecast_degraded);
    assert!(bundle.band.is_empty());
    assert!(bundle.band_summary.is_none());
    assert!(bundle.accuracy.is_none());
    assert_eq!(bundle.scores.risk_label, chartinsight_core::RiskLabel::Low);
    assert!(bundle.narrative.summary.contains("no forecast band"));
}

#[tokio::test]
async fn short_history_is_insufficient_data() {
    let engine =
        InsightEngine::with_defaults(EngineConfig::default(), NarrativeSettings::rule_only(5))
            .unwrap();
    let err = engine
        .insight(&InsightRequest::new("SPY"), &walk("SPY", 10))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        InsightError::InsufficientData {
            required: 30,
            available: 10
        }
    );
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
    let engine =
        InsightEngine::with_defaults(EngineConfig::default(), NarrativeSettings::rule_only(5))
            .unwrap();
    let raw = walk("SPY", 100);

    for request in [
        InsightRequest::new("S P Y"),
        InsightRequest::new(""),
        InsightRequest::new("SPY").with_horizon(0),
        InsightRequest::new("SPY").with_horizon(10_000),
        InsightRequest::new("SPY").with_timeframe(""),
    ] {
        let err = engine.insight(&request, &raw).await.unwrap_err();
        assert!(
            matches!(err, InsightError::InvalidRequest(_)),
            "{request:?} -> {err:?}"
        );
    }
}

// ── 4. Bundle contents ───────────────────────────────────────────────

#[tokio::test]
async fn missing_credentials_auto_mode_yields_full_rule_bundle() {
    let engine =
        InsightEngine::with_defaults(EngineConfig::default(), NarrativeSettings::rule_only(5))
            .unwrap();
    let bundle = engine
        .insight(&InsightRequest::new("spy"), &walk("SPY", 300))
        .await
        .unwrap();

    assert_eq!(bundle.narrative.mode, NarrativeMode::Rule);
    assert_eq!(bundle.meta.symbol, "SPY");
    assert_eq!(bundle.meta.horizon, 63);
    assert_eq!(bundle.band.len(), 63);
    assert!(bundle.band[0].time > bundle.indicators.as_of);
    assert!(bundle.accuracy.is_some());

    let json = serde_json::to_value(&*bundle).unwrap();
    assert_eq!(json["meta"]["narrativeMode"], "rule");
    assert_eq!(json["meta"]["forecastDegraded"], false);
    assert_eq!(json["narrative"]["mode"], "rule");
    for key in ["summary", "quickNotes", "actions", "alerts"] {
        assert!(json["narrative"].get(key).is_some(), "narrative.{key}");
    }
    for key in ["trendScore", "riskScore", "confidenceScore", "riskLabel", "signal"] {
        assert!(json["scores"].get(key).is_some(), "scores.{key}");
    }
    for key in ["mae", "rmse", "mape"] {
        assert!(json["accuracy"][key].is_number(), "accuracy.{key}");
    }
    let first_band = &json["band"][0];
    for key in ["time", "lower", "mean", "upper"] {
        assert!(first_band.get(key).is_some(), "band.{key}");
    }
    assert!(json["indicators"]["rsi14"].is_number());
}

#[tokio::test]
async fn band_invariants_hold_in_bundle() {
    let engine =
        InsightEngine::with_defaults(EngineConfig::default(), NarrativeSettings::rule_only(5))
            .unwrap();
    let bundle = engine
        .insight(&InsightRequest::new("DIA").with_horizon(21), &walk("DIA", 250))
        .await
        .unwrap();

    assert_eq!(bundle.band.len(), 21);
    for window in bundle.band.windows(2) {
        assert!(window[0].time < window[1].time);
    }
    for p in &bundle.band {
        assert!(p.lower <= p.mean && p.mean <= p.upper);
    }
    let s = &bundle.scores;
    for v in [s.trend_score, s.risk_score, s.confidence_score] {
        assert!((0.0..=100.0).contains(&v));
    }
}

// ── 5. Accuracy and evaluation requests ──────────────────────────────

#[tokio::test]
async fn accuracy_request() {
    let engine =
        InsightEngine::with_defaults(EngineConfig::default(), NarrativeSettings::rule_only(5))
            .unwrap();
    let report = engine.accuracy("SPY", &walk("SPY", 200), 20).await.unwrap();
    assert_eq!(report.holdout, 20);
    assert!(report.mae >= 0.0 && report.rmse >= report.mae);

    let err = engine.accuracy("SPY", &walk("SPY", 30), 20).await.unwrap_err();
    assert!(matches!(err, InsightError::NotComputable(_)));

    let err = engine.accuracy("SPY", &walk("SPY", 60), 0).await.unwrap_err();
    assert!(matches!(err, InsightError::InvalidRequest(_)));
}

#[tokio::test]
async fn evaluation_request() {
    let engine =
        InsightEngine::with_defaults(EngineConfig::default(), NarrativeSettings::rule_only(5))
            .unwrap();
    let report = engine.evaluate("SPY", &walk("SPY", 120), 30).await.unwrap();
    assert_eq!(report.test_points, 30);
    assert!((0.0..=100.0).contains(&report.coverage_pct));

    let err = engine.evaluate("SPY", &walk("SPY", 50), 30).await.unwrap_err();
    assert!(matches!(err, InsightError::NotComputable(_)));
}
