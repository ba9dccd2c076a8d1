//! Decision-Insight Orchestrator.
//!
//! One request runs `normalizing -> indicators | forecasting -> scoring ->
//! narrating`. Indicators run inline while the model fit runs on a blocking
//! worker. Normalization and request validation failures are fatal; a failed
//! model fit or narrative provider is absorbed and recorded on the bundle.
//!
//! Concurrent requests with the same cache key share one computation through
//! the in-flight map: the first caller initialises a per-key `OnceCell`, the
//! others await it and receive the same `Arc<InsightBundle>`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chartinsight_core::domain::{NormalizedSeries, PricePoint};
use chartinsight_core::fingerprint::{series_content_hash, CacheKey};
use chartinsight_core::forecast::{
    accuracy_for_holdout, forecast_band, holdout_accuracy, one_step_evaluation, AccuracyError,
    AccuracyReport, ArimaForecaster, EvaluationReport, ForecastBand, ForecastConfig, Forecaster,
};
use chartinsight_core::normalize::normalize;
use chartinsight_core::scoring::score;
use chartinsight_core::snapshot::IndicatorSnapshot;
use tokio::sync::OnceCell;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::bundle::{BundleMeta, InsightBundle, BUNDLE_SCHEMA_VERSION};
use crate::cache::{InsightCache, TtlCache};
use crate::config::EngineConfig;
use crate::error::InsightError;
use crate::narrative::{select_strategy, NarrativeInput, NarrativeRequest, NarrativeSettings};
use crate::provider::MarketDataProvider;

pub const DEFAULT_TIMEFRAME: &str = "1d";
const MAX_SYMBOL_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightRequest {
    pub symbol: String,
    pub timeframe: String,
    /// Trading periods ahead; the configured default when `None`.
    pub horizon: Option<usize>,
    pub narrative: NarrativeRequest,
}

impl InsightRequest {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe: DEFAULT_TIMEFRAME.to_string(),
            horizon: None,
            narrative: NarrativeRequest::Auto,
        }
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = Some(horizon);
        self
    }

    pub fn with_narrative(mut self, narrative: NarrativeRequest) -> Self {
        self.narrative = narrative;
        self
    }

    pub fn with_timeframe(mut self, timeframe: impl Into<String>) -> Self {
        self.timeframe = timeframe.into();
        self
    }
}

/// 1 to 20 characters of `[A-Za-z0-9.^=-]`; returns the upper-cased symbol.
pub fn validate_symbol(symbol: &str) -> Result<String, InsightError> {
    let symbol = symbol.trim();
    let valid_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '=' | '-');
    if symbol.is_empty() || symbol.len() > MAX_SYMBOL_LEN || !symbol.chars().all(valid_char) {
        return Err(InsightError::InvalidRequest(format!(
            "malformed symbol '{symbol}'"
        )));
    }
    Ok(symbol.to_ascii_uppercase())
}

fn validate_timeframe(timeframe: &str) -> Result<(), InsightError> {
    let well_formed = !timeframe.is_empty()
        && timeframe.len() <= 8
        && timeframe.chars().all(|c| c.is_ascii_alphanumeric());
    if !well_formed {
        return Err(InsightError::InvalidRequest(format!(
            "malformed timeframe '{timeframe}'"
        )));
    }
    Ok(())
}

type BuildResult = Result<Arc<InsightBundle>, InsightError>;
type Slot = Arc<OnceCell<BuildResult>>;

struct Inner {
    config: EngineConfig,
    narrative: NarrativeSettings,
    forecaster: Arc<dyn Forecaster>,
    cache: Arc<dyn InsightCache>,
    in_flight: Mutex<HashMap<CacheKey, Slot>>,
}

/// Cheap to clone; clones share configuration, cache and in-flight map.
#[derive(Clone)]
pub struct InsightEngine {
    inner: Arc<Inner>,
}

struct ForecastOutcome {
    band: Option<ForecastBand>,
    accuracy: Option<AccuracyReport>,
    degraded: bool,
}

impl ForecastOutcome {
    fn degraded() -> Self {
        Self {
            band: None,
            accuracy: None,
            degraded: true,
        }
    }
}

fn run_forecast(
    forecaster: &dyn Forecaster,
    series: &NormalizedSeries,
    horizon: usize,
    config: &ForecastConfig,
) -> ForecastOutcome {
    let band = match forecast_band(forecaster, series, horizon, config) {
        Ok(band) => band,
        Err(error) => {
            warn!(%error, forecaster = forecaster.name(), "forecast degraded");
            return ForecastOutcome::degraded();
        }
    };
    let accuracy = match holdout_accuracy(forecaster, series, horizon) {
        Ok(report) => report,
        Err(error) => {
            warn!(%error, "holdout backtest failed, accuracy omitted");
            None
        }
    };
    ForecastOutcome {
        band: Some(band),
        accuracy,
        degraded: false,
    }
}

impl InsightEngine {
    pub fn new(
        config: EngineConfig,
        narrative: NarrativeSettings,
        forecaster: Arc<dyn Forecaster>,
        cache: Arc<dyn InsightCache>,
    ) -> Result<Self, InsightError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                narrative,
                forecaster,
                cache,
                in_flight: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// ARIMA forecaster and a TTL cache built from `config`.
    pub fn with_defaults(
        config: EngineConfig,
        narrative: NarrativeSettings,
    ) -> Result<Self, InsightError> {
        let forecaster = Arc::new(ArimaForecaster::new(config.forecast.clone()));
        let cache = Arc::new(TtlCache::new(config.cache.ttl()));
        Self::new(config, narrative, forecaster, cache)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &Arc<dyn InsightCache> {
        &self.inner.cache
    }

    fn in_flight(&self) -> MutexGuard<'_, HashMap<CacheKey, Slot>> {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn normalize(&self, raw: &[PricePoint]) -> Result<NormalizedSeries, InsightError> {
        let _span = info_span!("stage", stage = "normalizing").entered();
        let series = normalize(raw, self.inner.config.min_points())?;
        debug!(raw = raw.len(), usable = series.len(), "series normalized");
        Ok(series)
    }

    /// Build (or reuse) the insight bundle for `request` over `raw` rows.
    #[tracing::instrument(skip_all, fields(symbol = %request.symbol))]
    pub async fn insight(&self, request: &InsightRequest, raw: &[PricePoint]) -> BuildResult {
        let config = &self.inner.config;
        let symbol = validate_symbol(&request.symbol)?;
        validate_timeframe(&request.timeframe)?;
        let horizon = request.horizon.unwrap_or(config.forecast.default_horizon);
        config
            .forecast
            .check_horizon(horizon)
            .map_err(|e| InsightError::InvalidRequest(e.to_string()))?;

        let series = self.normalize(raw)?;
        let key = CacheKey::new(
            &symbol,
            &request.timeframe,
            horizon,
            &request.narrative.to_string(),
            series_content_hash(&series, config.cache.hash_points),
        );

        if let Some(hit) = self.inner.cache.get(&key) {
            debug!(key = %key.digest(), "cache hit");
            return Ok(hit);
        }

        let slot = Arc::clone(self.in_flight().entry(key.clone()).or_default());

        let engine = self.clone();
        let build_key = key.clone();
        let timeframe = request.timeframe.clone();
        let narrative = request.narrative;
        let result = slot
            .get_or_init(|| async move {
                if let Some(hit) = engine.inner.cache.get(&build_key) {
                    return Ok(hit);
                }
                let bundle = Arc::new(
                    engine
                        .build(symbol, timeframe, horizon, narrative, series, &build_key)
                        .await,
                );
                engine.inner.cache.insert(build_key, Arc::clone(&bundle));
                Ok(bundle)
            })
            .await
            .clone();

        {
            let mut in_flight = self.in_flight();
            if in_flight.get(&key).is_some_and(|s| Arc::ptr_eq(s, &slot)) {
                in_flight.remove(&key);
            }
        }

        result
    }

    /// Fetch rows from `provider`, then [`insight`](Self::insight).
    pub async fn insight_from_provider(
        &self,
        request: &InsightRequest,
        provider: &dyn MarketDataProvider,
    ) -> BuildResult {
        let symbol = validate_symbol(&request.symbol)?;
        validate_timeframe(&request.timeframe)?;
        let raw = provider
            .fetch(&symbol, &request.timeframe)
            .instrument(info_span!("fetch", provider = provider.name()))
            .await?;
        self.insight(request, &raw).await
    }

    async fn build(
        &self,
        symbol: String,
        timeframe: String,
        horizon: usize,
        narrative_request: NarrativeRequest,
        series: NormalizedSeries,
        key: &CacheKey,
    ) -> InsightBundle {
        let config = &self.inner.config;
        let series = Arc::new(series);

        let forecast_task = {
            let forecaster = Arc::clone(&self.inner.forecaster);
            let series = Arc::clone(&series);
            let forecast_config = config.forecast.clone();
            let span = info_span!("stage", stage = "forecasting");
            tokio::task::spawn_blocking(move || {
                let _guard = span.enter();
                run_forecast(forecaster.as_ref(), &series, horizon, &forecast_config)
            })
        };

        let snapshot = {
            let _span = info_span!("stage", stage = "indicators").entered();
            IndicatorSnapshot::compute(&series, &config.indicators)
        };

        let forecast = match forecast_task.await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(%error, "forecast worker failed");
                ForecastOutcome::degraded()
            }
        };

        let scores = {
            let _span = info_span!("stage", stage = "scoring").entered();
            score(
                &snapshot,
                forecast.band.as_ref(),
                forecast.accuracy.as_ref(),
                &config.scoring,
            )
        };

        let band_summary = forecast.band.as_ref().and_then(ForecastBand::summary);
        let input = NarrativeInput {
            symbol: &symbol,
            snapshot: &snapshot,
            band: band_summary.as_ref(),
            accuracy: forecast.accuracy.as_ref(),
            scores: &scores,
        };
        let strategy = select_strategy(narrative_request, &self.inner.narrative);
        let narrative = strategy
            .generate(&input)
            .instrument(info_span!("stage", stage = "narrating", strategy = strategy.name()))
            .await;

        info!(
            symbol = %symbol,
            horizon,
            signal = ?scores.signal,
            forecast_degraded = forecast.degraded,
            narrative_mode = %narrative.mode,
            "insight ready"
        );

        InsightBundle {
            meta: BundleMeta {
                schema_version: BUNDLE_SCHEMA_VERSION,
                symbol,
                timeframe,
                horizon,
                generated_at: chrono::Utc::now(),
                forecast_degraded: forecast.degraded,
                narrative_mode: narrative.mode,
                forecaster: self.inner.forecaster.name().to_string(),
                cache_key: key.digest(),
            },
            indicators: snapshot,
            band: forecast
                .band
                .as_ref()
                .map(|b| b.points().to_vec())
                .unwrap_or_default(),
            band_summary,
            accuracy: forecast.accuracy,
            scores,
            narrative,
        }
    }

    /// Holdout backtest over the last `holdout` closes.
    #[tracing::instrument(skip(self, raw))]
    pub async fn accuracy(
        &self,
        symbol: &str,
        raw: &[PricePoint],
        holdout: usize,
    ) -> Result<AccuracyReport, InsightError> {
        validate_symbol(symbol)?;
        let series = self.normalize(raw)?;
        let forecaster = Arc::clone(&self.inner.forecaster);
        tokio::task::spawn_blocking(move || accuracy_for_holdout(forecaster.as_ref(), &series, holdout))
            .await
            .map_err(|e| InsightError::NotComputable(format!("accuracy worker failed: {e}")))?
            .map_err(accuracy_error)
    }

    /// One-step walk-forward evaluation over the last `test_points` closes.
    #[tracing::instrument(skip(self, raw))]
    pub async fn evaluate(
        &self,
        symbol: &str,
        raw: &[PricePoint],
        test_points: usize,
    ) -> Result<EvaluationReport, InsightError> {
        validate_symbol(symbol)?;
        let series = self.normalize(raw)?;
        let forecaster = Arc::clone(&self.inner.forecaster);
        tokio::task::spawn_blocking(move || {
            one_step_evaluation(forecaster.as_ref(), &series, test_points)
        })
        .await
        .map_err(|e| InsightError::NotComputable(format!("evaluation worker failed: {e}")))?
        .map_err(accuracy_error)
    }
}

fn accuracy_error(e: AccuracyError) -> InsightError {
    match e {
        AccuracyError::InvalidHoldout => InsightError::InvalidRequest(e.to_string()),
        AccuracyError::NotComputable { .. } | AccuracyError::Forecast(_) => {
            InsightError::NotComputable(e.to_string())
        }
    }
}
