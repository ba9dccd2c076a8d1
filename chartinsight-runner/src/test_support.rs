//! Shared fixtures for unit tests.

use chartinsight_core::domain::{NormalizedSeries, PricePoint};
use chartinsight_core::forecast::{
    forecast_band, next_business_days, ArimaForecaster, BandSummary, ForecastBand, ForecastConfig,
};
use chartinsight_core::normalize::normalize;
use chartinsight_core::scoring::{score, ScoreBundle, ScoringConfig};
use chartinsight_core::snapshot::{IndicatorConfig, IndicatorSnapshot};
use chrono::NaiveDate;

use crate::narrative::NarrativeInput;

/// Business-day rows starting 2024-01-01 with a small intraday range.
pub(crate) fn points(closes: &[f64]) -> Vec<PricePoint> {
    let start = NaiveDate::from_ymd_opt(2023, 12, 29).unwrap_or_default();
    next_business_days(start, closes.len())
        .into_iter()
        .zip(closes)
        .enumerate()
        .map(|(i, (date, &close))| PricePoint {
            date,
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 1_000_000.0 + (i % 7) as f64 * 50_000.0,
        })
        .collect()
}

/// Drifting sine wave; `drift` is the per-step fractional change.
pub(crate) fn wavy_closes(n: usize, drift: f64) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 * (1.0 + drift).powi(i as i32) + 2.0 * ((i as f64) * 0.45).sin())
        .collect()
}

pub(crate) struct Fixture {
    pub series: NormalizedSeries,
    pub snapshot: IndicatorSnapshot,
    pub band: Option<ForecastBand>,
    pub summary: Option<BandSummary>,
    pub scores: ScoreBundle,
}

impl Fixture {
    pub fn from_closes(closes: &[f64]) -> Self {
        let series = normalize(&points(closes), 1).unwrap();
        let snapshot = IndicatorSnapshot::compute(&series, &IndicatorConfig::default());
        let band = forecast_band(
            &ArimaForecaster::default(),
            &series,
            21,
            &ForecastConfig::default(),
        )
        .ok();
        let summary = band.as_ref().and_then(ForecastBand::summary);
        let scores = score(&snapshot, band.as_ref(), None, &ScoringConfig::default());
        Self {
            series,
            snapshot,
            band,
            summary,
            scores,
        }
    }

    pub fn input(&self) -> NarrativeInput<'_> {
        NarrativeInput {
            symbol: "TEST",
            snapshot: &self.snapshot,
            band: self.summary.as_ref(),
            accuracy: None,
            scores: &self.scores,
        }
    }
}

pub(crate) fn sample_bundle(symbol: &str) -> crate::bundle::InsightBundle {
    use crate::bundle::{BundleMeta, InsightBundle, BUNDLE_SCHEMA_VERSION};
    use crate::narrative::RuleNarrator;

    let fx = Fixture::from_closes(&wavy_closes(120, 0.001));
    let narrative = RuleNarrator::new(5).render(&fx.input());
    InsightBundle {
        meta: BundleMeta {
            schema_version: BUNDLE_SCHEMA_VERSION,
            symbol: symbol.to_string(),
            timeframe: "1d".to_string(),
            horizon: 21,
            generated_at: chrono::Utc::now(),
            forecast_degraded: fx.band.is_none(),
            narrative_mode: narrative.mode,
            forecaster: "arima(1,1,0)+drift".to_string(),
            cache_key: "0000000000000000".to_string(),
        },
        indicators: fx.snapshot.clone(),
        band: fx.band.as_ref().map(|b| b.points().to_vec()).unwrap_or_default(),
        band_summary: fx.summary.clone(),
        accuracy: None,
        scores: fx.scores.clone(),
        narrative,
    }
}
