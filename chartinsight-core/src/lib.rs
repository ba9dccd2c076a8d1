//! ChartInsight Core: the synchronous half of the decision-insight engine.
//!
//! - Domain types (price points, normalized series)
//! - Series Normalizer
//! - Indicator Library and the versioned `IndicatorSnapshot`
//! - Forecast Engine (model fit, dated band, holdout accuracy, walk-forward evaluation)
//! - Scoring & Classification (composite scores, labels, decision table)
//! - Cache-key fingerprinting
//!
//! Everything here is a pure function over its inputs: no I/O, no shared state.

pub mod domain;
pub mod fingerprint;
pub mod forecast;
pub mod indicators;
pub mod normalize;
pub mod scoring;
pub mod snapshot;

pub use domain::{NormalizedSeries, PricePoint};
pub use forecast::{
    AccuracyReport, ArimaForecaster, BandPoint, BandSummary, ForecastBand, ForecastConfig,
    ForecastError, Forecaster,
};
pub use normalize::{normalize, NormalizeError};
pub use scoring::{score, RiskLabel, ScoreBundle, ScoringConfig, Signal};
pub use snapshot::{IndicatorConfig, IndicatorSnapshot};
