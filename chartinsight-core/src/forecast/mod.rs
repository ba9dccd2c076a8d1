//! Forecast Engine.
//!
//! - [`Forecaster`]: the model-fit seam (fit on closes, project H steps).
//! - [`ArimaForecaster`]: ARIMA(1,1,0) with drift on log closes.
//! - [`forecast_band`]: validates the horizon and dates the projection.
//! - [`accuracy`]: holdout backtest and one-step walk-forward evaluation.

pub mod accuracy;
pub mod calendar;
pub mod model;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::NormalizedSeries;

pub use accuracy::{
    accuracy_for_holdout, holdout_accuracy, one_step_evaluation, AccuracyError, AccuracyReport,
    EvaluationReport,
};
pub use calendar::next_business_days;
pub use model::{ArFit, ArimaForecaster};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    #[error("model fit failed: {0}")]
    ModelFit(String),

    #[error("horizon {horizon} outside 1..={max}")]
    InvalidHorizon { horizon: usize, max: usize },
}

/// Forecast Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Minimum closes required to fit.
    pub min_points: usize,
    pub max_horizon: usize,
    pub default_horizon: usize,
    /// Two-sided confidence level of the band, in (0, 1).
    pub confidence: f64,
    /// Ridge penalty on the AR coefficient, scaled by the sample size.
    pub ridge: f64,
    /// Bound on |phi|.
    pub max_ar: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            min_points: 20,
            max_horizon: 126,
            default_horizon: 63,
            confidence: 0.90,
            ridge: 1e-6,
            max_ar: 0.95,
        }
    }
}

impl ForecastConfig {
    pub fn check_horizon(&self, horizon: usize) -> Result<(), ForecastError> {
        if horizon == 0 || horizon > self.max_horizon {
            return Err(ForecastError::InvalidHorizon {
                horizon,
                max: self.max_horizon,
            });
        }
        Ok(())
    }
}

/// Undated projection: one entry per future step.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub mean: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Projection {
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }
}

/// The model-fit seam. Implementations must be pure over their inputs.
pub trait Forecaster: Send + Sync {
    fn name(&self) -> &str;

    /// Fit on `closes` (oldest first) and project `horizon` steps ahead.
    fn forecast(&self, closes: &[f64], horizon: usize) -> Result<Projection, ForecastError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandPoint {
    pub time: NaiveDate,
    pub lower: f64,
    pub mean: f64,
    pub upper: f64,
}

impl BandPoint {
    /// (upper - lower) / mean, in percent.
    pub fn width_pct(&self) -> f64 {
        if self.mean > 0.0 {
            (self.upper - self.lower) / self.mean * 100.0
        } else {
            0.0
        }
    }
}

/// Dated forecast band. Invariants: dates strictly after the series end and
/// strictly increasing; `lower <= mean <= upper` at every point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForecastBand {
    points: Vec<BandPoint>,
}

impl ForecastBand {
    pub fn points(&self) -> &[BandPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&BandPoint> {
        self.points.last()
    }

    /// Band width at the horizon end, in percent of the mean.
    pub fn terminal_width_pct(&self) -> Option<f64> {
        self.last().map(BandPoint::width_pct)
    }

    /// Terminal mean vs `reference` (usually the last close), in percent.
    pub fn slope_pct(&self, reference: f64) -> Option<f64> {
        if reference <= 0.0 {
            return None;
        }
        self.last().map(|p| (p.mean / reference - 1.0) * 100.0)
    }

    pub fn summary(&self) -> Option<BandSummary> {
        let last = self.last()?;
        let upper = self.points.iter().map(|p| p.upper).fold(f64::NEG_INFINITY, f64::max);
        let lower = self.points.iter().map(|p| p.lower).fold(f64::INFINITY, f64::min);
        Some(BandSummary {
            horizon_label: horizon_label(self.points.len()),
            upper,
            lower,
            center: last.mean,
        })
    }
}

/// Compact view of a band for narrative and alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandSummary {
    pub horizon_label: String,
    /// Max upper over the band.
    pub upper: f64,
    /// Min lower over the band.
    pub lower: f64,
    /// Mean at the last step.
    pub center: f64,
}

impl BandSummary {
    /// (upper - lower) / center, in percent.
    pub fn span_pct(&self) -> Option<f64> {
        (self.center > 0.0).then(|| (self.upper - self.lower) / self.center * 100.0)
    }
}

fn horizon_label(steps: usize) -> String {
    match steps {
        63 => "3-month".to_string(),
        21 => "1-month".to_string(),
        126 => "6-month".to_string(),
        n => format!("{n}-period"),
    }
}

/// Fit `forecaster` on the whole series and date the projection on business days.
pub fn forecast_band(
    forecaster: &dyn Forecaster,
    series: &NormalizedSeries,
    horizon: usize,
    config: &ForecastConfig,
) -> Result<ForecastBand, ForecastError> {
    config.check_horizon(horizon)?;
    let last_date = series
        .last_date()
        .ok_or_else(|| ForecastError::ModelFit("empty series".to_string()))?;

    let projection = forecaster.forecast(&series.closes(), horizon)?;
    if projection.len() != horizon
        || projection.lower.len() != horizon
        || projection.upper.len() != horizon
    {
        return Err(ForecastError::ModelFit(format!(
            "{} returned {} steps, expected {horizon}",
            forecaster.name(),
            projection.len()
        )));
    }

    let dates = next_business_days(last_date, horizon);
    let mut points = Vec::with_capacity(horizon);
    for (i, time) in dates.into_iter().enumerate() {
        let (lower, mean, upper) = (projection.lower[i], projection.mean[i], projection.upper[i]);
        if !(lower.is_finite() && mean.is_finite() && upper.is_finite())
            || lower > mean
            || mean > upper
        {
            return Err(ForecastError::ModelFit(format!(
                "non-finite or unordered band at step {}",
                i + 1
            )));
        }
        points.push(BandPoint {
            time,
            lower,
            mean,
            upper,
        });
    }

    Ok(ForecastBand { points })
}
