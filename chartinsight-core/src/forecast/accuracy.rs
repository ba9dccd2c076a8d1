//! Forecast accuracy: holdout backtest and one-step walk-forward evaluation.
//!
//! Both refit the model on a strict prefix of the series, so no evaluated
//! forecast ever sees the closes it is compared against.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ForecastError, Forecaster, Projection};
use crate::domain::NormalizedSeries;

/// Minimum training points kept ahead of the walk-forward test window.
pub const WALK_FORWARD_MIN_TRAIN: usize = 30;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccuracyError {
    #[error("accuracy not computable: {available} points available, {required} required")]
    NotComputable { required: usize, available: usize },

    #[error("holdout window must be at least 1")]
    InvalidHoldout,

    #[error(transparent)]
    Forecast(#[from] ForecastError),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyReport {
    pub mae: f64,
    pub rmse: f64,
    /// Mean absolute percentage error, in percent.
    pub mape: f64,
    /// Share of held-out closes inside [lower, upper], in percent.
    pub coverage_pct: f64,
    /// Number of held-out points.
    pub holdout: usize,
}

/// Result of the one-step walk-forward evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub test_points: usize,
    pub coverage_pct: f64,
    pub rmse: f64,
    pub mape: f64,
}

pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    mean(actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()))
}

pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    mean(actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2))).sqrt()
}

/// In percent; pairs with a zero actual are skipped.
pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    mean(
        actual
            .iter()
            .zip(predicted)
            .filter(|(a, _)| **a != 0.0)
            .map(|(a, p)| ((a - p) / a).abs() * 100.0),
    )
}

/// Share of `actual` inside `[lower, upper]`, in percent.
pub fn coverage_pct(actual: &[f64], lower: &[f64], upper: &[f64]) -> f64 {
    mean(
        actual
            .iter()
            .zip(lower.iter().zip(upper))
            .map(|(a, (l, u))| if l <= a && a <= u { 100.0 } else { 0.0 }),
    )
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn report(actual: &[f64], projection: &Projection) -> AccuracyReport {
    AccuracyReport {
        mae: mae(actual, &projection.mean),
        rmse: rmse(actual, &projection.mean),
        mape: mape(actual, &projection.mean),
        coverage_pct: coverage_pct(actual, &projection.lower, &projection.upper),
        holdout: actual.len(),
    }
}

fn backtest(
    forecaster: &dyn Forecaster,
    closes: &[f64],
    holdout: usize,
) -> Result<AccuracyReport, ForecastError> {
    let split = closes.len() - holdout;
    let projection = forecaster.forecast(&closes[..split], holdout)?;
    Ok(report(&closes[split..], &projection))
}

/// Backtest for an insight request with horizon `horizon`.
///
/// Holds out the last `min(horizon, len / 3)` closes. Returns `Ok(None)` when
/// the series is shorter than `2 * horizon`.
pub fn holdout_accuracy(
    forecaster: &dyn Forecaster,
    series: &NormalizedSeries,
    horizon: usize,
) -> Result<Option<AccuracyReport>, ForecastError> {
    let n = series.len();
    if horizon == 0 || n < 2 * horizon {
        return Ok(None);
    }
    let holdout = horizon.min(n / 3);
    if holdout == 0 {
        return Ok(None);
    }
    backtest(forecaster, &series.closes(), holdout).map(Some)
}

/// Backtest over an explicit holdout window (accuracy-only requests).
pub fn accuracy_for_holdout(
    forecaster: &dyn Forecaster,
    series: &NormalizedSeries,
    holdout: usize,
) -> Result<AccuracyReport, AccuracyError> {
    if holdout == 0 {
        return Err(AccuracyError::InvalidHoldout);
    }
    let required = 2 * holdout;
    if series.len() < required {
        return Err(AccuracyError::NotComputable {
            required,
            available: series.len(),
        });
    }
    Ok(backtest(forecaster, &series.closes(), holdout)?)
}

/// Walk forward over the last `test_points` closes: refit on everything
/// before t, forecast one step, compare with close[t].
pub fn one_step_evaluation(
    forecaster: &dyn Forecaster,
    series: &NormalizedSeries,
    test_points: usize,
) -> Result<EvaluationReport, AccuracyError> {
    if test_points == 0 {
        return Err(AccuracyError::InvalidHoldout);
    }
    let n = series.len();
    let required = test_points + WALK_FORWARD_MIN_TRAIN + 1;
    if n < required {
        return Err(AccuracyError::NotComputable {
            required,
            available: n,
        });
    }

    let closes = series.closes();
    let mut actual = Vec::with_capacity(test_points);
    let mut mean_hat = Vec::with_capacity(test_points);
    let mut lower = Vec::with_capacity(test_points);
    let mut upper = Vec::with_capacity(test_points);

    for t in (n - test_points)..n {
        let step = forecaster.forecast(&closes[..t], 1)?;
        actual.push(closes[t]);
        mean_hat.push(step.mean[0]);
        lower.push(step.lower[0]);
        upper.push(step.upper[0]);
    }

    Ok(EvaluationReport {
        test_points,
        coverage_pct: coverage_pct(&actual, &lower, &upper),
        rmse: rmse(&actual, &mean_hat),
        mape: mape(&actual, &mean_hat),
    })
}
