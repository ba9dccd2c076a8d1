//! Exponential smoothing: the EMA line and Wilder's running average.
//!
//! Both are the same recursion `s[t] = a * x[t] + (1 - a) * s[t-1]` and differ
//! only in the weight: `2 / (period + 1)` for the EMA, `1 / period` for Wilder.
//! The recursion is seeded with the plain mean of the first run of `period`
//! finite inputs and sits on the last index of that run.

use super::indicator::Indicator;
use crate::domain::PricePoint;

/// EMA of closes. Warmup: `period - 1` points.
#[derive(Debug, Clone)]
pub struct Ema {
    window: usize,
    label: String,
}

impl Ema {
    /// A zero window is treated as 1.
    pub fn new(period: usize) -> Self {
        let window = period.max(1);
        Self {
            window,
            label: format!("ema_{window}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.label
    }

    fn lookback(&self) -> usize {
        self.window - 1
    }

    fn compute(&self, points: &[PricePoint]) -> Vec<f64> {
        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        ema_of_series(&closes, self.window)
    }
}

/// EMA over any series. Leading NaNs (e.g. the warmup of a MACD line) are
/// skipped before seeding.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    smooth(values, period, |p| 2.0 / (p + 1.0))
}

/// Wilder's running average, used by ATR and RSI.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    smooth(values, period, |p| 1.0 / p)
}

fn smooth(values: &[f64], period: usize, weight: impl Fn(f64) -> f64) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let Some(first) = values
        .windows(period)
        .position(|run| run.iter().all(|v| v.is_finite()))
    else {
        return out;
    };

    let seed_at = first + period - 1;
    let mut level = values[first..=seed_at].iter().sum::<f64>() / period as f64;
    out[seed_at] = level;

    let a = weight(period as f64);
    for (slot, &x) in out[seed_at + 1..].iter_mut().zip(&values[seed_at + 1..]) {
        // A gap after seeding leaves the rest undefined.
        if !x.is_finite() {
            break;
        }
        level = a * x + (1.0 - a) * level;
        *slot = level;
    }
    out
}
