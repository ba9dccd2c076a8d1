//! Simple moving average of closes. Warmup: `period - 1` points.

use super::indicator::Indicator;
use crate::domain::PricePoint;

#[derive(Debug, Clone)]
pub struct Sma {
    window: usize,
    label: String,
}

impl Sma {
    /// A zero window is treated as 1.
    pub fn new(period: usize) -> Self {
        let window = period.max(1);
        Self {
            window,
            label: format!("sma_{window}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.label
    }

    fn lookback(&self) -> usize {
        self.window - 1
    }

    fn compute(&self, points: &[PricePoint]) -> Vec<f64> {
        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        sma_of_series(&closes, self.window)
    }
}

/// Trailing mean over any series (closes, volumes). A window holding a NaN
/// yields NaN; the next clean window is valid again.
pub fn sma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let width = period as f64;
    let mut total: f64 = values[..period].iter().sum();
    out[period - 1] = total / width;

    for end in period..values.len() {
        total += values[end] - values[end - period];
        if total.is_nan() {
            // NaN never cancels out of a running sum.
            total = values[end + 1 - period..=end].iter().sum();
        }
        out[end] = total / width;
    }
    out
}
