//! Rate of change in percent: `(close[t] / close[t - period] - 1) * 100`.

use super::indicator::Indicator;
use crate::domain::PricePoint;

#[derive(Debug, Clone)]
pub struct Momentum {
    window: usize,
    label: String,
}

impl Momentum {
    /// A zero window is treated as 1.
    pub fn new(period: usize) -> Self {
        let window = period.max(1);
        Self {
            window,
            label: format!("momentum_{window}_pct"),
        }
    }
}

impl Indicator for Momentum {
    fn name(&self) -> &str {
        &self.label
    }

    fn lookback(&self) -> usize {
        self.window
    }

    fn compute(&self, points: &[PricePoint]) -> Vec<f64> {
        let warmup = self.window.min(points.len());
        let changes = points.iter().zip(&points[warmup..]).map(|(then, now)| {
            if then.close > 0.0 && now.close.is_finite() {
                (now.close / then.close - 1.0) * 100.0
            } else {
                f64::NAN
            }
        });
        std::iter::repeat(f64::NAN).take(warmup).chain(changes).collect()
    }
}
