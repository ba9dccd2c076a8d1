//! Maximum Drawdown (MDD).
//!
//! At each index t: max over s <= t of (peak_to_date[s] - close[s]) / peak_to_date[s],
//! where peak_to_date is the running max of close. With a lookback window the
//! peak and the max are restricted to the trailing `window` closes.
//! Output is a fraction in [0, 1]; 0 means no drawdown.

use super::indicator::Indicator;
use crate::domain::PricePoint;

#[derive(Debug, Clone)]
pub struct MaxDrawdown {
    window: Option<usize>,
    name: String,
}

impl MaxDrawdown {
    /// Drawdown over the whole history up to each index.
    pub fn expanding() -> Self {
        Self {
            window: None,
            name: "mdd".to_string(),
        }
    }

    /// Drawdown over the trailing `window` closes; a zero window is treated as 1.
    pub fn rolling(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window: Some(window),
            name: format!("mdd_{window}"),
        }
    }
}

/// Maximum drawdown of a single slice of closes.
pub fn max_drawdown(closes: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst: f64 = 0.0;
    for &c in closes {
        peak = peak.max(c);
        if peak > 0.0 {
            worst = worst.max((peak - c) / peak);
        }
    }
    worst
}

impl Indicator for MaxDrawdown {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window.map_or(0, |w| w - 1)
    }

    fn compute(&self, points: &[PricePoint]) -> Vec<f64> {
        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        let n = closes.len();

        match self.window {
            None => {
                let mut result = Vec::with_capacity(n);
                let mut peak = f64::NEG_INFINITY;
                let mut worst: f64 = 0.0;
                for &c in &closes {
                    peak = peak.max(c);
                    if peak > 0.0 {
                        worst = worst.max((peak - c) / peak);
                    }
                    result.push(worst);
                }
                result
            }
            Some(w) => {
                let mut result = vec![f64::NAN; n];
                for i in w.saturating_sub(1)..n {
                    result[i] = max_drawdown(&closes[i + 1 - w..=i]);
                }
                result
            }
        }
    }
}
