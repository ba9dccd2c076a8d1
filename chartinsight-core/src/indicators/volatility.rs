//! Historical Volatility (HV).
//!
//! Annualized sample standard deviation of log returns over the trailing
//! `period` returns: std(ln(c[t]/c[t-1])) * sqrt(annualization).
//! Output is a fraction (0.25 = 25% annualized).
//! Lookback: period (period returns need period + 1 closes).

use super::indicator::Indicator;
use crate::domain::PricePoint;

/// Trading periods per year for daily data.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone)]
pub struct HistoricalVolatility {
    period: usize,
    annualization: f64,
    name: String,
}

impl HistoricalVolatility {
    /// Windows below 2 are raised to 2, the fewest returns with a deviation.
    pub fn new(period: usize, annualization: f64) -> Self {
        let period = period.max(2);
        Self {
            period,
            annualization,
            name: format!("hv_{period}"),
        }
    }

    pub fn daily(period: usize) -> Self {
        Self::new(period, TRADING_DAYS_PER_YEAR)
    }
}

/// Log returns; index 0 is NaN.
pub fn log_returns(closes: &[f64]) -> Vec<f64> {
    std::iter::once(f64::NAN)
        .chain(closes.windows(2).map(|w| (w[1] / w[0]).ln()))
        .collect()
}

/// Sample standard deviation (n - 1). `None` for fewer than two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

impl Indicator for HistoricalVolatility {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, points: &[PricePoint]) -> Vec<f64> {
        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        let returns = log_returns(&closes);
        let n = closes.len();
        let mut result = vec![f64::NAN; n];
        let scale = self.annualization.sqrt();

        for i in self.period..n {
            let window = &returns[i + 1 - self.period..=i];
            if window.iter().any(|r| !r.is_finite()) {
                continue;
            }
            if let Some(std) = sample_std(window) {
                result[i] = std * scale;
            }
        }

        result
    }
}
