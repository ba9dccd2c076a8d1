//! Investor-psychology proxy: share of up-days among the trailing changes.
//!
//! psy[t] = 100 * #{ s in (t-period, t] : close[s] > close[s-1] } / period
//! Lookback: period (needs `period` close-to-close changes).

use super::indicator::Indicator;
use crate::domain::PricePoint;

#[derive(Debug, Clone)]
pub struct Psychology {
    period: usize,
    name: String,
}

impl Psychology {
    /// A zero window is treated as 1.
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("psy_{period}_pct"),
        }
    }
}

impl Indicator for Psychology {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, points: &[PricePoint]) -> Vec<f64> {
        let n = points.len();
        let mut result = vec![f64::NAN; n];
        if n <= self.period {
            return result;
        }

        let up: Vec<u32> = std::iter::once(0)
            .chain(points.windows(2).map(|w| u32::from(w[1].close > w[0].close)))
            .collect();

        let mut count: u32 = up[1..=self.period].iter().sum();
        result[self.period] = 100.0 * count as f64 / self.period as f64;
        for i in (self.period + 1)..n {
            count = count + up[i] - up[i - self.period];
            result[i] = 100.0 * count as f64 / self.period as f64;
        }

        result
    }
}
