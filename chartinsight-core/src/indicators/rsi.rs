//! Relative Strength Index on Wilder-averaged gains and losses.
//!
//! `RSI = 100 - 100 / (1 + gain / loss)`, warmup `period` points. A window
//! with no losses reads 100, no gains reads 0, and a flat one reads 50.

use serde::{Deserialize, Serialize};

use super::ema::wilder_smooth;
use super::indicator::Indicator;
use crate::domain::PricePoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiZone {
    Overbought,
    Neutral,
    Oversold,
}

impl RsiZone {
    /// 70 and above is overbought, 30 and below oversold.
    pub fn classify(rsi: f64) -> Self {
        match rsi {
            r if r >= 70.0 => RsiZone::Overbought,
            r if r <= 30.0 => RsiZone::Oversold,
            _ => RsiZone::Neutral,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rsi {
    window: usize,
    label: String,
}

impl Rsi {
    /// A zero window is treated as 1.
    pub fn new(period: usize) -> Self {
        let window = period.max(1);
        Self {
            window,
            label: format!("rsi_{window}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.label
    }

    fn lookback(&self) -> usize {
        self.window
    }

    fn compute(&self, points: &[PricePoint]) -> Vec<f64> {
        // Index 0 has no change and stays undefined.
        let (gains, losses): (Vec<f64>, Vec<f64>) = std::iter::once((f64::NAN, f64::NAN))
            .chain(points.windows(2).map(|pair| {
                let change = pair[1].close - pair[0].close;
                if change.is_nan() {
                    (f64::NAN, f64::NAN)
                } else {
                    (change.max(0.0), (-change).max(0.0))
                }
            }))
            .take(points.len())
            .unzip();

        let avg_gain = wilder_smooth(&gains, self.window);
        let avg_loss = wilder_smooth(&losses, self.window);
        avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(&g, &l)| if g.is_nan() || l.is_nan() { f64::NAN } else { strength(g, l) })
            .collect()
    }
}

fn strength(avg_gain: f64, avg_loss: f64) -> f64 {
    match (avg_gain == 0.0, avg_loss == 0.0) {
        (true, true) => 50.0,
        (false, true) => 100.0,
        (true, false) => 0.0,
        (false, false) => (100.0 - 100.0 / (1.0 + avg_gain / avg_loss)).clamp(0.0, 100.0),
    }
}
