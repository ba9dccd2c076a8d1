//! Volume ratio against the trailing average volume.
//!
//! ratio[t] = (volume[t] / SMA(volume, period)[t] - 1) * 100
//! Undefined where the average is zero.
//! Lookback: period - 1.

use super::indicator::Indicator;
use super::sma::sma_of_series;
use crate::domain::PricePoint;

#[derive(Debug, Clone)]
pub struct VolumeRatio {
    period: usize,
    name: String,
}

impl VolumeRatio {
    /// A zero window is treated as 1.
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("volume_ratio_{period}_pct"),
        }
    }
}

impl Indicator for VolumeRatio {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, points: &[PricePoint]) -> Vec<f64> {
        let volumes: Vec<f64> = points.iter().map(|p| p.volume).collect();
        let avg = sma_of_series(&volumes, self.period);
        volumes
            .iter()
            .zip(&avg)
            .map(|(&v, &a)| {
                if a.is_finite() && a > 0.0 {
                    (v / a - 1.0) * 100.0
                } else {
                    f64::NAN
                }
            })
            .collect()
    }
}
