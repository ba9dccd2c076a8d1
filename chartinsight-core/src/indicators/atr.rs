//! Average True Range: Wilder's average of the true range. Warmup: `period`
//! points, since the first point has no prior close.

use super::ema::wilder_smooth;
use super::indicator::Indicator;
use crate::domain::PricePoint;

#[derive(Debug, Clone)]
pub struct Atr {
    window: usize,
    label: String,
}

impl Atr {
    /// A zero window is treated as 1.
    pub fn new(period: usize) -> Self {
        let window = period.max(1);
        Self {
            window,
            label: format!("atr_{window}"),
        }
    }
}

/// Largest of the day's range and the two gaps against the prior close.
/// The first entry is just `high - low`.
pub fn true_range(points: &[PricePoint]) -> Vec<f64> {
    let head = points.first().map(|p| p.high - p.low);
    let rest = points.windows(2).map(|pair| {
        let (prev_close, today) = (pair[0].close, &pair[1]);
        let gap_high = (today.high - prev_close).abs();
        let gap_low = (today.low - prev_close).abs();
        (today.high - today.low).max(gap_high).max(gap_low)
    });
    head.into_iter().chain(rest).collect()
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.label
    }

    fn lookback(&self) -> usize {
        self.window
    }

    fn compute(&self, points: &[PricePoint]) -> Vec<f64> {
        let mut ranges = true_range(points);
        // Seed from the first full true range.
        if let Some(head) = ranges.first_mut() {
            *head = f64::NAN;
        }
        wilder_smooth(&ranges, self.window)
    }
}
