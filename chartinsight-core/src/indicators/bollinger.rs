//! Bollinger envelope: trailing mean of closes plus or minus `k` population
//! standard deviations. Warmup: `period - 1` points.

use super::indicator::Indicator;
use crate::domain::PricePoint;

/// Line of the envelope an instance emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

impl BollingerBand {
    fn sign(self) -> f64 {
        match self {
            BollingerBand::Upper => 1.0,
            BollingerBand::Middle => 0.0,
            BollingerBand::Lower => -1.0,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            BollingerBand::Upper => "upper",
            BollingerBand::Middle => "middle",
            BollingerBand::Lower => "lower",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    window: usize,
    k: f64,
    line: BollingerBand,
    label: String,
}

impl Bollinger {
    /// A zero window is treated as 1.
    pub fn new(period: usize, k: f64, line: BollingerBand) -> Self {
        let window = period.max(1);
        Self {
            window,
            k,
            line,
            label: format!("bollinger_{}_{window}_{k}", line.tag()),
        }
    }

    pub fn upper(period: usize, k: f64) -> Self {
        Self::new(period, k, BollingerBand::Upper)
    }

    pub fn middle(period: usize, k: f64) -> Self {
        Self::new(period, k, BollingerBand::Middle)
    }

    pub fn lower(period: usize, k: f64) -> Self {
        Self::new(period, k, BollingerBand::Lower)
    }
}

/// `(mean, population std)` of each trailing window; NaN pairs during warmup
/// and for windows holding a NaN.
pub fn rolling_mean_std(values: &[f64], period: usize) -> Vec<(f64, f64)> {
    let undefined = (f64::NAN, f64::NAN);
    if period == 0 || values.len() < period {
        return vec![undefined; values.len()];
    }

    let width = period as f64;
    let stats = values.windows(period).map(|w| {
        if w.iter().any(|v| v.is_nan()) {
            return undefined;
        }
        let mean = w.iter().sum::<f64>() / width;
        let var = w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / width;
        (mean, var.sqrt())
    });
    std::iter::repeat(undefined)
        .take(period - 1)
        .chain(stats)
        .collect()
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.label
    }

    fn lookback(&self) -> usize {
        self.window - 1
    }

    fn compute(&self, points: &[PricePoint]) -> Vec<f64> {
        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        let offset = self.line.sign() * self.k;
        rolling_mean_std(&closes, self.window)
            .into_iter()
            .map(|(mean, sd)| mean + offset * sd)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_series, DEFAULT_EPSILON};

    #[test]
    fn middle_line_is_the_trailing_mean() {
        let out = Bollinger::middle(3, 2.0).compute(&make_series(&[10.0, 11.0, 12.0, 13.0, 14.0]));
        assert!(out[..2].iter().all(|v| v.is_nan()));
        assert_approx(out[2], 11.0, DEFAULT_EPSILON);
        assert_approx(out[3], 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn envelope_is_symmetric_around_the_mean() {
        let points = make_series(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let up = Bollinger::upper(3, 2.0).compute(&points);
        let mid = Bollinger::middle(3, 2.0).compute(&points);
        let down = Bollinger::lower(3, 2.0).compute(&points);
        // population std of three consecutive integers is sqrt(2/3)
        let half = 2.0 * (2.0f64 / 3.0).sqrt();
        for t in 2..5 {
            assert_approx(up[t] - mid[t], half, 1e-12);
            assert_approx(mid[t] - down[t], half, 1e-12);
        }
    }

    #[test]
    fn flat_closes_collapse_the_envelope() {
        let points = make_series(&[100.0; 4]);
        assert_approx(Bollinger::upper(3, 2.0).compute(&points)[2], 100.0, DEFAULT_EPSILON);
        assert_approx(Bollinger::lower(3, 2.0).compute(&points)[3], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn gap_in_window_is_undefined() {
        let stats = rolling_mean_std(&[1.0, f64::NAN, 3.0, 4.0, 5.0], 2);
        assert!(stats[1].0.is_nan() && stats[2].0.is_nan());
        assert_approx(stats[3].0, 3.5, DEFAULT_EPSILON);
        assert_approx(stats[4].1, 0.5, DEFAULT_EPSILON);
    }

    #[test]
    fn warmup_and_naming() {
        assert_eq!(Bollinger::upper(20, 2.0).lookback(), 19);
        assert_eq!(Bollinger::lower(20, 2.0).name(), "bollinger_lower_20_2");
    }
}
