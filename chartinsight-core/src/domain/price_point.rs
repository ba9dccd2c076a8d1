//! PricePoint (one period of OHLCV data) and the validated series built from it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// OHLCV row for a single period.
///
/// Rows arrive from the caller in any order and may contain duplicates or
/// garbage. The engine never mutates them; it only derives a [`NormalizedSeries`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PricePoint {
    /// Returns true if any OHLCV field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite())
    }

    /// Row admission check used by the normalizer.
    ///
    /// Requires finite fields, a strictly positive close, non-negative
    /// open/high/low and non-negative volume.
    pub fn is_usable(&self) -> bool {
        !self.is_void()
            && self.close > 0.0
            && self.open >= 0.0
            && self.high >= 0.0
            && self.low >= 0.0
            && self.volume >= 0.0
    }
}

/// Ordered, validated price series.
///
/// Invariants (enforced by [`crate::normalize::normalize`], the only constructor):
/// strictly increasing dates, every row passes [`PricePoint::is_usable`],
/// length at least the configured minimum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedSeries {
    points: Vec<PricePoint>,
}

impl NormalizedSeries {
    pub(crate) fn from_validated(points: Vec<PricePoint>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].date < w[1].date));
        Self { points }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Latest point. `None` only for an empty series, which normalization never produces.
    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.volume).collect()
    }

    /// A prefix of this series (first `len` points). Used by the holdout backtest.
    ///
    /// A prefix of a normalized series keeps every ordering/validity invariant,
    /// only the minimum-length guarantee is relaxed.
    pub fn prefix(&self, len: usize) -> NormalizedSeries {
        let len = len.min(self.points.len());
        Self {
            points: self.points[..len].to_vec(),
        }
    }
}
