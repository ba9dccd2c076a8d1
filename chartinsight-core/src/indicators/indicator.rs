//! Indicator trait.
//!
//! Indicators are pure functions: price history in, numeric series out.
//! A value that cannot be computed (not enough history yet) is `f64::NAN`;
//! the snapshot layer turns NaN at the latest index into an explicit `None`.

use crate::domain::PricePoint;

/// Trait for indicators.
///
/// Indicators take a full price series and produce a numeric output series of
/// the same length. The first `lookback()` values are `f64::NAN` (warmup).
///
/// # Look-ahead contamination guard
/// No indicator value at index t may depend on price data from index t+1 or later.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "atr_14").
    fn name(&self) -> &str;

    /// Number of points needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire series.
    ///
    /// Returns a `Vec<f64>` of the same length as `points`. Never panics on
    /// short input: too-short input yields all NaN.
    fn compute(&self, points: &[PricePoint]) -> Vec<f64>;
}

/// Value at the latest index as an `Option`, `None` when NaN/infinite or empty.
pub fn latest(values: &[f64]) -> Option<f64> {
    values.last().copied().filter(|v| v.is_finite())
}
