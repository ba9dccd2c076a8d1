//! Series Normalizer: raw rows in, [`NormalizedSeries`] out.
//!
//! Rules, applied in order:
//! 1. stable sort by date ascending,
//! 2. collapse duplicate dates, keeping the last row supplied for that date,
//! 3. drop rows that fail [`PricePoint::is_usable`] (close <= 0, volume < 0, NaN),
//! 4. fail with [`NormalizeError::InsufficientData`] below the minimum length.
//!
//! No side effects: the input slice is only read.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{NormalizedSeries, PricePoint};

/// Default minimum series length.
pub const DEFAULT_MIN_POINTS: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("insufficient data: {available} usable points, {required} required")]
    InsufficientData { required: usize, available: usize },
}

/// Outcome counters, useful for logging what the normalizer threw away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeReport {
    pub input_rows: usize,
    pub duplicates_collapsed: usize,
    pub rows_dropped: usize,
}

/// Normalize raw rows into a validated series.
pub fn normalize(raw: &[PricePoint], min_points: usize) -> Result<NormalizedSeries, NormalizeError> {
    normalize_with_report(raw, min_points).map(|(series, _)| series)
}

/// Same as [`normalize`] but also returns what was discarded.
pub fn normalize_with_report(
    raw: &[PricePoint],
    min_points: usize,
) -> Result<(NormalizedSeries, NormalizeReport), NormalizeError> {
    let mut rows: Vec<PricePoint> = raw.to_vec();
    // Stable: among equal dates the caller's order is preserved, so the last
    // occurrence is the last one supplied.
    rows.sort_by_key(|p| p.date);

    let mut deduped: Vec<PricePoint> = Vec::with_capacity(rows.len());
    let mut duplicates_collapsed = 0;
    for row in rows {
        match deduped.last_mut() {
            Some(prev) if prev.date == row.date => {
                *prev = row;
                duplicates_collapsed += 1;
            }
            _ => deduped.push(row),
        }
    }

    let before_filter = deduped.len();
    deduped.retain(PricePoint::is_usable);

    let report = NormalizeReport {
        input_rows: raw.len(),
        duplicates_collapsed,
        rows_dropped: before_filter - deduped.len(),
    };

    if deduped.len() < min_points.max(1) {
        return Err(NormalizeError::InsufficientData {
            required: min_points.max(1),
            available: deduped.len(),
        });
    }

    Ok((NormalizedSeries::from_validated(deduped), report))
}
