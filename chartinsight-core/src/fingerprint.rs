//! Cache-key fingerprinting.
//!
//! - [`series_content_hash`]: BLAKE3 over the latest N normalized points.
//! - [`CacheKey`]: request identity (symbol, timeframe, horizon, narrative
//!   mode) plus the content hash, so a new print invalidates the entry.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::NormalizedSeries;

/// Hash of the latest `last_n` points (all points when `last_n` exceeds the length).
///
/// Dates are hashed as ISO strings and prices by their IEEE-754 bits, so the
/// result is stable across platforms and builds.
pub fn series_content_hash(series: &NormalizedSeries, last_n: usize) -> String {
    let points = series.points();
    let start = points.len().saturating_sub(last_n.max(1));
    let mut hasher = blake3::Hasher::new();
    hasher.update(&((points.len() - start) as u64).to_le_bytes());
    for p in &points[start..] {
        hasher.update(p.date.to_string().as_bytes());
        for v in [p.open, p.high, p.low, p.close, p.volume] {
            hasher.update(&v.to_bits().to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheKey {
    /// Upper-cased symbol.
    pub symbol: String,
    pub timeframe: String,
    pub horizon: usize,
    pub narrative: String,
    pub content_hash: String,
}

impl CacheKey {
    pub fn new(
        symbol: &str,
        timeframe: &str,
        horizon: usize,
        narrative: &str,
        content_hash: String,
    ) -> Self {
        Self {
            symbol: symbol.to_ascii_uppercase(),
            timeframe: timeframe.to_string(),
            horizon,
            narrative: narrative.to_string(),
            content_hash,
        }
    }

    /// Short stable digest of the whole key, for logs and bundle metadata.
    pub fn digest(&self) -> String {
        let canonical = serde_json::json!({
            "symbol": self.symbol,
            "timeframe": self.timeframe,
            "horizon": self.horizon,
            "narrative": self.narrative,
            "content_hash": self.content_hash,
        });
        let hash = blake3::hash(canonical.to_string().as_bytes());
        hash.to_hex()[..16].to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.symbol,
            self.timeframe,
            self.horizon,
            self.narrative,
            &self.content_hash[..self.content_hash.len().min(12)]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_series;
    use crate::normalize::normalize;

    fn series(closes: &[f64]) -> NormalizedSeries {
        normalize(&make_series(closes), 1).unwrap()
    }

    #[test]
    fn hash_is_deterministic() {
        let a = series(&[1.0, 2.0, 3.0]);
        assert_eq!(series_content_hash(&a, 60), series_content_hash(&a, 60));
        assert_eq!(series_content_hash(&a, 60).len(), 64);
    }

    #[test]
    fn hash_ignores_points_outside_window() {
        let mut a = make_series(&[1.0, 2.0, 3.0, 4.0]);
        let b = a.clone();
        a[0].close = 9.0;
        let a = normalize(&a, 1).unwrap();
        let b = normalize(&b, 1).unwrap();
        assert_eq!(series_content_hash(&a, 2), series_content_hash(&b, 2));
        assert_ne!(series_content_hash(&a, 4), series_content_hash(&b, 4));
    }

    #[test]
    fn key_uppercases_symbol() {
        let k1 = CacheKey::new("aapl", "1d", 63, "auto", "h".into());
        let k2 = CacheKey::new("AAPL", "1d", 63, "auto", "h".into());
        assert_eq!(k1, k2);
        assert_eq!(k1.digest(), k2.digest());
        let k3 = CacheKey::new("AAPL", "1d", 21, "auto", "h".into());
        assert_ne!(k1.digest(), k3.digest());
    }
}
