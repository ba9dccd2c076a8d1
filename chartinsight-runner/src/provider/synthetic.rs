//! Deterministic synthetic data.
//!
//! A seeded random walk over business days. The seed is the blake3 hash of
//! the symbol, so the same symbol always yields the same series. Useful for
//! demos and offline checks without network access.

use async_trait::async_trait;
use chartinsight_core::domain::PricePoint;
use chartinsight_core::forecast::calendar::is_business_day;
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::MarketDataProvider;
use crate::error::DataError;

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    end: NaiveDate,
    points: usize,
}

impl SyntheticProvider {
    /// `points` business days ending on or before `end`.
    pub fn new(end: NaiveDate, points: usize) -> Self {
        Self { end, points }
    }
}

/// Generate `count` business-day bars ending on or before `end`.
pub fn generate_random_walk(symbol: &str, end: NaiveDate, count: usize) -> Vec<PricePoint> {
    let seed: [u8; 32] = *blake3::hash(symbol.to_ascii_uppercase().as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut dates = Vec::with_capacity(count);
    let mut current = end;
    while dates.len() < count {
        if is_business_day(current) {
            dates.push(current);
        }
        current -= Duration::days(1);
    }
    dates.reverse();

    let mut price = 100.0_f64;
    dates
        .into_iter()
        .map(|date| {
            let daily_return: f64 = rng.gen_range(-0.025..0.027);
            let open = price;
            let close = price * (1.0 + daily_return);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(500_000..5_000_000u64) as f64;
            price = close;
            PricePoint {
                date,
                open,
                high,
                low,
                close,
                volume,
            }
        })
        .collect()
}

#[async_trait]
impl MarketDataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn fetch(&self, symbol: &str, timeframe: &str) -> Result<Vec<PricePoint>, DataError> {
        if timeframe != "1d" {
            return Err(DataError::UnsupportedTimeframe(timeframe.to_string()));
        }
        Ok(generate_random_walk(symbol, self.end, self.points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    #[test]
    fn deterministic_per_symbol() {
        let a = generate_random_walk("SPY", end(), 50);
        let b = generate_random_walk("spy", end(), 50);
        let c = generate_random_walk("QQQ", end(), 50);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn business_days_only_and_ordered() {
        let bars = generate_random_walk("SPY", end(), 120);
        assert_eq!(bars.len(), 120);
        assert!(bars.iter().all(|b| b.date.weekday().number_from_monday() <= 5));
        assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
        // 2024-06-30 is a Sunday.
        assert_eq!(bars.last().unwrap().date, NaiveDate::from_ymd_opt(2024, 6, 28).unwrap());
    }

    #[test]
    fn bars_are_consistent() {
        for bar in generate_random_walk("IWM", end(), 200) {
            assert!(bar.low <= bar.open.min(bar.close));
            assert!(bar.high >= bar.open.max(bar.close));
            assert!(bar.close > 0.0);
        }
    }

    #[tokio::test]
    async fn rejects_intraday_timeframe() {
        let provider = SyntheticProvider::new(end(), 10);
        assert!(provider.fetch("SPY", "1d").await.is_ok());
        assert!(matches!(
            provider.fetch("SPY", "1h").await,
            Err(DataError::UnsupportedTimeframe(_))
        ));
    }
}
