//! Concrete indicator implementations.
//!
//! Each indicator maps a price history to a same-length series with NaN
//! warmup. MACD and Bollinger emit one line per instance; the snapshot reads
//! all of their lines at once through `macd_series` and `rolling_mean_std`.

pub mod atr;
pub mod bollinger;
pub mod drawdown;
pub mod ema;
pub mod indicator;
pub mod macd;
pub mod momentum;
pub mod psychology;
pub mod rsi;
pub mod sma;
pub mod volatility;
pub mod volume;

pub use atr::Atr;
pub use bollinger::{Bollinger, BollingerBand};
pub use drawdown::MaxDrawdown;
pub use ema::Ema;
pub use indicator::{latest, Indicator};
pub use macd::{Macd, MacdOutput, MacdSeries};
pub use momentum::Momentum;
pub use psychology::Psychology;
pub use rsi::{Rsi, RsiZone};
pub use sma::Sma;
pub use volatility::HistoricalVolatility;
pub use volume::VolumeRatio;

/// Points built from closes: each opens at the prior close, wicks one unit
/// beyond the body, trades 1000 units, one calendar day apart.
#[cfg(test)]
pub fn make_series(closes: &[f64]) -> Vec<crate::domain::PricePoint> {
    let first_day = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let opens = closes.first().into_iter().chain(closes.iter());
    closes
        .iter()
        .zip(opens)
        .enumerate()
        .map(|(i, (&close, &open))| crate::domain::PricePoint {
            date: first_day + chrono::Duration::days(i as i64),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume: 1000.0,
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    let diff = (actual - expected).abs();
    assert!(diff < epsilon, "{actual} != {expected} (diff {diff}, eps {epsilon})");
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
