//! IndicatorSnapshot: every indicator evaluated at the latest point.
//!
//! A fixed, versioned record. A field is `None` when the series is too short
//! for that indicator's lookback (or the value is not finite); consumers never
//! see NaN. Field names follow the default windows (`sma20`, `rsi14`, ...)
//! even when `IndicatorConfig` changes the window lengths.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::NormalizedSeries;
use crate::indicators::{
    bollinger::rolling_mean_std, latest, macd::macd_series, Atr, HistoricalVolatility, Indicator,
    MaxDrawdown, Momentum, Psychology, Rsi, RsiZone, Sma, VolumeRatio,
};
use crate::indicators::sma::sma_of_series;

/// Bump when a field is added, removed or changes meaning.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Indicator windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub sma_short: usize,
    pub sma_long: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub rsi_period: usize,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    pub hv_period: usize,
    pub hv_annualization: f64,
    pub atr_period: usize,
    pub volume_period: usize,
    pub psychology_period: usize,
    pub momentum_period: usize,
    /// Trailing window for max drawdown; `None` uses the whole series.
    pub mdd_lookback: Option<usize>,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_short: 20,
            sma_long: 60,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            rsi_period: 14,
            bollinger_period: 20,
            bollinger_k: 2.0,
            hv_period: 20,
            hv_annualization: 252.0,
            atr_period: 14,
            volume_period: 20,
            psychology_period: 10,
            momentum_period: 20,
            mdd_lookback: None,
        }
    }
}

impl IndicatorConfig {
    /// Largest number of leading points any configured indicator needs before
    /// it yields a value at the last index, expressed as a series length.
    pub fn max_required_len(&self) -> usize {
        [
            self.sma_short,
            self.sma_long,
            self.macd_slow + self.macd_signal - 1,
            self.rsi_period + 1,
            self.bollinger_period,
            self.hv_period + 1,
            self.atr_period + 1,
            self.volume_period,
            self.psychology_period + 1,
            self.momentum_period + 1,
            self.mdd_lookback.unwrap_or(1),
        ]
        .into_iter()
        .max()
        .unwrap_or(1)
    }
}

/// MACD state at the latest point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MacdState {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacdReading {
    pub line: f64,
    pub signal: f64,
    pub hist: f64,
    pub state: MacdState,
}

impl MacdReading {
    fn new(line: f64, signal: f64, hist: f64) -> Self {
        let state = if hist > 0.0 && line > signal {
            MacdState::Bullish
        } else if hist < 0.0 && line < signal {
            MacdState::Bearish
        } else {
            MacdState::Neutral
        };
        Self {
            line,
            signal,
            hist,
            state,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BollingerReading {
    pub upper: f64,
    pub mid: f64,
    pub lower: f64,
}

/// Crowd-sentiment label from the psychology proxy and volatility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FearGreed {
    Greed,
    Neutral,
    Fear,
}

impl FearGreed {
    /// Greed: psychology >= 70 with HV below 40%. Fear: psychology <= 35.
    pub fn classify(psychology_pct: f64, hv_pct: Option<f64>) -> Self {
        if psychology_pct >= 70.0 && hv_pct.is_some_and(|hv| hv < 40.0) {
            FearGreed::Greed
        } else if psychology_pct <= 35.0 {
            FearGreed::Fear
        } else {
            FearGreed::Neutral
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSnapshot {
    pub schema_version: u32,
    pub as_of: NaiveDate,
    pub close: f64,
    /// Last close vs the previous close, in percent.
    pub change_rate_pct: Option<f64>,
    pub sma20: Option<f64>,
    pub sma60: Option<f64>,
    pub macd: Option<MacdReading>,
    pub rsi14: Option<f64>,
    pub rsi_zone: Option<RsiZone>,
    pub bollinger: Option<BollingerReading>,
    /// Annualized historical volatility, in percent.
    pub hv20_pct: Option<f64>,
    pub atr14: Option<f64>,
    /// ATR relative to the last close, in percent.
    pub atr_pct: Option<f64>,
    /// Max drawdown over the lookback, in percent (positive number).
    pub mdd_pct: Option<f64>,
    pub momentum20_pct: Option<f64>,
    pub volume_last: f64,
    pub volume_avg20: Option<f64>,
    pub volume_ratio_pct: Option<f64>,
    pub investor_psychology_pct: Option<f64>,
    pub fear_greed: Option<FearGreed>,
}

impl IndicatorSnapshot {
    /// Compute every indicator over `series` and keep the latest value of each.
    pub fn compute(series: &NormalizedSeries, cfg: &IndicatorConfig) -> Self {
        let points = series.points();
        let closes = series.closes();
        let volumes = series.volumes();
        let n = closes.len();
        let close = closes.last().copied().unwrap_or(f64::NAN);

        let change_rate_pct = (n >= 2)
            .then(|| (close / closes[n - 2] - 1.0) * 100.0)
            .filter(|v| v.is_finite());

        let sma20 = latest(&Sma::new(cfg.sma_short).compute(points));
        let sma60 = latest(&Sma::new(cfg.sma_long).compute(points));

        let macd_lines = macd_series(&closes, cfg.macd_fast, cfg.macd_slow, cfg.macd_signal);
        let macd = match (
            latest(&macd_lines.line),
            latest(&macd_lines.signal),
            latest(&macd_lines.histogram),
        ) {
            (Some(line), Some(signal), Some(hist)) => Some(MacdReading::new(line, signal, hist)),
            _ => None,
        };

        let rsi14 = latest(&Rsi::new(cfg.rsi_period).compute(points));

        let bollinger = rolling_mean_std(&closes, cfg.bollinger_period)
            .last()
            .copied()
            .filter(|(mean, std)| mean.is_finite() && std.is_finite())
            .map(|(mid, std)| BollingerReading {
                upper: mid + cfg.bollinger_k * std,
                mid,
                lower: mid - cfg.bollinger_k * std,
            });

        let hv20_pct = latest(
            &HistoricalVolatility::new(cfg.hv_period, cfg.hv_annualization).compute(points),
        )
        .map(|hv| hv * 100.0);

        let atr14 = latest(&Atr::new(cfg.atr_period).compute(points));
        let atr_pct = atr14.map(|atr| atr / close * 100.0).filter(|v| v.is_finite());

        let mdd = match cfg.mdd_lookback {
            Some(window) => MaxDrawdown::rolling(window),
            None => MaxDrawdown::expanding(),
        };
        let mdd_pct = latest(&mdd.compute(points)).map(|f| f * 100.0);

        let momentum20_pct = latest(&Momentum::new(cfg.momentum_period).compute(points));

        let volume_last = volumes.last().copied().unwrap_or(0.0);
        let volume_avg20 = latest(&sma_of_series(&volumes, cfg.volume_period));
        let volume_ratio_pct = latest(&VolumeRatio::new(cfg.volume_period).compute(points));

        let investor_psychology_pct =
            latest(&Psychology::new(cfg.psychology_period).compute(points));
        let fear_greed = investor_psychology_pct.map(|psy| FearGreed::classify(psy, hv20_pct));

        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            as_of: series.last_date().unwrap_or_default(),
            close,
            change_rate_pct,
            sma20,
            sma60,
            macd,
            rsi14,
            rsi_zone: rsi14.map(RsiZone::classify),
            bollinger,
            hv20_pct,
            atr14,
            atr_pct,
            mdd_pct,
            momentum20_pct,
            volume_last,
            volume_avg20,
            volume_ratio_pct,
            investor_psychology_pct,
            fear_greed,
        }
    }

    /// Short vs long moving-average gap, in percent of the long average.
    pub fn sma_gap_pct(&self) -> Option<f64> {
        match (self.sma20, self.sma60) {
            (Some(short), Some(long)) if long > 0.0 => Some((short / long - 1.0) * 100.0),
            _ => None,
        }
    }

    /// MACD histogram relative to the last close, in percent.
    pub fn macd_hist_pct(&self) -> Option<f64> {
        self.macd
            .map(|m| m.hist / self.close * 100.0)
            .filter(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_series;
    use crate::normalize::normalize;

    fn rising(n: usize) -> NormalizedSeries {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        normalize(&make_series(&closes), 1).unwrap()
    }

    #[test]
    fn full_history_defines_everything() {
        let snap = IndicatorSnapshot::compute(&rising(120), &IndicatorConfig::default());
        assert_eq!(snap.schema_version, SNAPSHOT_SCHEMA_VERSION);
        assert!(snap.sma20.is_some());
        assert!(snap.sma60.is_some());
        assert!(snap.macd.is_some());
        assert!(snap.rsi14.is_some());
        assert!(snap.bollinger.is_some());
        assert!(snap.hv20_pct.is_some());
        assert!(snap.atr14.is_some());
        assert!(snap.momentum20_pct.is_some());
        assert!(snap.volume_ratio_pct.is_some());
        assert_eq!(snap.investor_psychology_pct, Some(100.0));
        assert_eq!(snap.rsi_zone, Some(RsiZone::Overbought));
        assert_eq!(snap.mdd_pct, Some(0.0));
        assert!(snap.sma_gap_pct().unwrap() > 0.0);
    }

    #[test]
    fn short_history_yields_none_not_nan() {
        let snap = IndicatorSnapshot::compute(&rising(5), &IndicatorConfig::default());
        assert_eq!(snap.sma20, None);
        assert_eq!(snap.sma60, None);
        assert_eq!(snap.rsi14, None);
        assert_eq!(snap.rsi_zone, None);
        assert_eq!(snap.macd, None);
        assert_eq!(snap.hv20_pct, None);
        assert_eq!(snap.mdd_pct, Some(0.0));
        assert!(snap.change_rate_pct.unwrap() > 0.0);
    }

    #[test]
    fn snapshot_serializes_camel_case_with_nulls() {
        let snap = IndicatorSnapshot::compute(&rising(5), &IndicatorConfig::default());
        let json = serde_json::to_value(&snap).unwrap();
        assert!(json.get("schemaVersion").is_some());
        assert!(json["sma60"].is_null());
        assert!(json.get("volumeLast").is_some());
    }

    #[test]
    fn degenerate_windows_do_not_panic() {
        let cfg = IndicatorConfig {
            sma_short: 0,
            sma_long: 0,
            macd_fast: 0,
            macd_slow: 0,
            macd_signal: 0,
            rsi_period: 0,
            bollinger_period: 0,
            hv_period: 1,
            atr_period: 0,
            volume_period: 0,
            psychology_period: 0,
            momentum_period: 0,
            mdd_lookback: Some(0),
            ..IndicatorConfig::default()
        };
        let snap = IndicatorSnapshot::compute(&rising(80), &cfg);
        assert_eq!(snap.sma20, Some(179.0));
        assert_eq!(snap.investor_psychology_pct, Some(100.0));
        assert_eq!(snap.mdd_pct, Some(0.0));
        assert!(snap.hv20_pct.is_some());
        assert_eq!(snap.bollinger, None);
        assert_eq!(snap.volume_avg20, None);
    }

    #[test]
    fn macd_state_classification() {
        assert_eq!(MacdReading::new(1.0, 0.5, 0.5).state, MacdState::Bullish);
        assert_eq!(MacdReading::new(-1.0, -0.5, -0.5).state, MacdState::Bearish);
        assert_eq!(MacdReading::new(0.0, 0.0, 0.0).state, MacdState::Neutral);
    }

    #[test]
    fn fear_greed_thresholds() {
        assert_eq!(FearGreed::classify(80.0, Some(20.0)), FearGreed::Greed);
        assert_eq!(FearGreed::classify(80.0, Some(50.0)), FearGreed::Neutral);
        assert_eq!(FearGreed::classify(80.0, None), FearGreed::Neutral);
        assert_eq!(FearGreed::classify(30.0, Some(20.0)), FearGreed::Fear);
    }

    #[test]
    fn max_required_len_default_is_sma_long() {
        assert_eq!(IndicatorConfig::default().max_required_len(), 60);
    }
}
