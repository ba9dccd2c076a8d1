//! Scoring & Classification.
//!
//! Pure function `(IndicatorSnapshot, ForecastBand?, AccuracyReport?) -> ScoreBundle`.
//! Every term is bounded before weighting, so both composite scores stay in
//! [0, 100] for any finite snapshot. A missing input (short history or a
//! degraded forecast) contributes its neutral value, never a stale one.

use serde::{Deserialize, Serialize};

use crate::forecast::{AccuracyReport, ForecastBand};
use crate::snapshot::IndicatorSnapshot;

/// Neutral value of a 0..100 component whose input is missing.
pub const NEUTRAL: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Hold,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLabel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendWeights {
    pub sma_gap: f64,
    pub macd: f64,
    pub forecast_slope: f64,
}

impl Default for TrendWeights {
    fn default() -> Self {
        Self {
            sma_gap: 0.4,
            macd: 0.3,
            forecast_slope: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub volatility: f64,
    pub atr: f64,
    pub drawdown: f64,
    pub band_width: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            volatility: 0.35,
            atr: 0.2,
            drawdown: 0.25,
            band_width: 0.2,
        }
    }
}

/// Decision-table and label thresholds plus term weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Buy needs trend >= this ...
    pub buy_trend_min: f64,
    /// ... and risk strictly below this.
    pub buy_risk_max: f64,
    /// Sell when trend <= this ...
    pub sell_trend_max: f64,
    /// ... or risk >= this.
    pub sell_risk_min: f64,
    /// Risk label Low below this.
    pub risk_low_below: f64,
    /// Risk label High above this.
    pub risk_high_above: f64,
    pub trend_weights: TrendWeights,
    pub risk_weights: RiskWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            buy_trend_min: 60.0,
            buy_risk_max: 66.0,
            sell_trend_max: 40.0,
            sell_risk_min: 80.0,
            risk_low_below: 34.0,
            risk_high_above: 66.0,
            trend_weights: TrendWeights::default(),
            risk_weights: RiskWeights::default(),
        }
    }
}

impl ScoringConfig {
    /// Checks threshold ordering and weight sanity. Returns a description of
    /// the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        let thresholds = [
            ("buy_trend_min", self.buy_trend_min),
            ("buy_risk_max", self.buy_risk_max),
            ("sell_trend_max", self.sell_trend_max),
            ("sell_risk_min", self.sell_risk_min),
            ("risk_low_below", self.risk_low_below),
            ("risk_high_above", self.risk_high_above),
        ];
        for (name, value) in thresholds {
            if !(0.0..=100.0).contains(&value) {
                return Err(format!("{name} = {value} outside [0, 100]"));
            }
        }
        if self.sell_trend_max >= self.buy_trend_min {
            return Err("sell_trend_max must be below buy_trend_min".to_string());
        }
        if self.risk_low_below > self.risk_high_above {
            return Err("risk_low_below must not exceed risk_high_above".to_string());
        }

        let t = &self.trend_weights;
        let r = &self.risk_weights;
        let weights = [
            t.sma_gap,
            t.macd,
            t.forecast_slope,
            r.volatility,
            r.atr,
            r.drawdown,
            r.band_width,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err("weights must be finite and non-negative".to_string());
        }
        if t.sma_gap + t.macd + t.forecast_slope <= 0.0 {
            return Err("trend weights sum to zero".to_string());
        }
        if r.volatility + r.atr + r.drawdown + r.band_width <= 0.0 {
            return Err("risk weights sum to zero".to_string());
        }
        Ok(())
    }

    /// Exhaustive decision table over (trend, risk).
    pub fn signal(&self, trend: f64, risk: f64) -> Signal {
        let buy = trend >= self.buy_trend_min && risk < self.buy_risk_max;
        let sell = trend <= self.sell_trend_max || risk >= self.sell_risk_min;
        match (buy, sell) {
            (true, false) => Signal::Buy,
            (false, true) => Signal::Sell,
            (true, true) | (false, false) => Signal::Hold,
        }
    }

    pub fn risk_label(&self, risk: f64) -> RiskLabel {
        if risk < self.risk_low_below {
            RiskLabel::Low
        } else if risk > self.risk_high_above {
            RiskLabel::High
        } else {
            RiskLabel::Medium
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBundle {
    pub trend_score: f64,
    pub risk_score: f64,
    pub confidence_score: f64,
    pub risk_label: RiskLabel,
    pub signal: Signal,
    pub volatility_score: f64,
    pub volatility_label: RiskLabel,
    pub confidence_label: ConfidenceLabel,
    pub confidence_reason: String,
}

/// HV knots (annualized %, score).
const VOLATILITY_KNOTS: [(f64, f64); 7] = [
    (0.0, 0.0),
    (5.0, 10.0),
    (15.0, 30.0),
    (30.0, 55.0),
    (45.0, 70.0),
    (60.0, 88.0),
    (90.0, 100.0),
];

/// Map annualized HV (percent) onto 0..100 by piecewise-linear interpolation.
pub fn volatility_score(hv_pct: f64) -> f64 {
    if !hv_pct.is_finite() || hv_pct <= 0.0 {
        return 0.0;
    }
    for pair in VOLATILITY_KNOTS.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        if hv_pct <= x1 {
            return y0 + (y1 - y0) * (hv_pct - x0) / (x1 - x0);
        }
    }
    100.0
}

/// <35 Low, <70 Medium, else High.
pub fn volatility_label(score: f64) -> RiskLabel {
    if score < 35.0 {
        RiskLabel::Low
    } else if score < 70.0 {
        RiskLabel::Medium
    } else {
        RiskLabel::High
    }
}

/// >=70 High, >=45 Moderate, else Low.
pub fn confidence_label(score: f64) -> ConfidenceLabel {
    if score >= 70.0 {
        ConfidenceLabel::High
    } else if score >= 45.0 {
        ConfidenceLabel::Moderate
    } else {
        ConfidenceLabel::Low
    }
}

fn clamp_score(v: f64) -> f64 {
    if v.is_nan() {
        NEUTRAL
    } else {
        v.clamp(0.0, 100.0)
    }
}

/// Squash a signed quantity into [-1, 1]; missing or non-finite input is 0.
fn squash(value: Option<f64>, scale: f64) -> f64 {
    value
        .filter(|v| v.is_finite())
        .map(|v| (v / scale).tanh())
        .unwrap_or(0.0)
}

fn weighted(terms: &[(f64, f64)]) -> f64 {
    let total: f64 = terms.iter().map(|(w, _)| w).sum();
    if total <= 0.0 {
        return 0.0;
    }
    terms.iter().map(|(w, v)| w * v).sum::<f64>() / total
}

/// Score one snapshot. `band` and `accuracy` are `None` when the forecast
/// is degraded or history is too short for a backtest.
pub fn score(
    snapshot: &IndicatorSnapshot,
    band: Option<&ForecastBand>,
    accuracy: Option<&AccuracyReport>,
    config: &ScoringConfig,
) -> ScoreBundle {
    let tw = &config.trend_weights;
    let slope_pct = band.and_then(|b| b.slope_pct(snapshot.close));
    let trend_raw = weighted(&[
        (tw.sma_gap, squash(snapshot.sma_gap_pct(), 5.0)),
        (tw.macd, squash(snapshot.macd_hist_pct(), 1.0)),
        (tw.forecast_slope, squash(slope_pct, 10.0)),
    ]);
    let trend_score = clamp_score(NEUTRAL + 50.0 * trend_raw);

    let rw = &config.risk_weights;
    let vol_score = snapshot.hv20_pct.map(volatility_score);
    let band_width_pct = band.and_then(ForecastBand::terminal_width_pct);
    let component = |v: Option<f64>| v.filter(|x| x.is_finite()).map_or(NEUTRAL, clamp_score);
    let risk_score = clamp_score(weighted(&[
        (rw.volatility, component(vol_score)),
        (rw.atr, component(snapshot.atr_pct.map(|p| p / 5.0 * 100.0))),
        (rw.drawdown, component(snapshot.mdd_pct.map(|p| p * 2.0))),
        (rw.band_width, component(band_width_pct)),
    ]));

    let quality = accuracy.map(|a| {
        let precision = clamp_score(100.0 - 4.0 * a.mape);
        0.6 * precision + 0.4 * clamp_score(a.coverage_pct)
    });
    let band_penalty = band_width_pct.map_or(0.0, |w| (w * 0.5).clamp(0.0, 40.0));
    let confidence_score = clamp_score(quality.unwrap_or(NEUTRAL) - band_penalty);

    let volatility_score = vol_score.unwrap_or(0.0);
    let confidence_reason = confidence_reason(
        trend_score,
        risk_score,
        volatility_score,
        band_width_pct,
        accuracy,
    );

    ScoreBundle {
        trend_score,
        risk_score,
        confidence_score,
        risk_label: config.risk_label(risk_score),
        signal: config.signal(trend_score, risk_score),
        volatility_score,
        volatility_label: volatility_label(volatility_score),
        confidence_label: confidence_label(confidence_score),
        confidence_reason,
    }
}

fn confidence_reason(
    trend: f64,
    risk: f64,
    volatility: f64,
    band_width_pct: Option<f64>,
    accuracy: Option<&AccuracyReport>,
) -> String {
    let band = match band_width_pct {
        Some(w) => format!("band width {w:.1}%"),
        None => "no forecast band".to_string(),
    };
    let backtest = match accuracy {
        Some(a) => format!(
            "backtest MAPE {:.1}%, coverage {:.0}%",
            a.mape, a.coverage_pct
        ),
        None => "no backtest".to_string(),
    };
    format!("trend {trend:.0} / risk {risk:.0} | volatility {volatility:.0}, {band} | {backtest}")
}
