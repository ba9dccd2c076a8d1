//! Deterministic, template-based narrative.

use async_trait::async_trait;
use chartinsight_core::forecast::BandSummary;
use chartinsight_core::indicators::RsiZone;
use chartinsight_core::scoring::RiskLabel;
use chartinsight_core::snapshot::{IndicatorSnapshot, MacdState};

use super::{Narrative, NarrativeInput, NarrativeMode, NarrativeStrategy};

/// SMA gap (percent) beyond which the trend counts as directional.
const TREND_GAP_PCT: f64 = 1.0;
/// Distance (percent) from a band edge that triggers a proximity alert.
const BAND_PROXIMITY_PCT: f64 = 6.0;
const MOMENTUM_ALERT_PCT: f64 = 5.0;
const EXTREME_HV_PCT: f64 = 45.0;
const VOLUME_SURGE_PCT: f64 = 40.0;
const MAX_QUICK_NOTES: usize = 4;
const MIN_QUICK_NOTES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrendBias {
    Rising,
    Sideways,
    Falling,
}

impl TrendBias {
    fn from_gap(gap_pct: Option<f64>) -> Self {
        match gap_pct {
            Some(g) if g > TREND_GAP_PCT => TrendBias::Rising,
            Some(g) if g < -TREND_GAP_PCT => TrendBias::Falling,
            _ => TrendBias::Sideways,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            TrendBias::Rising => "rising",
            TrendBias::Sideways => "sideways",
            TrendBias::Falling => "falling",
        }
    }
}

fn volume_state(ratio_pct: f64) -> &'static str {
    if ratio_pct > VOLUME_SURGE_PCT {
        "surging"
    } else if ratio_pct > 10.0 {
        "inflow"
    } else if ratio_pct > -15.0 {
        "average"
    } else {
        "outflow"
    }
}

fn macd_word(state: MacdState) -> &'static str {
    match state {
        MacdState::Bullish => "turning up",
        MacdState::Bearish => "turning down",
        MacdState::Neutral => "flat",
    }
}

fn zone_word(zone: RsiZone) -> &'static str {
    match zone {
        RsiZone::Overbought => "overbought",
        RsiZone::Neutral => "neutral",
        RsiZone::Oversold => "oversold",
    }
}

fn risk_word(label: RiskLabel) -> &'static str {
    match label {
        RiskLabel::Low => "low",
        RiskLabel::Medium => "medium",
        RiskLabel::High => "high",
    }
}

fn or_na(value: Option<f64>, fmt: impl Fn(f64) -> String) -> String {
    value.map(fmt).unwrap_or_else(|| "n/a".to_string())
}

const UPTREND_ACTIONS: [&str; 3] = [
    "1) With the trend rising, scale into pullbacks and split profit-taking as price nears the upper band.",
    "2) On volume surges, confirm breakout or acceleration before adding to the position.",
    "3) Define stop and hedge conditions in advance for a move toward the lower band.",
];

const DOWNTREND_ACTIONS: [&str; 3] = [
    "1) When key moving averages break, prioritise trimming exposure into rebounds.",
    "2) Avoid chasing entries until oversold RSI resolves; stage any entry in steps.",
    "3) Keep stops tight near the lower band and recent lows.",
];

/// Rule-based strategy: always available, no I/O.
#[derive(Debug, Clone)]
pub struct RuleNarrator {
    max_alerts: usize,
}

impl RuleNarrator {
    pub fn new(max_alerts: usize) -> Self {
        Self { max_alerts }
    }

    pub fn render(&self, input: &NarrativeInput<'_>) -> Narrative {
        let snap = input.snapshot;
        let bias = TrendBias::from_gap(snap.sma_gap_pct());

        let actions = match bias {
            TrendBias::Rising => UPTREND_ACTIONS,
            TrendBias::Sideways | TrendBias::Falling => DOWNTREND_ACTIONS,
        };

        Narrative {
            summary: summary(input, bias),
            quick_notes: quick_notes(input),
            actions: actions.iter().map(|s| s.to_string()).collect(),
            alerts: alerts(snap, input.band, self.max_alerts),
            mode: NarrativeMode::Rule,
            provider: None,
        }
    }
}

#[async_trait]
impl NarrativeStrategy for RuleNarrator {
    fn name(&self) -> &'static str {
        "rule"
    }

    async fn generate(&self, input: &NarrativeInput<'_>) -> Narrative {
        self.render(input)
    }
}

fn summary(input: &NarrativeInput<'_>, bias: TrendBias) -> String {
    let snap = input.snapshot;

    let trend = match snap.sma_gap_pct() {
        Some(gap) => format!("SMA20 vs SMA60 {gap:+.1}% -> trend {}", bias.as_str()),
        None => "SMA20/SMA60 not yet available -> trend undetermined".to_string(),
    };
    let momentum = format!(
        "20-period momentum {}, MACD {}, RSI {}",
        or_na(snap.momentum20_pct, |m| format!("{m:+.1}%")),
        snap.macd.map_or("n/a", |m| macd_word(m.state)),
        match (snap.rsi14, snap.rsi_zone) {
            (Some(rsi), Some(zone)) => format!("{rsi:.0} ({})", zone_word(zone)),
            _ => "n/a".to_string(),
        }
    );
    let volatility = format!(
        "annualised volatility {} (risk {}), max drawdown {}",
        or_na(snap.hv20_pct, |hv| format!("{hv:.1}%")),
        risk_word(input.scores.risk_label),
        or_na(snap.mdd_pct, |mdd| format!("{mdd:.1}%")),
    );
    let volume = format!(
        "volume {}, psychology {}",
        or_na(snap.volume_ratio_pct, |r| format!(
            "{} ({r:+.0}% vs 20-period average)",
            volume_state(r)
        )),
        or_na(snap.investor_psychology_pct, |p| format!("{p:.0}%")),
    );
    let band = match input.band.and_then(|b| b.span_pct().map(|span| (b, span))) {
        Some((b, span)) => format!(
            "{} band width {span:.1}% ({:.2}-{:.2})",
            b.horizon_label, b.lower, b.upper
        ),
        None => "no forecast band".to_string(),
    };

    [trend, momentum, volatility, volume, band].join(" | ")
}

fn quick_notes(input: &NarrativeInput<'_>) -> Vec<String> {
    let snap = input.snapshot;
    let mut notes = Vec::new();

    if let Some(b) = snap.bollinger {
        notes.push(format!(
            "Watch the reaction near Bollinger upper {:.2} / lower {:.2}.",
            b.upper, b.lower
        ));
    }
    if let (Some(hv), Some(atr)) = (snap.hv20_pct, snap.atr14) {
        notes.push(format!(
            "HV20 {hv:.1}% with ATR14 {atr:.2}: recheck reward-to-risk."
        ));
    }
    if let (Some(ratio), Some(psy)) = (snap.volume_ratio_pct, snap.investor_psychology_pct) {
        let stance = if psy > 60.0 { "buying interest" } else { "wait and see" };
        notes.push(format!(
            "Volume {}, psychology {psy:.0}% -> {stance}.",
            volume_state(ratio)
        ));
    }
    if let (Some(rsi), Some(macd)) = (snap.rsi14, snap.macd) {
        notes.push(format!(
            "RSI {rsi:.0} with MACD {}: check momentum alignment.",
            macd_word(macd.state)
        ));
    }

    if notes.len() < MIN_QUICK_NOTES {
        notes.push(match snap.change_rate_pct {
            Some(change) => format!("Last close {:.2} ({change:+.2}% vs previous).", snap.close),
            None => format!("Last close {:.2}.", snap.close),
        });
    }
    if notes.len() < MIN_QUICK_NOTES {
        let s = input.scores;
        notes.push(format!(
            "Signal {:?} with trend score {:.0} and risk score {:.0}.",
            s.signal, s.trend_score, s.risk_score
        ));
    }

    notes.truncate(MAX_QUICK_NOTES);
    notes
}

fn alerts(snap: &IndicatorSnapshot, band: Option<&BandSummary>, max_alerts: usize) -> Vec<String> {
    let mut alerts = Vec::new();

    if let Some(b) = band {
        if snap.close > 0.0 {
            let upper_gap = (b.upper / snap.close - 1.0) * 100.0;
            if upper_gap < 0.0 {
                alerts.push(format!(
                    "Price is {:.1}% above the forecast band upper {:.2}; treat it as a breakout and confirm with volume.",
                    -upper_gap, b.upper
                ));
            } else if upper_gap < BAND_PROXIMITY_PCT {
                alerts.push(format!(
                    "Price is {upper_gap:.1}% from the upper band; check for acceleration on a breakout."
                ));
            }
        }
        if b.lower > 0.0 {
            let lower_gap = (snap.close / b.lower - 1.0) * 100.0;
            if lower_gap < 0.0 {
                alerts.push(format!(
                    "Price is {:.1}% below the forecast band lower {:.2}; the downside break is under way, review stops.",
                    -lower_gap, b.lower
                ));
            } else if lower_gap < BAND_PROXIMITY_PCT {
                alerts.push(format!(
                    "A break below the lower band risks about {lower_gap:.1}%; set stop and hedge conditions now."
                ));
            }
        }
        if let Some(span) = b.span_pct() {
            alerts.push(format!(
                "Forecast band width {span:.1}%: size positions conservatively for the volatility."
            ));
        }
    }

    match snap.momentum20_pct {
        Some(m) if m > MOMENTUM_ALERT_PCT => alerts.push(
            "20-period momentum above +5%: stage profit-taking levels.".to_string(),
        ),
        Some(m) if m < -MOMENTUM_ALERT_PCT => alerts.push(
            "Short-term momentum turned negative: a retest of lows is possible, review stop levels.".to_string(),
        ),
        _ => {}
    }

    if snap.hv20_pct.is_some_and(|hv| hv > EXTREME_HV_PCT) {
        alerts.push(
            "Extreme volatility regime: only enter with at least 1:2 reward-to-risk.".to_string(),
        );
    }

    match snap.macd.map(|m| m.state) {
        Some(MacdState::Bullish) => alerts.push(
            "MACD turned up: trend has the edge, confirm against RSI for overheating.".to_string(),
        ),
        Some(MacdState::Bearish) => alerts.push(
            "MACD turned down: correction risk, wait for the signal line to turn.".to_string(),
        ),
        _ => {}
    }

    match snap.rsi_zone {
        Some(RsiZone::Overbought) => alerts.push(
            "RSI at or above 70 (overbought): consider scaling out or hedging.".to_string(),
        ),
        Some(RsiZone::Oversold) => alerts.push(
            "RSI at or below 30 (oversold): look for staged entries on a rebound.".to_string(),
        ),
        _ => {}
    }

    if snap.volume_ratio_pct.is_some_and(|r| r > VOLUME_SURGE_PCT) {
        alerts.push(
            "Volume well above its 20-period average: check for trend acceleration or a news trigger."
                .to_string(),
        );
    }

    alerts.truncate(max_alerts);
    alerts
}
