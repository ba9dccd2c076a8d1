//! Narrative healthchecks.
//!
//! Offline checks need no network: the rule path on a synthetic series and
//! the delegating path against a canned provider reply. The live check sends
//! one real request through the configured provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chartinsight_core::domain::NormalizedSeries;
use chartinsight_core::forecast::{forecast_band, ArimaForecaster, ForecastBand, ForecastConfig};
use chartinsight_core::normalize::normalize;
use chartinsight_core::scoring::{score, ScoreBundle, ScoringConfig};
use chartinsight_core::snapshot::{IndicatorConfig, IndicatorSnapshot};
use chrono::NaiveDate;
use serde::Serialize;

use crate::config::LlmConfig;
use crate::error::NarrativeProviderError;
use crate::narrative::{
    DelegatingNarrator, Narrative, NarrativeInput, NarrativeMode, NarrativeStrategy,
    OpenAiProvider, RuleNarrator, TextProvider,
};
use crate::provider::synthetic::generate_random_walk;

const SAMPLE_SYMBOL: &str = "HEALTHCHECK";
const SAMPLE_POINTS: usize = 260;
const SAMPLE_HORIZON: usize = 21;

const CANNED_REPLY: &str = r#"{"summary":"Trend and volatility are within normal ranges.",
"actions":["Hold the core position","Add on pullbacks to the band center"],
"monitoringPoints":["Upper band proximity","Volume relative to average"]}"#;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

impl CheckOutcome {
    fn from_result(name: &'static str, result: Result<String, String>) -> Self {
        match result {
            Ok(detail) => Self {
                name,
                passed: true,
                detail,
            },
            Err(detail) => Self {
                name,
                passed: false,
                detail,
            },
        }
    }
}

struct Sample {
    snapshot: IndicatorSnapshot,
    band: Option<ForecastBand>,
    scores: ScoreBundle,
}

impl Sample {
    fn build() -> Result<Self, String> {
        let end = NaiveDate::from_ymd_opt(2024, 12, 31).ok_or("bad sample date")?;
        let raw = generate_random_walk(SAMPLE_SYMBOL, end, SAMPLE_POINTS);
        let series: NormalizedSeries = normalize(&raw, 30).map_err(|e| e.to_string())?;
        let snapshot = IndicatorSnapshot::compute(&series, &IndicatorConfig::default());
        let band = forecast_band(
            &ArimaForecaster::default(),
            &series,
            SAMPLE_HORIZON,
            &ForecastConfig::default(),
        )
        .ok();
        let scores = score(&snapshot, band.as_ref(), None, &ScoringConfig::default());
        Ok(Self {
            snapshot,
            band,
            scores,
        })
    }
}

/// Shape checks every narrative must pass.
pub fn validate_narrative(n: &Narrative, max_alerts: usize) -> Result<(), String> {
    if n.summary.trim().is_empty() {
        return Err("empty summary".into());
    }
    if !(2..=4).contains(&n.quick_notes.len()) {
        return Err(format!("{} quick notes", n.quick_notes.len()));
    }
    if n.actions.is_empty() || n.actions.len() > 3 {
        return Err(format!("{} actions", n.actions.len()));
    }
    if n.mode == NarrativeMode::Rule && n.alerts.len() > max_alerts {
        return Err(format!("{} alerts, max {max_alerts}", n.alerts.len()));
    }
    if n.mode == NarrativeMode::Llm && n.provider.is_none() {
        return Err("llm narrative without provider metadata".into());
    }
    Ok(())
}

struct CannedProvider;

#[async_trait]
impl TextProvider for CannedProvider {
    fn model(&self) -> &str {
        "canned"
    }

    async fn complete_json(
        &self,
        _system: &str,
        _user: &str,
    ) -> Result<String, NarrativeProviderError> {
        Ok(CANNED_REPLY.to_string())
    }
}

async fn check_with<S: NarrativeStrategy>(
    strategy: &S,
    expected: NarrativeMode,
    max_alerts: usize,
) -> Result<String, String> {
    let sample = Sample::build()?;
    let summary = sample.band.as_ref().and_then(ForecastBand::summary);
    let input = NarrativeInput {
        symbol: SAMPLE_SYMBOL,
        snapshot: &sample.snapshot,
        band: summary.as_ref(),
        accuracy: None,
        scores: &sample.scores,
    };
    let narrative = strategy.generate(&input).await;
    if narrative.mode != expected {
        return Err(format!("expected mode {expected}, got {}", narrative.mode));
    }
    validate_narrative(&narrative, max_alerts)?;
    Ok(narrative.summary)
}

/// Rule path and delegating path with a canned reply. No network.
pub async fn run_offline(max_alerts: usize) -> Vec<CheckOutcome> {
    let rule = RuleNarrator::new(max_alerts);
    let delegating = DelegatingNarrator::new(
        Arc::new(CannedProvider),
        Duration::from_secs(1),
        RuleNarrator::new(max_alerts),
    );
    vec![
        CheckOutcome::from_result(
            "rule",
            check_with(&rule, NarrativeMode::Rule, max_alerts).await,
        ),
        CheckOutcome::from_result(
            "delegating-canned",
            check_with(&delegating, NarrativeMode::Llm, max_alerts).await,
        ),
    ]
}

/// One real provider round trip through the delegating path.
pub async fn run_live(llm: &LlmConfig, max_alerts: usize) -> CheckOutcome {
    CheckOutcome::from_result("delegating-live", live_round_trip(llm, max_alerts).await)
}

async fn live_round_trip(llm: &LlmConfig, max_alerts: usize) -> Result<String, String> {
    let provider = OpenAiProvider::new(llm).map_err(|e| e.to_string())?;
    let narrator = DelegatingNarrator::new(
        Arc::new(provider),
        llm.timeout,
        RuleNarrator::new(max_alerts),
    );
    let sample = Sample::build()?;
    let summary = sample.band.as_ref().and_then(ForecastBand::summary);
    let input = NarrativeInput {
        symbol: SAMPLE_SYMBOL,
        snapshot: &sample.snapshot,
        band: summary.as_ref(),
        accuracy: None,
        scores: &sample.scores,
    };
    let narrative = narrator.try_generate(&input).await.map_err(|e| e.to_string())?;
    validate_narrative(&narrative, max_alerts)?;
    let meta = narrative.provider.ok_or("missing provider metadata")?;
    Ok(format!("{} answered in {} ms", meta.model, meta.latency_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_checks_pass() {
        let outcomes = run_offline(5).await;
        assert_eq!(outcomes.len(), 2);
        for outcome in &outcomes {
            assert!(outcome.passed, "{}: {}", outcome.name, outcome.detail);
        }
    }

    #[tokio::test]
    async fn live_without_key_fails_cleanly() {
        let outcome = run_live(&LlmConfig::default(), 5).await;
        assert!(!outcome.passed);
        assert!(outcome.detail.contains("no API key"));
    }

    #[test]
    fn validation_rejects_empty_summary() {
        let n = Narrative {
            summary: " ".into(),
            quick_notes: vec!["a".into(), "b".into()],
            actions: vec!["x".into()],
            alerts: vec![],
            mode: NarrativeMode::Rule,
            provider: None,
        };
        assert!(validate_narrative(&n, 5).is_err());
    }
}
