//! Delegating strategy: ask an external text provider for a JSON briefing.
//!
//! The request carries a compact numeric snapshot only. The reply must match
//! `{summary, actions[2..=3], monitoringPoints[2..=3]}`. Missing credentials,
//! timeouts, transport errors, malformed JSON and schema violations are all
//! recovered in [`DelegatingNarrator::generate`] by rendering the rule
//! narrative instead.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::rule::RuleNarrator;
use super::{Narrative, NarrativeInput, NarrativeMode, NarrativeStrategy, ProviderMeta};
use crate::error::NarrativeProviderError;

const LIST_LEN: std::ops::RangeInclusive<usize> = 2..=3;

const SYSTEM_PROMPT: &str = "You are a quantitative research analyst who writes concise, \
professional market briefings. Reply with a single JSON object and nothing else.";

/// A chat-style completion endpoint that returns JSON text.
#[async_trait]
pub trait TextProvider: Send + Sync {
    fn model(&self) -> &str;

    async fn complete_json(&self, system: &str, user: &str)
        -> Result<String, NarrativeProviderError>;
}

/// Validated provider reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Briefing {
    pub summary: String,
    pub actions: Vec<String>,
    #[serde(alias = "monitoring_points")]
    pub monitoring_points: Vec<String>,
}

/// Parse and validate a provider reply.
pub fn parse_briefing(content: &str) -> Result<Briefing, NarrativeProviderError> {
    let briefing: Briefing = serde_json::from_str(content).map_err(|e| {
        if e.is_data() {
            NarrativeProviderError::Schema(e.to_string())
        } else {
            NarrativeProviderError::MalformedJson(e.to_string())
        }
    })?;

    if briefing.summary.trim().is_empty() {
        return Err(NarrativeProviderError::Schema("summary is empty".into()));
    }
    check_list("actions", &briefing.actions)?;
    check_list("monitoringPoints", &briefing.monitoring_points)?;
    Ok(briefing)
}

fn check_list(field: &str, items: &[String]) -> Result<(), NarrativeProviderError> {
    if !LIST_LEN.contains(&items.len()) {
        return Err(NarrativeProviderError::Schema(format!(
            "{field} has {} items, expected 2 to 3",
            items.len()
        )));
    }
    if items.iter().any(|s| s.trim().is_empty()) {
        return Err(NarrativeProviderError::Schema(format!(
            "{field} contains an empty item"
        )));
    }
    Ok(())
}

/// Compact numeric payload sent to the provider.
pub(crate) fn compact_payload(input: &NarrativeInput<'_>) -> Value {
    let snap = input.snapshot;
    let scores = input.scores;
    json!({
        "symbol": input.symbol,
        "asOf": snap.as_of,
        "close": snap.close,
        "changeRatePct": snap.change_rate_pct,
        "sma20": snap.sma20,
        "sma60": snap.sma60,
        "macdHist": snap.macd.map(|m| m.hist),
        "macdState": snap.macd.map(|m| m.state),
        "rsi14": snap.rsi14,
        "hv20Pct": snap.hv20_pct,
        "atrPct": snap.atr_pct,
        "mddPct": snap.mdd_pct,
        "momentum20Pct": snap.momentum20_pct,
        "volumeRatioPct": snap.volume_ratio_pct,
        "psychologyPct": snap.investor_psychology_pct,
        "band": input.band.map(|b| json!({
            "horizon": b.horizon_label,
            "upper": b.upper,
            "lower": b.lower,
            "center": b.center,
        })),
        "accuracy": input.accuracy.map(|a| json!({
            "mape": a.mape,
            "coveragePct": a.coverage_pct,
        })),
        "scores": {
            "trend": scores.trend_score,
            "risk": scores.risk_score,
            "confidence": scores.confidence_score,
            "signal": scores.signal,
        },
    })
}

fn user_prompt(payload: &Value, reference: &Narrative) -> String {
    format!(
        "Write a short market briefing from the indicator snapshot below.\n\
         Requirements:\n\
         - summary: one sentence linking trend, momentum, volatility, volume and the forecast band\n\
         - actions: 2 to 3 trading action guidelines\n\
         - monitoringPoints: 2 to 3 risk points to watch\n\
         Keep the numbers consistent with the snapshot.\n\n\
         Snapshot (JSON):\n{payload}\n\n\
         Rule-based reference summary (rewrite, do not copy):\n{}\n\n\
         Schema:\n{{\"summary\": \"...\", \"actions\": [\"...\", \"...\"], \"monitoringPoints\": [\"...\", \"...\"]}}",
        reference.summary
    )
}

pub struct DelegatingNarrator {
    provider: Arc<dyn TextProvider>,
    timeout: Duration,
    fallback: RuleNarrator,
}

impl DelegatingNarrator {
    pub fn new(provider: Arc<dyn TextProvider>, timeout: Duration, fallback: RuleNarrator) -> Self {
        Self {
            provider,
            timeout,
            fallback,
        }
    }

    /// Provider path without the rule fallback; used by the live healthcheck.
    pub async fn try_generate(
        &self,
        input: &NarrativeInput<'_>,
    ) -> Result<Narrative, NarrativeProviderError> {
        let reference = self.fallback.render(input);
        self.delegate(input, &reference).await
    }

    /// One provider round trip. Any error here is recoverable.
    async fn delegate(
        &self,
        input: &NarrativeInput<'_>,
        reference: &Narrative,
    ) -> Result<Narrative, NarrativeProviderError> {
        let payload = compact_payload(input);
        let prompt = user_prompt(&payload, reference);

        let started = Instant::now();
        let content = tokio::time::timeout(
            self.timeout,
            self.provider.complete_json(SYSTEM_PROMPT, &prompt),
        )
        .await
        .map_err(|_| NarrativeProviderError::Timeout(self.timeout))??;
        let latency_ms = started.elapsed().as_millis() as u64;

        let briefing = parse_briefing(&content)?;
        Ok(Narrative {
            summary: briefing.summary.trim().to_string(),
            quick_notes: reference.quick_notes.clone(),
            actions: briefing.actions,
            alerts: briefing.monitoring_points,
            mode: NarrativeMode::Llm,
            provider: Some(ProviderMeta {
                model: self.provider.model().to_string(),
                latency_ms,
            }),
        })
    }
}

#[async_trait]
impl NarrativeStrategy for DelegatingNarrator {
    fn name(&self) -> &'static str {
        "delegating"
    }

    async fn generate(&self, input: &NarrativeInput<'_>) -> Narrative {
        let reference = self.fallback.render(input);
        match self.delegate(input, &reference).await {
            Ok(narrative) => {
                tracing::debug!(model = self.provider.model(), "llm narrative accepted");
                narrative
            }
            Err(error) => {
                tracing::warn!(
                    model = self.provider.model(),
                    %error,
                    "llm narrative failed, using rule narrative"
                );
                reference
            }
        }
    }
}
