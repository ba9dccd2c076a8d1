//! Narrative Generator.
//!
//! Two strategies behind [`NarrativeStrategy`]: the deterministic
//! [`RuleNarrator`] and the [`DelegatingNarrator`], which asks an external
//! text provider for a JSON briefing and falls back to the rule narrative on
//! any provider failure. [`select_strategy`] picks one per request.

pub mod llm;
pub mod openai;
pub mod rule;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chartinsight_core::forecast::{AccuracyReport, BandSummary};
use chartinsight_core::scoring::ScoreBundle;
use chartinsight_core::snapshot::IndicatorSnapshot;
use serde::{Deserialize, Serialize};

use crate::config::{LlmConfig, NarrativeConfig, DEFAULT_LLM_TIMEOUT};
use crate::error::NarrativeProviderError;

pub use llm::{parse_briefing, Briefing, DelegatingNarrator, TextProvider};
pub use openai::OpenAiProvider;
pub use rule::RuleNarrator;

/// How a narrative was actually produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeMode {
    Rule,
    Llm,
}

impl fmt::Display for NarrativeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NarrativeMode::Rule => write!(f, "rule"),
            NarrativeMode::Llm => write!(f, "llm"),
        }
    }
}

/// Which strategy the caller asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeRequest {
    /// Delegate when credentials are configured, otherwise rule-based.
    #[default]
    Auto,
    Rule,
    Llm,
}

impl fmt::Display for NarrativeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NarrativeRequest::Auto => write!(f, "auto"),
            NarrativeRequest::Rule => write!(f, "rule"),
            NarrativeRequest::Llm => write!(f, "llm"),
        }
    }
}

impl FromStr for NarrativeRequest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(NarrativeRequest::Auto),
            "rule" => Ok(NarrativeRequest::Rule),
            "llm" => Ok(NarrativeRequest::Llm),
            other => Err(format!("unknown narrative mode '{other}' (expected auto|rule|llm)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMeta {
    pub model: String,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Narrative {
    pub summary: String,
    pub quick_notes: Vec<String>,
    pub actions: Vec<String>,
    pub alerts: Vec<String>,
    pub mode: NarrativeMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderMeta>,
}

/// Everything a strategy may read. Borrowed from the bundle under construction.
#[derive(Debug, Clone, Copy)]
pub struct NarrativeInput<'a> {
    pub symbol: &'a str,
    pub snapshot: &'a IndicatorSnapshot,
    pub band: Option<&'a BandSummary>,
    pub accuracy: Option<&'a AccuracyReport>,
    pub scores: &'a ScoreBundle,
}

#[async_trait]
pub trait NarrativeStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Never fails: strategies that can fail recover internally.
    async fn generate(&self, input: &NarrativeInput<'_>) -> Narrative;
}

/// Narrative settings shared by every request of an engine.
#[derive(Clone)]
pub struct NarrativeSettings {
    pub max_alerts: usize,
    pub timeout: Duration,
    pub provider: Option<Arc<dyn TextProvider>>,
}

impl fmt::Debug for NarrativeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NarrativeSettings")
            .field("max_alerts", &self.max_alerts)
            .field("timeout", &self.timeout)
            .field("provider", &self.provider.as_ref().map(|p| p.model().to_string()))
            .finish()
    }
}

impl NarrativeSettings {
    pub fn rule_only(max_alerts: usize) -> Self {
        Self {
            max_alerts,
            timeout: DEFAULT_LLM_TIMEOUT,
            provider: None,
        }
    }

    pub fn with_provider(
        max_alerts: usize,
        timeout: Duration,
        provider: Arc<dyn TextProvider>,
    ) -> Self {
        Self {
            max_alerts,
            timeout,
            provider: Some(provider),
        }
    }

    /// Wire an OpenAI-compatible provider when credentials are present.
    pub fn from_llm_config(
        narrative: &NarrativeConfig,
        llm: &LlmConfig,
    ) -> Result<Self, NarrativeProviderError> {
        if !llm.has_credentials() {
            return Ok(Self {
                timeout: llm.timeout,
                ..Self::rule_only(narrative.max_alerts)
            });
        }
        let provider = OpenAiProvider::new(llm)?;
        Ok(Self::with_provider(
            narrative.max_alerts,
            llm.timeout,
            Arc::new(provider),
        ))
    }
}

/// Pick the strategy for one request.
pub fn select_strategy(
    request: NarrativeRequest,
    settings: &NarrativeSettings,
) -> Box<dyn NarrativeStrategy> {
    let rule = RuleNarrator::new(settings.max_alerts);
    match (request, &settings.provider) {
        (NarrativeRequest::Rule, _) | (NarrativeRequest::Auto, None) => Box::new(rule),
        (NarrativeRequest::Llm, None) => {
            tracing::warn!(
                error = %NarrativeProviderError::MissingCredentials,
                "llm narrative requested, falling back to rule"
            );
            Box::new(rule)
        }
        (NarrativeRequest::Auto | NarrativeRequest::Llm, Some(provider)) => Box::new(
            DelegatingNarrator::new(Arc::clone(provider), settings.timeout, rule),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nop;

    #[async_trait]
    impl TextProvider for Nop {
        fn model(&self) -> &str {
            "nop"
        }

        async fn complete_json(
            &self,
            _system: &str,
            _user: &str,
        ) -> Result<String, NarrativeProviderError> {
            Err(NarrativeProviderError::Transport("nop".into()))
        }
    }

    #[test]
    fn request_parses_case_insensitively() {
        assert_eq!("AUTO".parse::<NarrativeRequest>(), Ok(NarrativeRequest::Auto));
        assert_eq!(" llm ".parse::<NarrativeRequest>(), Ok(NarrativeRequest::Llm));
        assert!("gpt".parse::<NarrativeRequest>().is_err());
        assert_eq!(NarrativeRequest::default(), NarrativeRequest::Auto);
    }

    #[test]
    fn selection_table() {
        let without = NarrativeSettings::rule_only(5);
        let with = NarrativeSettings::with_provider(5, Duration::from_secs(1), Arc::new(Nop));

        assert_eq!(select_strategy(NarrativeRequest::Auto, &without).name(), "rule");
        assert_eq!(select_strategy(NarrativeRequest::Llm, &without).name(), "rule");
        assert_eq!(select_strategy(NarrativeRequest::Rule, &with).name(), "rule");
        assert_eq!(select_strategy(NarrativeRequest::Auto, &with).name(), "delegating");
        assert_eq!(select_strategy(NarrativeRequest::Llm, &with).name(), "delegating");
    }

    #[test]
    fn settings_without_key_are_rule_only() {
        let settings =
            NarrativeSettings::from_llm_config(&NarrativeConfig::default(), &LlmConfig::default())
                .unwrap();
        assert!(settings.provider.is_none());
        assert_eq!(settings.max_alerts, 5);
    }

    #[test]
    fn mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&NarrativeMode::Llm).unwrap(), "\"llm\"");
        assert_eq!(serde_json::to_string(&NarrativeRequest::Rule).unwrap(), "\"rule\"");
    }
}
