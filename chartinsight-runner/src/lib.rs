//! ChartInsight Runner: the async half of the decision-insight engine.
//!
//! This crate builds on `chartinsight-core` to provide:
//! - Engine configuration (TOML) and LLM settings (environment)
//! - Market-data providers (CSV, Yahoo chart API, synthetic)
//! - Narrative Generator (rule-based, delegating, OpenAI-compatible provider)
//! - TTL bundle cache and per-key in-flight coalescing
//! - The Decision-Insight Orchestrator
//! - Narrative healthchecks and tracing setup

pub mod bundle;
pub mod cache;
pub mod config;
pub mod error;
pub mod healthcheck;
pub mod narrative;
pub mod orchestrator;
pub mod provider;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;

pub use bundle::{BundleMeta, InsightBundle, BUNDLE_SCHEMA_VERSION};
pub use cache::{InsightCache, TtlCache};
pub use config::{EngineConfig, LlmConfig};
pub use error::{ConfigError, DataError, InsightError, NarrativeProviderError};
pub use narrative::{
    Narrative, NarrativeMode, NarrativeRequest, NarrativeSettings, NarrativeStrategy, TextProvider,
};
pub use orchestrator::{validate_symbol, InsightEngine, InsightRequest, DEFAULT_TIMEFRAME};
pub use provider::{
    CsvProvider, MarketDataProvider, SymbolDirectory, SymbolListing, SymbolResolver,
    SyntheticProvider, YahooProvider,
};
