//! Error types for the runner.
//!
//! `InsightError` is the only failure that crosses the orchestrator boundary.
//! Forecast fit failures and narrative-provider failures are absorbed inside
//! the orchestrator and show up as bundle metadata instead.

use std::time::Duration;

use chartinsight_core::normalize::NormalizeError;
use thiserror::Error;

/// Failure of an insight, accuracy or evaluation request.
///
/// `Clone` so that every waiter coalesced onto one computation receives the
/// same failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsightError {
    #[error("insufficient data: {available} usable points, {required} required")]
    InsufficientData { required: usize, available: usize },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("market data unavailable: {0}")]
    DataUnavailable(String),

    #[error("not computable: {0}")]
    NotComputable(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<NormalizeError> for InsightError {
    fn from(e: NormalizeError) -> Self {
        match e {
            NormalizeError::InsufficientData {
                required,
                available,
            } => InsightError::InsufficientData {
                required,
                available,
            },
        }
    }
}

impl From<DataError> for InsightError {
    fn from(e: DataError) -> Self {
        InsightError::DataUnavailable(e.to_string())
    }
}

/// Structured error types for market-data providers.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("unsupported timeframe '{0}'")]
    UnsupportedTimeframe(String),

    #[error("CSV error in {path}: {message}")]
    Csv { path: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid value for {var}: {message}")]
    Env { var: String, message: String },
}

impl From<ConfigError> for InsightError {
    fn from(e: ConfigError) -> Self {
        InsightError::Config(e.to_string())
    }
}

/// Failure of the delegating narrative strategy. Always recovered by falling
/// back to the rule-based narrative.
#[derive(Debug, Error)]
pub enum NarrativeProviderError {
    #[error("no API key configured")]
    MissingCredentials,

    #[error("provider timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    #[error("schema validation failed: {0}")]
    Schema(String),
}
