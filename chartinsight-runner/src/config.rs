//! Engine configuration (TOML) and LLM provider settings (environment).

use std::path::Path;
use std::time::Duration;

use chartinsight_core::forecast::ForecastConfig;
use chartinsight_core::normalize::DEFAULT_MIN_POINTS;
use chartinsight_core::scoring::ScoringConfig;
use chartinsight_core::snapshot::IndicatorConfig;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Complete engine configuration. Every section falls back to its defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub normalizer: NormalizerConfig,
    pub indicators: IndicatorConfig,
    pub forecast: ForecastConfig,
    pub scoring: ScoringConfig,
    pub cache: CacheConfig,
    pub narrative: NarrativeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub min_points: usize,
    /// Raise the minimum to the longest indicator lookback.
    pub require_full_lookback: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            min_points: DEFAULT_MIN_POINTS,
            require_full_lookback: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    /// Number of latest points covered by the cache-key content hash.
    pub hash_points: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            hash_points: 60,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeConfig {
    pub max_alerts: usize,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self { max_alerts: 5 }
    }
}

impl EngineConfig {
    /// Load and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Minimum series length the normalizer enforces.
    pub fn min_points(&self) -> usize {
        if self.normalizer.require_full_lookback {
            self.normalizer
                .min_points
                .max(self.indicators.max_required_len())
        } else {
            self.normalizer.min_points
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        let ind = &self.indicators;
        let windows = [
            ("indicators.sma_short", ind.sma_short),
            ("indicators.sma_long", ind.sma_long),
            ("indicators.macd_fast", ind.macd_fast),
            ("indicators.macd_signal", ind.macd_signal),
            ("indicators.rsi_period", ind.rsi_period),
            ("indicators.bollinger_period", ind.bollinger_period),
            ("indicators.atr_period", ind.atr_period),
            ("indicators.volume_period", ind.volume_period),
            ("indicators.psychology_period", ind.psychology_period),
            ("indicators.momentum_period", ind.momentum_period),
        ];
        for (name, value) in windows {
            if value == 0 {
                return invalid(format!("{name} must be >= 1"));
            }
        }
        if ind.hv_period < 2 {
            return invalid("indicators.hv_period must be >= 2".to_string());
        }
        if ind.macd_fast >= ind.macd_slow {
            return invalid("indicators.macd_fast must be below macd_slow".to_string());
        }
        if ind.mdd_lookback == Some(0) {
            return invalid("indicators.mdd_lookback must be >= 1".to_string());
        }
        if !(ind.bollinger_k.is_finite() && ind.bollinger_k > 0.0) {
            return invalid("indicators.bollinger_k must be positive".to_string());
        }
        if !(ind.hv_annualization.is_finite() && ind.hv_annualization > 0.0) {
            return invalid("indicators.hv_annualization must be positive".to_string());
        }

        let fc = &self.forecast;
        if fc.max_horizon == 0 {
            return invalid("forecast.max_horizon must be >= 1".to_string());
        }
        if fc.default_horizon == 0 || fc.default_horizon > fc.max_horizon {
            return invalid(format!(
                "forecast.default_horizon must be in 1..={}",
                fc.max_horizon
            ));
        }
        if !(fc.confidence > 0.0 && fc.confidence < 1.0) {
            return invalid("forecast.confidence must be in (0, 1)".to_string());
        }
        if !(fc.ridge.is_finite() && fc.ridge >= 0.0) {
            return invalid("forecast.ridge must be non-negative".to_string());
        }
        if !(fc.max_ar >= 0.0 && fc.max_ar < 1.0) {
            return invalid("forecast.max_ar must be in [0, 1)".to_string());
        }

        self.scoring
            .validate()
            .map_err(|msg| ConfigError::Invalid(format!("scoring: {msg}")))?;

        if self.cache.hash_points == 0 {
            return invalid("cache.hash_points must be >= 1".to_string());
        }
        if self.narrative.max_alerts == 0 {
            return invalid("narrative.max_alerts must be >= 1".to_string());
        }
        Ok(())
    }
}

pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_TEMPERATURE: f32 = 0.35;
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(8);

/// Settings for the optional briefing provider.
///
/// `Debug` never prints the key.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_LLM_MODEL.to_string(),
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            temperature: DEFAULT_LLM_TEMPERATURE,
            timeout: DEFAULT_LLM_TIMEOUT,
        }
    }
}

impl LlmConfig {
    /// Read `LLM_*` variables. A `.env` file in the working directory is
    /// loaded first; variables already set in the environment win.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = match non_empty("LLM_API_KEY") {
            Some(key) => Some(key),
            None => match non_empty("LLM_API_KEY_FILE") {
                Some(path) => {
                    let content =
                        std::fs::read_to_string(&path).map_err(|e| ConfigError::Env {
                            var: "LLM_API_KEY_FILE".to_string(),
                            message: format!("{path}: {e}"),
                        })?;
                    Some(content.trim().to_string()).filter(|k| !k.is_empty())
                }
                None => None,
            },
        };

        let temperature = match non_empty("LLM_TEMPERATURE") {
            Some(raw) => {
                let t: f32 = raw.parse().map_err(|_| ConfigError::Env {
                    var: "LLM_TEMPERATURE".to_string(),
                    message: format!("'{raw}' is not a number"),
                })?;
                if !(0.0..=2.0).contains(&t) {
                    return Err(ConfigError::Env {
                        var: "LLM_TEMPERATURE".to_string(),
                        message: format!("{t} outside 0..=2"),
                    });
                }
                t
            }
            None => DEFAULT_LLM_TEMPERATURE,
        };

        let timeout = match non_empty("LLM_TIMEOUT") {
            Some(raw) => {
                let secs: f64 = raw.parse().map_err(|_| ConfigError::Env {
                    var: "LLM_TIMEOUT".to_string(),
                    message: format!("'{raw}' is not a number of seconds"),
                })?;
                if !secs.is_finite() {
                    return Err(ConfigError::Env {
                        var: "LLM_TIMEOUT".to_string(),
                        message: format!("'{raw}' is not finite"),
                    });
                }
                Duration::from_secs_f64(secs.clamp(1.0, 30.0))
            }
            None => DEFAULT_LLM_TIMEOUT,
        };

        Ok(Self {
            api_key: api_key.map(Secret::new),
            model: non_empty("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            base_url: non_empty("LLM_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            temperature,
            timeout,
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().is_empty())
    }
}
