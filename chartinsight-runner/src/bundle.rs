//! The orchestrator's output.

use chartinsight_core::forecast::{AccuracyReport, BandPoint, BandSummary};
use chartinsight_core::scoring::ScoreBundle;
use chartinsight_core::snapshot::IndicatorSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::narrative::{Narrative, NarrativeMode};

pub const BUNDLE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleMeta {
    pub schema_version: u32,
    pub symbol: String,
    pub timeframe: String,
    pub horizon: usize,
    pub generated_at: DateTime<Utc>,
    /// Model fit failed: band and accuracy are empty, forecast-derived
    /// scoring terms took their neutral defaults.
    pub forecast_degraded: bool,
    pub narrative_mode: NarrativeMode,
    pub forecaster: String,
    pub cache_key: String,
}

/// Complete, internally consistent insight for one request. Immutable once
/// built; shared between coalesced callers behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightBundle {
    pub meta: BundleMeta,
    pub indicators: IndicatorSnapshot,
    pub band: Vec<BandPoint>,
    pub band_summary: Option<BandSummary>,
    pub accuracy: Option<AccuracyReport>,
    pub scores: ScoreBundle,
    pub narrative: Narrative,
}
