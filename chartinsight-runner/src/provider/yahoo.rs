//! Yahoo Finance provider.
//!
//! Fetches OHLCV bars from Yahoo's v8 chart API with a bounded request
//! timeout and a short exponential backoff on rate limits and transient
//! failures. Yahoo has no official API and changes format without notice;
//! the CSV provider is the fallback when it is unavailable.

use std::time::Duration;

use async_trait::async_trait;
use chartinsight_core::domain::PricePoint;
use serde::Deserialize;

use super::MarketDataProvider;
use crate::error::DataError;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const DEFAULT_RANGE: &str = "2y";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

pub struct YahooProvider {
    client: reqwest::Client,
    base_url: String,
    range: String,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub fn new(timeout: Duration) -> Result<Self, DataError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            range: DEFAULT_RANGE.to_string(),
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        })
    }

    /// History window requested from the API, e.g. `1y`, `2y`, `5y`.
    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = range.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn interval(timeframe: &str) -> Result<&'static str, DataError> {
        match timeframe {
            "1d" => Ok("1d"),
            "1wk" | "1w" => Ok("1wk"),
            "1mo" | "1m" => Ok("1mo"),
            other => Err(DataError::UnsupportedTimeframe(other.to_string())),
        }
    }

    fn chart_url(&self, symbol: &str, interval: &str) -> String {
        format!(
            "{}/{symbol}?range={}&interval={interval}",
            self.base_url.trim_end_matches('/'),
            self.range
        )
    }

    async fn fetch_with_retry(&self, url: &str, symbol: &str) -> Result<ChartResponse, DataError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.base_delay * 2u32.pow(attempt - 1)).await;
            }

            let resp = match self.client.get(url).send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    tracing::debug!(symbol, attempt, error = %e, "yahoo request failed, retrying");
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(DataError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                });
            }
            if status.is_server_error() {
                last_error = Some(DataError::NetworkUnreachable(format!(
                    "HTTP {status} for {symbol}"
                )));
                continue;
            }
            if !status.is_success() {
                return Err(DataError::ResponseFormatChanged(format!(
                    "HTTP {status} for {symbol}"
                )));
            }

            return resp.json::<ChartResponse>().await.map_err(|e| {
                DataError::ResponseFormatChanged(format!(
                    "failed to parse response for {symbol}: {e}"
                ))
            });
        }

        Err(last_error
            .unwrap_or_else(|| DataError::NetworkUnreachable("max retries exceeded".into())))
    }
}

fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<PricePoint>, DataError> {
    let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
        Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        },
        Some(err) => DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description)),
        None => DataError::ResponseFormatChanged("empty result with no error".into()),
    })?;

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;
    let timestamps = data
        .timestamp
        .ok_or_else(|| DataError::ResponseFormatChanged("no timestamps".into()))?;
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

    let at = |v: &[Option<f64>], i: usize| v.get(i).copied().flatten();
    let mut points = Vec::with_capacity(timestamps.len());

    for (i, &ts) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.naive_utc().date())
            .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

        let (open, high, low, close, volume) = (
            at(&quote.open, i),
            at(&quote.high, i),
            at(&quote.low, i),
            at(&quote.close, i),
            at(&quote.volume, i),
        );
        // Non-trading placeholders carry no values at all.
        if open.is_none() && high.is_none() && low.is_none() && close.is_none() {
            continue;
        }

        points.push(PricePoint {
            date,
            open: open.unwrap_or(f64::NAN),
            high: high.unwrap_or(f64::NAN),
            low: low.unwrap_or(f64::NAN),
            close: close.unwrap_or(f64::NAN),
            volume: volume.unwrap_or(0.0),
        });
    }

    if points.is_empty() {
        return Err(DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        });
    }
    Ok(points)
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    async fn fetch(&self, symbol: &str, timeframe: &str) -> Result<Vec<PricePoint>, DataError> {
        let interval = Self::interval(timeframe)?;
        let url = self.chart_url(symbol, interval);
        let chart = self.fetch_with_retry(&url, symbol).await?;
        let points = parse_response(symbol, chart)?;
        tracing::debug!(symbol, points = points.len(), "fetched yahoo chart");
        Ok(points)
    }
}
