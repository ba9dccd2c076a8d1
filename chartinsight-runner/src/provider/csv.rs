//! CSV file provider.
//!
//! Accepts the common export layout `Date,Open,High,Low,Close,Volume`
//! (header names are matched case-insensitively; extra columns such as
//! `Adj Close` are ignored). Cells that do not parse become NaN so the
//! normalizer drops the row instead of the whole file failing.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chartinsight_core::domain::PricePoint;
use chrono::NaiveDate;

use super::MarketDataProvider;
use crate::error::DataError;

#[derive(Debug, Clone)]
enum Source {
    /// One file, whatever the symbol.
    File(PathBuf),
    /// `<dir>/<SYMBOL>.csv`.
    Directory(PathBuf),
}

#[derive(Debug, Clone)]
pub struct CsvProvider {
    source: Source,
}

impl CsvProvider {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::File(path.into()),
        }
    }

    pub fn directory(dir: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::Directory(dir.into()),
        }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        match &self.source {
            Source::File(path) => path.clone(),
            Source::Directory(dir) => dir.join(format!("{}.csv", symbol.to_ascii_uppercase())),
        }
    }
}

/// Parse an OHLCV CSV file.
pub fn read_csv(path: &Path) -> Result<Vec<PricePoint>, DataError> {
    let csv_err = |message: String| DataError::Csv {
        path: path.display().to_string(),
        message,
    };

    let mut reader = ::csv::ReaderBuilder::new()
        .trim(::csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_err(e.to_string()))?;

    let headers = reader.headers().map_err(|e| csv_err(e.to_string()))?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    };
    let date_col = column("date")
        .or_else(|| column("timestamp"))
        .ok_or_else(|| csv_err("missing 'date' column".to_string()))?;
    let close_col = column("close").ok_or_else(|| csv_err("missing 'close' column".to_string()))?;
    let open_col = column("open");
    let high_col = column("high");
    let low_col = column("low");
    let volume_col = column("volume");

    let mut points = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| csv_err(e.to_string()))?;
        let raw_date = record.get(date_col).unwrap_or_default();
        let date = parse_date(raw_date)
            .ok_or_else(|| csv_err(format!("row {}: bad date '{raw_date}'", line + 2)))?;

        let number = |col: Option<usize>| -> f64 {
            col.and_then(|c| record.get(c))
                .and_then(|v| v.replace(',', "").parse::<f64>().ok())
                .unwrap_or(f64::NAN)
        };
        let close = number(Some(close_col));
        points.push(PricePoint {
            date,
            open: if open_col.is_some() { number(open_col) } else { close },
            high: if high_col.is_some() { number(high_col) } else { close },
            low: if low_col.is_some() { number(low_col) } else { close },
            close,
            volume: if volume_col.is_some() { number(volume_col) } else { 0.0 },
        });
    }

    Ok(points)
}

/// `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[async_trait]
impl MarketDataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    async fn fetch(&self, symbol: &str, _timeframe: &str) -> Result<Vec<PricePoint>, DataError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        tokio::task::spawn_blocking(move || read_csv(&path))
            .await
            .map_err(|e| DataError::Io(std::io::Error::other(e.to_string())))?
    }
}
