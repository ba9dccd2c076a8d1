//! Symbol directory backed by listing CSVs.
//!
//! Each file carries `symbol` and `name` (or `description`) columns and an
//! optional `exchange` column; without it the file stem is the exchange
//! label (`stocks_us.csv` -> `STOCKS_US`).

use std::path::Path;

use async_trait::async_trait;

use super::{SymbolListing, SymbolResolver};
use crate::error::DataError;

#[derive(Debug, Clone, Default)]
pub struct SymbolDirectory {
    listings: Vec<SymbolListing>,
}

impl SymbolDirectory {
    pub fn from_listings(listings: Vec<SymbolListing>) -> Self {
        Self { listings }
    }

    /// Load one listing file. Rows without a symbol or a name are skipped.
    pub fn from_csv(path: &Path) -> Result<Self, DataError> {
        let mut dir = Self::default();
        dir.load_csv(path)?;
        Ok(dir)
    }

    /// Append the rows of another listing file.
    pub fn load_csv(&mut self, path: &Path) -> Result<(), DataError> {
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
        let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
        let symbol_col = column("symbol").ok_or_else(|| csv_err("missing 'symbol' column".into()))?;
        let name_col = column("name")
            .or_else(|| column("description"))
            .ok_or_else(|| csv_err("missing 'name' column".into()))?;
        let exchange_col = column("exchange");
        let default_exchange = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_ascii_uppercase())
            .unwrap_or_default();

        for record in reader.records() {
            let record = record.map_err(|e| csv_err(e.to_string()))?;
            let symbol = record.get(symbol_col).unwrap_or_default();
            let description = record.get(name_col).unwrap_or_default();
            if symbol.is_empty() || description.is_empty() {
                continue;
            }
            let exchange = exchange_col
                .and_then(|c| record.get(c))
                .filter(|e| !e.is_empty())
                .map_or_else(|| default_exchange.clone(), str::to_string);
            self.listings.push(SymbolListing {
                symbol: symbol.to_ascii_uppercase(),
                description: description.to_string(),
                exchange,
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Exact ticker first, then the ticker without its market suffix
    /// (`005930` for `005930.KS`), then a case-insensitive name match.
    pub fn lookup(&self, query: &str) -> Option<&SymbolListing> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        let upper = query.to_ascii_uppercase();
        let lower = query.to_lowercase();
        self.listings
            .iter()
            .find(|l| l.symbol == upper)
            .or_else(|| {
                self.listings
                    .iter()
                    .find(|l| l.symbol.split_once('.').is_some_and(|(base, _)| base == upper))
            })
            .or_else(|| {
                self.listings
                    .iter()
                    .find(|l| l.description.to_lowercase() == lower)
            })
            .or_else(|| {
                self.listings
                    .iter()
                    .find(|l| l.description.to_lowercase().contains(&lower))
            })
    }
}

#[async_trait]
impl SymbolResolver for SymbolDirectory {
    async fn resolve(&self, query: &str) -> Result<SymbolListing, DataError> {
        self.lookup(query)
            .cloned()
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: query.trim().to_string(),
            })
    }
}
