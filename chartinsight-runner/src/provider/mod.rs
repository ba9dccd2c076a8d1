//! Market-data providers.
//!
//! The engine itself only consumes raw rows; providers are the external
//! collaborator that supplies them. Each implementation handles one source
//! (CSV files, the Yahoo chart API, a seeded random walk) so sources can be
//! swapped and mocked in tests.

pub mod csv;
pub mod symbols;
pub mod synthetic;
pub mod yahoo;

use async_trait::async_trait;
use chartinsight_core::domain::PricePoint;
use serde::Serialize;

use crate::error::DataError;

pub use self::csv::CsvProvider;
pub use symbols::SymbolDirectory;
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;

/// Source of raw OHLCV rows for a symbol and timeframe.
///
/// Rows may be unsorted, duplicated or partially invalid; normalization is
/// the engine's job, not the provider's.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    async fn fetch(&self, symbol: &str, timeframe: &str) -> Result<Vec<PricePoint>, DataError>;
}

/// A canonical ticker and the market it trades on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolListing {
    pub symbol: String,
    pub description: String,
    pub exchange: String,
}

/// Resolves a free-form query (ticker or company name) to a listing.
#[async_trait]
pub trait SymbolResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<SymbolListing, DataError>;
}
