//! Domain types for ChartInsight

pub mod price_point;

pub use price_point::{NormalizedSeries, PricePoint};

/// Symbol type alias
pub type Symbol = String;
