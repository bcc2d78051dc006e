//! Market data access port.

use crate::domain::error::PairtraderError;
use crate::domain::quote::{Quote, Trade};

/// Source of per-instrument quote and trade history for one trading period.
pub trait QuoteSource {
    /// Quotes in non-decreasing timestamp order.
    fn fetch_quotes(&self, instrument: &str) -> Result<Vec<Quote>, PairtraderError>;

    fn fetch_trades(&self, instrument: &str) -> Result<Vec<Trade>, PairtraderError>;

    /// Instruments available in the period, sorted.
    fn list_instruments(&self) -> Result<Vec<String>, PairtraderError>;
}
