use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::{
    libs::quote_client::QuoteError,
    services::{
        dedup::IpHash,
        storage::{StockRecord, StoreError},
    },
};

/// Source of the latest traded price for a ticker symbol.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_price(&self, symbol: &str) -> Result<Decimal, QuoteError>;
}

/// Persistence of [`StockRecord`]s, keyed by symbol.
///
/// Every method is atomic with respect to concurrent callers on the same
/// symbol. Implementations keep `likes == liker_hashes.len()`.
#[async_trait]
pub trait StockStore: Send + Sync {
    /// Creates the record if absent, otherwise overwrites its price.
    /// A `None` price leaves the last known price in place.
    async fn upsert_price(
        &self,
        symbol: &str,
        price: Option<Decimal>,
    ) -> Result<StockRecord, StoreError>;

    /// Stored liker hashes in insertion order. Unknown symbols have none.
    async fn liker_hashes(&self, symbol: &str) -> Result<Vec<String>, StoreError>;

    /// Increments the like count and appends `hash` in one step.
    async fn record_like(&self, symbol: &str, hash: IpHash) -> Result<StockRecord, StoreError>;

    /// Releases the underlying resources.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
