use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;

use crate::services::{
    dedup::IpHash,
    storage::{StockRecord, StoreError},
    traits::StockStore,
};

/// Process-local store keyed by symbol.
///
/// Each operation holds the shard lock of its key for the whole
/// read-modify-write, which makes it atomic per symbol.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: DashMap<String, StockRecord>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl StockStore for MemoryStore {
    async fn upsert_price(
        &self,
        symbol: &str,
        price: Option<Decimal>,
    ) -> Result<StockRecord, StoreError> {
        let record = self
            .data
            .entry(symbol.to_owned())
            .and_modify(|record| {
                if price.is_some() {
                    record.price = price;
                }
            })
            .or_insert_with(|| StockRecord::new(symbol, price));

        Ok(record.value().clone())
    }

    async fn liker_hashes(&self, symbol: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .data
            .get(symbol)
            .map(|record| record.liker_hashes.clone())
            .unwrap_or_default())
    }

    async fn record_like(&self, symbol: &str, hash: IpHash) -> Result<StockRecord, StoreError> {
        let mut record = self
            .data
            .get_mut(symbol)
            .ok_or_else(|| StoreError::NotFound(symbol.to_owned()))?;

        record.likes += 1;
        record.liker_hashes.push(hash.into_string());

        Ok(record.clone())
    }
}
