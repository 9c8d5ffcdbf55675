use std::{net::IpAddr, sync::Arc};

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::services::{
    dedup::IpHasher,
    metrics::METRICS,
    storage::{StockRecord, StoreError},
    traits::{PriceSource, StockStore},
};

/// Symbols requested by one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Single(String),
    Compare([String; 2]),
}

/// Price and absolute like count of one stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockLikes {
    pub stock: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    pub likes: u64,
}

/// Price of one stock and its like count relative to the other compared
/// stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelativeLikes {
    pub stock: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    pub rel_likes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StockData {
    Single(StockLikes),
    Compare([RelativeLikes; 2]),
}

/// Composes price fetching, persistence and like deduplication for a request.
///
/// Steps for a symbol always run in order: fetch, upsert, dedup check, record.
/// An unavailable price only skips the price update, a hashing failure only
/// skips the like, and a store failure fails the whole lookup.
pub struct StockService {
    prices: Arc<dyn PriceSource>,
    store: Arc<dyn StockStore>,
    hasher: IpHasher,
}

impl StockService {
    #[must_use]
    pub fn new(prices: Arc<dyn PriceSource>, store: Arc<dyn StockStore>, hasher: IpHasher) -> Self {
        Self {
            prices,
            store,
            hasher,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn StockStore> {
        &self.store
    }

    /// Resolves one request: refreshes every requested symbol in order and
    /// builds either the single-stock or the relative-likes view.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if any store operation fails. Price and hashing
    /// failures are not errors here; they only skip the price update or the
    /// like.
    pub async fn lookup(
        &self,
        lookup: &Lookup,
        ip: IpAddr,
        like: bool,
    ) -> Result<StockData, StoreError> {
        match lookup {
            Lookup::Single(symbol) => {
                METRICS.record_lookup("single");
                let record = self.refresh(symbol, ip, like).await?;
                Ok(StockData::Single(StockLikes {
                    stock: record.symbol,
                    price: record.price,
                    likes: record.likes,
                }))
            }
            Lookup::Compare([first, second]) => {
                METRICS.record_lookup("compare");
                // Liking while comparing likes both stocks.
                let first = self.refresh(first, ip, like).await?;
                let second = self.refresh(second, ip, like).await?;
                Ok(StockData::Compare(relative_likes(first, second)))
            }
        }
    }

    /// Refreshes the price of `symbol` and, when `like` is set, records the
    /// caller's like unless the IP already liked it.
    pub async fn refresh(
        &self,
        symbol: &str,
        ip: IpAddr,
        like: bool,
    ) -> Result<StockRecord, StoreError> {
        let price = match self.prices.fetch_price(symbol).await {
            Ok(price) => Some(price),
            Err(e) => {
                warn!(symbol, error = %e, "price unavailable, keeping last known");
                METRICS.record_price_failure((&e).into());
                None
            }
        };

        let record = self.store.upsert_price(symbol, price).await?;
        if !like {
            return Ok(record);
        }

        self.like(record, ip).await
    }

    async fn like(&self, record: StockRecord, ip: IpAddr) -> Result<StockRecord, StoreError> {
        let hashes = self.store.liker_hashes(&record.symbol).await?;

        match self.hasher.is_already_liked(ip, hashes).await {
            Ok(false) => {}
            Ok(true) => {
                debug!(symbol = %record.symbol, "ip already liked stock");
                METRICS.record_skipped_like("duplicate");
                return Ok(record);
            }
            Err(e) => {
                error!(symbol = %record.symbol, error = %e, "liker verification failed, like skipped");
                METRICS.record_skipped_like("hash_failure");
                return Ok(record);
            }
        }

        let hash = match self.hasher.hash(ip).await {
            Ok(hash) => hash,
            Err(e) => {
                error!(symbol = %record.symbol, error = %e, "ip hashing failed, like skipped");
                METRICS.record_skipped_like("hash_failure");
                return Ok(record);
            }
        };

        let record = self.store.record_like(&record.symbol, hash).await?;
        info!(symbol = %record.symbol, likes = record.likes, "like recorded");
        METRICS.record_like();

        Ok(record)
    }
}

/// `rel_likes` of each stock is the other's likes minus its own.
fn relative_likes(first: StockRecord, second: StockRecord) -> [RelativeLikes; 2] {
    let diff = signed(second.likes) - signed(first.likes);

    [
        RelativeLikes {
            stock: first.symbol,
            price: first.price,
            rel_likes: diff,
        },
        RelativeLikes {
            stock: second.symbol,
            price: second.price,
            rel_likes: -diff,
        },
    ]
}

fn signed(likes: u64) -> i64 {
    i64::try_from(likes).unwrap_or(i64::MAX)
}
