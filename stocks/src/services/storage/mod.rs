pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use rust_decimal::Decimal;
use strum::Display;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::{config::StorageConfig, services::traits::StockStore};

/// Persisted state of one ticker symbol.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StockRecord {
    /// Natural key.
    pub symbol: String,
    /// Last successfully fetched price.
    pub price: Option<Decimal>,
    /// Number of distinct liking IPs.
    pub likes: u64,
    /// One bcrypt hash per liking IP, oldest first.
    pub liker_hashes: Vec<String>,
}

impl StockRecord {
    #[must_use]
    pub fn new(symbol: &str, price: Option<Decimal>) -> Self {
        Self {
            symbol: symbol.to_owned(),
            price,
            ..Default::default()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("stock {0} not found")]
    NotFound(String),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("corrupt record for {symbol}: {reason}")]
    Corrupt { symbol: String, reason: String },
}

/// Storage backend kind, used as a log label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Backend {
    Memory,
    Sqlite,
}

impl From<&StorageConfig> for Backend {
    fn from(cfg: &StorageConfig) -> Self {
        match cfg {
            StorageConfig::Memory => Self::Memory,
            StorageConfig::Sqlite { .. } => Self::Sqlite,
        }
    }
}

/// Opens the configured backend.
///
/// The returned handle is shared by every request; call
/// [`StockStore::close`] once the server has stopped.
pub async fn connect(cfg: &StorageConfig) -> Result<Arc<dyn StockStore>, StoreError> {
    let store: Arc<dyn StockStore> = match cfg {
        StorageConfig::Memory => Arc::new(MemoryStore::new()),
        StorageConfig::Sqlite { path, pool_size } => {
            Arc::new(SqliteStore::open(path.clone(), *pool_size).await?)
        }
    };

    tracing::info!(backend = %Backend::from(cfg), "stock store connected");

    Ok(store)
}
