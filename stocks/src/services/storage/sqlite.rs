use std::{path::PathBuf, str::FromStr, time::Duration};

use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags, OptionalExtension, TransactionBehavior, params};
use rust_decimal::Decimal;
use tokio::task;

use crate::services::{
    dedup::IpHash,
    storage::{StockRecord, StoreError},
    traits::StockStore,
};

pub type DbPool = Pool<SqliteConnectionManager>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS stocks (
    symbol TEXT PRIMARY KEY NOT NULL,
    price  TEXT,
    likes  INTEGER NOT NULL DEFAULT 0 CHECK (likes >= 0)
);
CREATE TABLE IF NOT EXISTS stock_likers (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol  TEXT NOT NULL REFERENCES stocks(symbol),
    ip_hash TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_stock_likers_symbol ON stock_likers (symbol, id);
";

/// SQLite-backed store.
///
/// Prices are kept as decimal text so they round-trip exactly. Likes live in
/// `stocks.likes` and `stock_likers`, both written in one `IMMEDIATE`
/// transaction.
pub struct SqliteStore {
    path: PathBuf,
    pool: DbPool,
}

impl SqliteStore {
    /// Opens (or creates) the database file and applies the schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Pool`] if no connection can be opened and
    /// initialized, [`StoreError::Sqlite`] if the schema cannot be applied,
    /// and [`StoreError::Task`] if the blocking task panics.
    pub async fn open(path: PathBuf, pool_size: u32) -> Result<Self, StoreError> {
        task::spawn_blocking(move || Self::open_blocking(path, pool_size)).await?
    }

    fn open_blocking(path: PathBuf, pool_size: u32) -> Result<Self, StoreError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX
            | OpenFlags::SQLITE_OPEN_URI;
        let manager = SqliteConnectionManager::file(&path)
            .with_flags(flags)
            .with_init(|conn| {
                conn.busy_timeout(BUSY_TIMEOUT)?;
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })?;
                conn.pragma_update(None, "foreign_keys", true)
            });

        let pool = Pool::builder().max_size(pool_size).build(manager)?;
        pool.get()?.execute_batch(SCHEMA)?;

        tracing::debug!(path = %path.display(), pool_size, "sqlite schema ready");

        Ok(Self { path, pool })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await?
    }
}

#[async_trait]
impl StockStore for SqliteStore {
    async fn upsert_price(
        &self,
        symbol: &str,
        price: Option<Decimal>,
    ) -> Result<StockRecord, StoreError> {
        let symbol = symbol.to_owned();
        let price = price.map(|p| p.to_string());

        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "INSERT INTO stocks (symbol, price, likes) VALUES (?1, ?2, 0)
                 ON CONFLICT (symbol) DO UPDATE SET price = COALESCE(excluded.price, stocks.price)",
                params![symbol, price],
            )?;
            let record = load_record(&tx, &symbol)?;
            tx.commit()?;
            Ok(record)
        })
        .await
    }

    async fn liker_hashes(&self, symbol: &str) -> Result<Vec<String>, StoreError> {
        let symbol = symbol.to_owned();
        self.with_conn(move |conn| load_hashes(conn, &symbol)).await
    }

    async fn record_like(&self, symbol: &str, hash: IpHash) -> Result<StockRecord, StoreError> {
        let symbol = symbol.to_owned();

        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let updated = tx.execute(
                "UPDATE stocks SET likes = likes + 1 WHERE symbol = ?1",
                params![symbol],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound(symbol));
            }
            tx.execute(
                "INSERT INTO stock_likers (symbol, ip_hash) VALUES (?1, ?2)",
                params![symbol, hash.as_str()],
            )?;
            let record = load_record(&tx, &symbol)?;
            tx.commit()?;
            Ok(record)
        })
        .await
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
            Ok(())
        })
        .await?;

        tracing::info!(path = %self.path.display(), "sqlite store closed");
        Ok(())
    }
}

fn load_record(conn: &Connection, symbol: &str) -> Result<StockRecord, StoreError> {
    let row = conn
        .query_row(
            "SELECT price, likes FROM stocks WHERE symbol = ?1",
            params![symbol],
            |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?)),
        )
        .optional()?;
    let Some((price, likes)) = row else {
        return Err(StoreError::NotFound(symbol.to_owned()));
    };

    let corrupt = |reason: String| StoreError::Corrupt {
        symbol: symbol.to_owned(),
        reason,
    };

    let price = price
        .map(|p| Decimal::from_str(&p).map_err(|e| corrupt(format!("price {p:?}: {e}"))))
        .transpose()?;
    let likes = u64::try_from(likes).map_err(|_| corrupt(format!("negative likes {likes}")))?;
    let liker_hashes = load_hashes(conn, symbol)?;

    if usize::try_from(likes).ok() != Some(liker_hashes.len()) {
        return Err(corrupt(format!(
            "likes {likes} but {} liker hashes",
            liker_hashes.len()
        )));
    }

    Ok(StockRecord {
        symbol: symbol.to_owned(),
        price,
        likes,
        liker_hashes,
    })
}

fn load_hashes(conn: &Connection, symbol: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt =
        conn.prepare_cached("SELECT ip_hash FROM stock_likers WHERE symbol = ?1 ORDER BY id")?;
    let hashes = stmt
        .query_map(params![symbol], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(hashes)
}
