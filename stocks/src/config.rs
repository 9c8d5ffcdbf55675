use std::{path::PathBuf, time::Duration};

use anyhow::{Context, bail};
use serde::Deserialize;
use url::Url;

use crate::services::dedup::{MAX_HASH_COST, MIN_HASH_COST};

pub const DEFAULT_QUOTE_API_URL: &str = "https://stock-price-checker-proxy.freecodecamp.rocks";
pub const DEFAULT_HASH_COST: u32 = 11;

/// Settings of the stock price and likes service.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub quote: QuoteConfig,
    #[serde(default)]
    pub likes: LikesConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Upstream quote service.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QuoteConfig {
    pub api_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

/// Like deduplication.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LikesConfig {
    /// bcrypt work factor applied to every liker IP.
    pub hash_cost: u32,
    /// Take the caller IP from `X-Forwarded-For` instead of the TCP peer.
    pub trust_forwarded_for: bool,
}

/// Persistence backend for stock records.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    Memory,
    Sqlite {
        path: PathBuf,
        #[serde(default = "default_pool_size")]
        pool_size: u32,
    },
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_QUOTE_API_URL.to_owned(),
            timeout_secs: 10,
            connect_timeout_secs: 5,
        }
    }
}

impl Default for LikesConfig {
    fn default() -> Self {
        Self {
            hash_cost: DEFAULT_HASH_COST,
            trust_forwarded_for: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("stocks.db"),
            pool_size: default_pool_size(),
        }
    }
}

const fn default_pool_size() -> u32 {
    4
}

impl Config {
    /// Checks every section, returning the first violation.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.quote.validate().context("invalid [quote] section")?;
        self.likes.validate().context("invalid [likes] section")?;
        self.storage.validate().context("invalid [storage] section")?;
        Ok(())
    }
}

impl QuoteConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = Url::parse(&self.api_url)
            .with_context(|| format!("api_url is not a valid URL: {:?}", self.api_url))?;
        if url.cannot_be_a_base() {
            bail!("api_url cannot be used as a base URL: {}", self.api_url);
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be greater than zero");
        }
        Ok(())
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl LikesConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&self.hash_cost) {
            bail!(
                "hash_cost must be within {MIN_HASH_COST}..={MAX_HASH_COST}, got {}",
                self.hash_cost
            );
        }
        Ok(())
    }
}

impl StorageConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        match self {
            Self::Memory => Ok(()),
            Self::Sqlite { path, pool_size } => {
                if path.as_os_str().is_empty() {
                    bail!("sqlite path must not be empty");
                }
                if *pool_size == 0 {
                    bail!("pool_size must be greater than zero");
                }
                Ok(())
            }
        }
    }
}
