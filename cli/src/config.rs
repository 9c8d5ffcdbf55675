use std::{net::SocketAddr, path::Path};

use anyhow::Context;
use serde::Deserialize;
use tools::toml;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(flatten)]
    pub stocks: stocks::Config,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    pub server_addr: String,
    #[serde(default)]
    pub metrics_addr: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:3000".to_owned(),
            metrics_addr: None,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        toml::parse_file::<Self>(path)?.validate()
    }

    pub fn validate(self) -> anyhow::Result<Self> {
        self.general
            .server_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid server_addr {:?}", self.general.server_addr))?;

        if let Some(metrics_addr) = &self.general.metrics_addr {
            metrics_addr
                .parse::<SocketAddr>()
                .with_context(|| format!("invalid metrics_addr {metrics_addr:?}"))?;
        }

        self.stocks.validate()?;

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use stocks::config::StorageConfig;

    use super::*;

    fn write_config(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("stock-checker-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_full_config() {
        let path = write_config(
            r#"
            [general]
            server_addr = "0.0.0.0:8080"
            metrics_addr = "127.0.0.1:9007"

            [quote]
            api_url = "http://localhost:4000"

            [likes]
            hash_cost = 10
            trust_forwarded_for = true

            [storage]
            backend = "sqlite"
            path = "data/stocks.db"
            pool_size = 8
            "#,
        );

        let config = Config::load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.general.server_addr, "0.0.0.0:8080");
        assert_eq!(config.general.metrics_addr.as_deref(), Some("127.0.0.1:9007"));
        assert_eq!(config.stocks.quote.api_url, "http://localhost:4000");
        assert_eq!(config.stocks.likes.hash_cost, 10);
        assert_eq!(
            config.stocks.storage,
            StorageConfig::Sqlite {
                path: PathBuf::from("data/stocks.db"),
                pool_size: 8,
            }
        );
    }

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let path = write_config("[storage]\nbackend = \"memory\"\n");

        let config = Config::load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.general.server_addr, "127.0.0.1:3000");
        assert!(config.general.metrics_addr.is_none());
        assert_eq!(config.stocks.likes.hash_cost, 11);
        assert_eq!(config.stocks.storage, StorageConfig::Memory);
    }

    #[test]
    fn test_invalid_server_addr() {
        let mut config = Config::default();
        config.general.server_addr = "localhost".to_owned();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server_addr"));
    }

    #[test]
    fn test_invalid_hash_cost() {
        let path = write_config("[likes]\nhash_cost = 2\n");

        let result = Config::load(&path);
        fs::remove_file(&path).unwrap();

        assert!(result.is_err());
    }
}
