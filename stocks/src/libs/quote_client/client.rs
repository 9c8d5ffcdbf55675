use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use rust_decimal::Decimal;
use strum::IntoStaticStr;
use url::Url;

use crate::{
    config::QuoteConfig,
    libs::quote_client::models::{Quote, QuoteBody},
    services::traits::PriceSource,
};

/// Errors of the upstream quote service. Every variant means the price is
/// unavailable for this lookup.
///
/// `&'static str` conversion gives the snake_case variant name, used as the
/// failure metrics label.
#[derive(Debug, thiserror::Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum QuoteError {
    #[error("Invalid quote url: {0}")]
    InvalidUrl(String),
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Received error: code={code} msg={msg}")]
    Status { code: StatusCode, msg: String },
    #[error("Malformed quote body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Quote rejected: {0}")]
    Rejected(String),
    #[error("Quote for {0} has no latest price")]
    MissingPrice(String),
}

/// HTTP client for the quote proxy (`/v1/stock/{symbol}/quote`).
#[derive(Clone)]
pub struct QuoteClient {
    base_url: Url,
    inner_client: reqwest::Client,
}

impl QuoteClient {
    /// Builds the client and its connection pool from configuration.
    ///
    /// # Errors
    /// Returns an error if `api_url` is not a base URL or the inner client
    /// builder fails.
    pub fn from_config(cfg: &QuoteConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(&cfg.api_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("quote api_url cannot be a base: {}", cfg.api_url);
        }

        Ok(Self {
            base_url,
            inner_client: reqwest::Client::builder()
                .connect_timeout(cfg.connect_timeout())
                .timeout(cfg.timeout())
                .build()?,
        })
    }

    /// Fetches the latest traded price for `symbol`.
    pub async fn latest_price(&self, symbol: &str) -> Result<Decimal, QuoteError> {
        let url = self.build_url(symbol)?;
        let response = self.inner_client.get(url).send().await?;

        match response_handler(response).await? {
            QuoteBody::Quote(Quote {
                latest_price: Some(price),
            }) => Ok(price),
            QuoteBody::Quote(_) => Err(QuoteError::MissingPrice(symbol.to_owned())),
            QuoteBody::Message(msg) => Err(QuoteError::Rejected(msg)),
        }
    }

    /// Builds `{base}/v1/stock/{symbol}/quote`, encoding the symbol as one
    /// path segment.
    fn build_url(&self, symbol: &str) -> Result<Url, QuoteError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| QuoteError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["v1", "stock", symbol, "quote"]);
        Ok(url)
    }
}

#[async_trait]
impl PriceSource for QuoteClient {
    async fn fetch_price(&self, symbol: &str) -> Result<Decimal, QuoteError> {
        self.latest_price(symbol).await
    }
}

async fn response_handler(resp: Response) -> Result<QuoteBody, QuoteError> {
    match resp.status() {
        StatusCode::OK => {
            let body = resp.bytes().await?;
            Ok(serde_json::from_slice::<QuoteBody>(&body)?)
        }
        code => Err(QuoteError::Status {
            code,
            msg: resp.text().await?,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use mockito::Server;

    use super::*;

    fn create_test_client(server_url: &str) -> QuoteClient {
        let config = QuoteConfig {
            api_url: server_url.to_owned(),
            ..Default::default()
        };

        QuoteClient::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_latest_price_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/stock/GOOG/quote")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"symbol": "GOOG", "latestPrice": 100.5}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let price = client.latest_price("GOOG").await.unwrap();

        mock.assert_async().await;
        assert_eq!(price, Decimal::from_str("100.5").unwrap());
    }

    #[tokio::test]
    async fn test_latest_price_missing_field() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/stock/GOOG/quote")
            .with_status(200)
            .with_body(r#"{"symbol": "GOOG"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result = client.latest_price("GOOG").await;

        assert!(matches!(result, Err(QuoteError::MissingPrice(s)) if s == "GOOG"));
    }

    #[tokio::test]
    async fn test_latest_price_unknown_symbol() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/stock/NOPE/quote")
            .with_status(200)
            .with_body(r#""Unknown symbol""#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result = client.latest_price("NOPE").await;

        assert!(matches!(result, Err(QuoteError::Rejected(msg)) if msg == "Unknown symbol"));
    }

    #[tokio::test]
    async fn test_latest_price_malformed_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/stock/GOOG/quote")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result = client.latest_price("GOOG").await;

        assert!(matches!(result, Err(QuoteError::Decode(_))));
    }

    #[tokio::test]
    async fn test_latest_price_server_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/stock/GOOG/quote")
            .with_status(503)
            .with_body("Service Unavailable")
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client.latest_price("GOOG").await.unwrap_err();

        assert!(matches!(err, QuoteError::Status { code, .. } if code == StatusCode::SERVICE_UNAVAILABLE));
        assert!(err.to_string().contains("code=503"));
        assert!(err.to_string().contains("Service Unavailable"));
    }

    #[tokio::test]
    async fn test_latest_price_connection_refused() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = create_test_client(&format!("http://127.0.0.1:{port}"));
        let result = client.latest_price("GOOG").await;

        assert!(matches!(result, Err(QuoteError::Transport(_))));
    }

    #[test]
    fn test_build_url() {
        let client = create_test_client("https://quotes.example.com");
        let url = client.build_url("MSFT").unwrap();

        assert_eq!(url.as_str(), "https://quotes.example.com/v1/stock/MSFT/quote");
    }

    #[test]
    fn test_build_url_with_base_path() {
        let client = create_test_client("https://quotes.example.com/proxy/");
        let url = client.build_url("MSFT").unwrap();

        assert_eq!(
            url.as_str(),
            "https://quotes.example.com/proxy/v1/stock/MSFT/quote"
        );
    }

    #[test]
    fn test_build_url_encodes_symbol() {
        let client = create_test_client("https://quotes.example.com");
        let url = client.build_url("BRK/B").unwrap();

        assert_eq!(
            url.as_str(),
            "https://quotes.example.com/v1/stock/BRK%2FB/quote"
        );
    }

    #[test]
    fn test_error_kind_labels() {
        let rejected = QuoteError::Rejected("Unknown symbol".to_owned());
        let missing = QuoteError::MissingPrice("GOOG".to_owned());

        assert_eq!(<&'static str>::from(&rejected), "rejected");
        assert_eq!(<&'static str>::from(&missing), "missing_price");
    }

    #[test]
    fn test_from_config_rejects_non_base_url() {
        let config = QuoteConfig {
            api_url: "mailto:quotes@example.com".to_owned(),
            ..Default::default()
        };

        assert!(QuoteClient::from_config(&config).is_err());
    }
}
