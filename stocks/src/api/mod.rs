pub mod error;
pub mod query;

use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{ConnectInfo, RawQuery, State},
    http::HeaderMap,
    routing::get,
};
use serde::Serialize;

pub use error::ApiError;
pub use query::StockPricesQuery;

use crate::{
    config::Config,
    libs::quote_client::QuoteClient,
    services::{IpHasher, StockData, StockService, storage},
};

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Shared state of the API handlers.
pub struct AppState {
    pub service: StockService,
    pub trust_forwarded_for: bool,
}

impl AppState {
    /// Wires the quote client, the configured store and the IP hasher.
    pub async fn from_config(cfg: &Config) -> anyhow::Result<Arc<Self>> {
        let prices = QuoteClient::from_config(&cfg.quote).context("failed to build quote client")?;
        let store = storage::connect(&cfg.storage)
            .await
            .context("failed to connect stock store")?;

        let hasher = IpHasher::new(cfg.likes.hash_cost);

        tracing::info!(
            hash_cost = hasher.cost(),
            trust_forwarded_for = cfg.likes.trust_forwarded_for,
            "stock service ready"
        );

        Ok(Arc::new(Self {
            service: StockService::new(Arc::new(prices), store, hasher),
            trust_forwarded_for: cfg.likes.trust_forwarded_for,
        }))
    }
}

#[derive(Debug, Serialize)]
pub struct StockPricesResponse {
    #[serde(rename = "stockData")]
    pub stock_data: StockData,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/stock-prices", get(stock_prices))
        .with_state(state)
}

async fn stock_prices(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    RawQuery(raw): RawQuery,
) -> Result<Json<StockPricesResponse>, ApiError> {
    let query = StockPricesQuery::parse(raw.as_deref().unwrap_or_default())?;
    let ip = caller_ip(&headers, peer, state.trust_forwarded_for);

    let stock_data = state.service.lookup(&query.lookup, ip, query.like).await?;

    Ok(Json(StockPricesResponse { stock_data }))
}

/// Left-most valid `X-Forwarded-For` entry when trusted, else the TCP peer.
///
/// Entries that are not addresses (`unknown`, obfuscated identifiers) are
/// skipped.
fn caller_ip(headers: &HeaderMap, peer: SocketAddr, trust_forwarded_for: bool) -> IpAddr {
    if trust_forwarded_for
        && let Some(ip) = headers
            .get(FORWARDED_FOR)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| {
                value
                    .split(',')
                    .find_map(|entry| entry.trim().parse::<IpAddr>().ok())
            })
    {
        return ip;
    }

    peer.ip()
}
