use std::path::PathBuf;

use anyhow::{Context, Result};
use stocks::AppState;
use tools::http::{HttpServer, HttpServerConfig};

use crate::{config::Config, ui};

pub async fn start(config_path: PathBuf) -> Result<()> {
    let cfg = match Config::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::print_config_error(&config_path, &e);
            return Ok(());
        }
    };

    let state = AppState::from_config(&cfg.stocks).await?;

    let server_config = HttpServerConfig {
        addr: cfg.general.server_addr.clone(),
        metrics_addr: cfg.general.metrics_addr.clone(),
    };

    tracing::info!(addr = %server_config.addr, "starting stock price checker");

    let served = HttpServer::from_config(server_config)
        .with_router(stocks::router(state.clone()))
        .run()
        .await
        .context("HTTP Server failed");

    if let Err(e) = state.service.store().close().await {
        tracing::warn!(error = %e, "failed to close stock store");
    }

    served
}
