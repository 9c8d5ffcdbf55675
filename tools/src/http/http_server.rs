use std::net::SocketAddr;

use anyhow::{Context, anyhow};
use axum::{Router, routing::get};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tokio_util::sync::CancellationToken;

const ADDR: &str = "127.0.0.1:9000";

/// Listener settings for [`HttpServer`].
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    /// Address of the public API listener.
    pub addr: String,
    /// Address of the Prometheus scrape endpoint. Disabled when `None`.
    pub metrics_addr: Option<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            addr: ADDR.to_owned(),
            metrics_addr: None,
        }
    }
}

/// Axum server with liveness/readiness probes and graceful shutdown.
///
/// The application router is merged on top of the probe routes. Peer socket
/// addresses are exposed to handlers through `ConnectInfo<SocketAddr>`.
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    #[must_use]
    pub fn from_config(config: HttpServerConfig) -> Self {
        Self {
            config,
            router: default_router(),
        }
    }

    #[must_use]
    pub fn with_router(mut self, router: Router) -> Self {
        self.router = self.router.merge(router);
        self
    }

    /// Serves until SIGINT, SIGTERM or SIGQUIT is received.
    pub async fn run(self) -> anyhow::Result<()> {
        let token = CancellationToken::new();

        let signal_token = token.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            tracing::info!("shutdown signal received");
            signal_token.cancel();
        });

        self.run_until(token).await
    }

    /// Serves until `token` is cancelled.
    pub async fn run_until(self, token: CancellationToken) -> anyhow::Result<()> {
        if let Some(metrics_addr) = &self.config.metrics_addr {
            install_metrics_exporter(metrics_addr)?;
        }

        bootstrap_server(&self.config.addr, self.router, token).await
    }
}

async fn bootstrap_server(
    addr: &str,
    router: Router,
    token: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow!("failed to bind to address {addr}: {e}"))?;

    let local_addr = listener.local_addr()?;
    tracing::info!(addr = %local_addr, "listening server");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { token.cancelled().await })
    .await
    .map_err(|e| anyhow!("failed to start server on address {addr}: {e}"))?;

    tracing::info!(addr = %local_addr, "server stopped");

    Ok(())
}

fn install_metrics_exporter(addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid metrics address {addr}"))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("failed to install prometheus exporter")?;

    tracing::info!(%addr, "metrics exporter listening");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = wait_unix_signal(signal::unix::SignalKind::terminate());
    #[cfg(unix)]
    let quit = wait_unix_signal(signal::unix::SignalKind::quit());

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    #[cfg(not(unix))]
    let quit = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
        () = quit => {},
    }
}

#[cfg(unix)]
async fn wait_unix_signal(kind: signal::unix::SignalKind) {
    match signal::unix::signal(kind) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to install signal handler");
            std::future::pending::<()>().await;
        }
    }
}

fn default_router() -> Router {
    Router::new()
        .route("/readiness", get(|| async {}))
        .route("/liveness", get(|| async {}))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_default_router_probes() {
        for path in ["/readiness", "/liveness"] {
            let response = default_router()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_with_router_keeps_probes() {
        let server = HttpServer::from_config(HttpServerConfig::default())
            .with_router(Router::new().route("/ping", get(|| async { "pong" })));

        let ping = server
            .router
            .clone()
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let probe = server
            .router
            .oneshot(Request::get("/liveness").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(ping.status(), StatusCode::OK);
        assert_eq!(probe.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_run_until_stops_on_cancel() {
        let config = HttpServerConfig {
            addr: "127.0.0.1:0".to_owned(),
            metrics_addr: None,
        };
        let token = CancellationToken::new();
        let handle = tokio::spawn(HttpServer::from_config(config).run_until(token.clone()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_run_until_invalid_addr() {
        let config = HttpServerConfig {
            addr: "not-an-address".to_owned(),
            metrics_addr: None,
        };

        let result = HttpServer::from_config(config)
            .run_until(CancellationToken::new())
            .await;

        assert!(result.unwrap_err().to_string().contains("failed to bind"));
    }

    #[test]
    fn test_http_server_config_default() {
        let config = HttpServerConfig::default();

        assert_eq!(config.addr, "127.0.0.1:9000");
        assert!(config.metrics_addr.is_none());
    }
}
