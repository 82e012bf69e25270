//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Load the trust bundle and build the upstream client
//! - Start the metrics endpoint when enabled
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{validate_config, ConfigError, ProxyConfig};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::net::tls::load_listener_tls;
use crate::observability::metrics;
use crate::upstream::{UpstreamClient, UpstreamError, UpstreamTls};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("upstream client setup failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("listener TLS setup failed: {0}")]
    ListenerTls(#[source] std::io::Error),

    #[error("invalid address '{0}'")]
    Address(String),

    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("metrics setup failed: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Load the trust bundle and build the one upstream client.
pub fn build_upstream_client(config: &ProxyConfig) -> Result<UpstreamClient, StartupError> {
    let tls = UpstreamTls::from_config(&config.trust_store, &config.upstream)
        .map_err(UpstreamError::from)?;
    Ok(UpstreamClient::new(&config.upstream, &tls)?)
}

/// Validate the configuration and assemble the server.
pub fn build_server(config: ProxyConfig) -> Result<HttpServer, StartupError> {
    validate_config(&config).map_err(ConfigError::Validation)?;
    let upstream = build_upstream_client(&config)?;
    Ok(HttpServer::new(config, upstream))
}

fn parse_addr(raw: &str) -> Result<SocketAddr, StartupError> {
    raw.parse().map_err(|_| StartupError::Address(raw.to_string()))
}

/// Start everything and serve until `shutdown` triggers.
pub async fn run(config: ProxyConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    let server = build_server(config)?;
    let config = server.config().clone();

    if config.observability.metrics_enabled {
        metrics::init_metrics(parse_addr(&config.observability.metrics_address)?)?;
    }

    let addr = parse_addr(&config.listener.bind_address)?;
    let shutdown_rx = shutdown.subscribe();

    match &config.listener.tls {
        Some(tls) => {
            let tls = load_listener_tls(tls).await.map_err(StartupError::ListenerTls)?;
            server
                .run_tls(addr, tls, shutdown_rx)
                .await
                .map_err(StartupError::Serve)
        }
        None => {
            let listener = TcpListener::bind(addr)
                .await
                .map_err(|source| StartupError::Bind { addr, source })?;
            server.run(listener, shutdown_rx).await.map_err(StartupError::Serve)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_server_rejects_invalid_config() {
        let err = build_server(ProxyConfig::default()).err().unwrap();
        assert!(matches!(err, StartupError::Config(ConfigError::Validation(_))));
    }

    #[test]
    fn build_server_fails_without_trust_store() {
        let mut config = ProxyConfig::default();
        config.upstream.url = "https://10.0.0.5:8443".to_string();
        config.trust_store.path = "/no/such/wildfly.p12".to_string();

        let err = build_server(config).err().unwrap();
        assert!(matches!(err, StartupError::Upstream(UpstreamError::TrustStore(_))));
    }
}
