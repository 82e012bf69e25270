//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the two forwarding handlers
//! - Wire up middleware (tracing)
//! - Bind server to a plain or TLS listener
//! - Stop accepting and drain on shutdown

use std::net::SocketAddr;

use axum::{routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::handlers;
use crate::upstream::UpstreamClient;

pub const FIND_WITH_BALCONY_ROUTE: &str =
    "/api/v1/flats/find-with-balcony/{price_type}/{balcony_type}";
pub const ORDERED_BY_TIME_TO_METRO_ROUTE: &str =
    "/api/v1/flats/get-ordered-by-time-to-metro/{transport_type}/{sort_type}";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared outbound client; cloning shares the pool and TLS context.
    pub upstream: UpstreamClient,
    /// Whether the proxy itself is served over TLS.
    pub secure: bool,
}

/// HTTP server for the flat proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server around an already-built upstream client.
    pub fn new(config: ProxyConfig, upstream: UpstreamClient) -> Self {
        let state = AppState {
            upstream,
            secure: config.listener.tls.is_some(),
        };

        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route(FIND_WITH_BALCONY_ROUTE, get(handlers::find_with_balcony))
            .route(ORDERED_BY_TIME_TO_METRO_ROUTE, get(handlers::ordered_by_time_to_metro))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for serving through another acceptor or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting plain connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server over TLS on the given address.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(
            address = %addr,
            "HTTPS server starting"
        );

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            drain.graceful_shutdown(None);
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}
