//! Flat proxy
//!
//! Forwards the flat-search endpoints to the flats service over a TLS
//! connection anchored to a pinned trust bundle.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────┐
//!                          │                  FLAT PROXY                  │
//!     Client Request       │  ┌─────────┐    ┌──────────┐    ┌─────────┐  │
//!     ─────────────────────┼─▶│  http   │───▶│ forward  │───▶│upstream │──┼──▶ Flats
//!                          │  │ server  │    │ request  │    │ client  │  │    service
//!                          │  └─────────┘    └──────────┘    └────┬────┘  │   (TLS)
//!     Client Response      │  ┌─────────┐                         │       │
//!     ◀────────────────────┼──│  relay  │◀────────────────────────┘       │
//!                          │  └─────────┘                                 │
//!                          │                                              │
//!                          │  config · trust bundle · observability ·     │
//!                          │  lifecycle                                   │
//!                          └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use flat_proxy::config::{read_config, ProxyConfig};
use flat_proxy::lifecycle::{startup, Shutdown};
use flat_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "flat-proxy")]
#[command(about = "Reverse proxy for the flats service", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "FLAT_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Upstream base URL, overrides `upstream.url`.
    #[arg(long, env = "FLAT_PROXY_UPSTREAM_URL")]
    upstream_url: Option<String>,

    /// Trust store path, overrides `trust_store.path`.
    #[arg(long, env = "FLAT_PROXY_TRUST_STORE")]
    trust_store: Option<String>,

    /// Trust store password, overrides `trust_store.password`.
    #[arg(long, env = "FLAT_PROXY_TRUST_STORE_PASSWORD", hide_env_values = true)]
    trust_store_password: Option<String>,

    /// Listener address, overrides `listener.bind_address`.
    #[arg(long, env = "FLAT_PROXY_BIND")]
    bind: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut ProxyConfig) {
        if let Some(url) = self.upstream_url {
            config.upstream.url = url;
        }
        if let Some(path) = self.trust_store {
            config.trust_store.path = path;
        }
        if let Some(password) = self.trust_store_password {
            config.trust_store.password = password;
        }
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut cli = Cli::parse();

    let mut config = match cli.config.take() {
        Some(path) => read_config(&path)?,
        None => ProxyConfig::default(),
    };
    cli.apply(&mut config);

    logging::init_logging(&config.observability)?;
    let _ = rustls::crypto::ring::default_provider().install_default();

    tracing::info!("flat-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        trust_store = %config.trust_store.path,
        listener_tls = config.listener.tls.is_some(),
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    if let Err(e) = startup::run(config, &shutdown).await {
        tracing::error!(error = %e, "Proxy failed");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
