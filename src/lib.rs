//! Flat proxy library: forwards the flat-search endpoints to one upstream
//! over a pinned-trust TLS connection and relays its answers unchanged.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use upstream::UpstreamClient;
