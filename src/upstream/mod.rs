//! Upstream connection subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     trust store file
//!         → trust.rs (PKCS#12 / PEM decode → TrustBundle)
//!         → tls.rs (root store + hostname policy → rustls ClientConfig)
//!         → verifier.rs (chain check against the bundle, optional name check)
//!         → client.rs (reqwest client, base URL, timeouts)
//!
//! Per request:
//!     http::forward → UpstreamClient::get → UpstreamResponse | reqwest::Error
//! ```
//!
//! # Design Decisions
//! - One client for the process lifetime; a trust change needs a restart
//! - Any failure while building the client is fatal at startup

pub mod client;
pub mod error;
pub mod tls;
pub mod trust;
pub mod verifier;

pub use client::{UpstreamClient, UpstreamResponse};
pub use error::UpstreamError;
pub use tls::UpstreamTls;
pub use trust::{TrustBundle, TrustStoreError};
pub use verifier::HostnameVerification;
