//! Errors raised while building the upstream client.

use thiserror::Error;

use crate::upstream::trust::TrustStoreError;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error(transparent)]
    TrustStore(#[from] TrustStoreError),

    #[error("upstream base URL '{url}' is invalid: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("cannot build certificate verifier: {0}")]
    Verifier(#[from] rustls::client::VerifierBuilderError),

    #[error("cannot build TLS context: {0}")]
    Tls(#[from] rustls::Error),

    #[error("cannot build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
