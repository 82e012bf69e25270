//! TLS context for the upstream connection.

use std::path::Path;
use std::sync::Arc;

use rustls::client::WebPkiServerVerifier;
use rustls::ClientConfig;

use crate::config::{TrustStoreConfig, UpstreamConfig};
use crate::upstream::error::UpstreamError;
use crate::upstream::trust::{TrustBundle, TrustStoreError};
use crate::upstream::verifier::{HostnameVerification, PinnedTrustVerifier};

/// Only HTTP/1.1 is offered so inbound headers can be copied as they are;
/// connection-specific headers are illegal on HTTP/2.
const ALPN_HTTP1: &[u8] = b"http/1.1";

/// TLS settings for the upstream: which issuers are trusted, and whether the
/// certificate has to match the host name.
#[derive(Debug, Clone)]
pub struct UpstreamTls {
    trust: TrustBundle,
    hostname: HostnameVerification,
}

impl UpstreamTls {
    pub fn new(trust: TrustBundle, hostname: HostnameVerification) -> Self {
        Self { trust, hostname }
    }

    /// Load the trust bundle named by the configuration.
    pub fn from_config(
        trust_store: &TrustStoreConfig,
        upstream: &UpstreamConfig,
    ) -> Result<Self, TrustStoreError> {
        if trust_store.uses_placeholder_password() {
            tracing::warn!(
                path = %trust_store.path,
                "Trust store password is the placeholder default; override it in production"
            );
        }

        let trust = TrustBundle::load(Path::new(&trust_store.path), &trust_store.password)?;
        Ok(Self::new(trust, HostnameVerification::from_flag(upstream.verify_hostname)))
    }

    pub fn trust(&self) -> &TrustBundle {
        &self.trust
    }

    pub fn hostname_verification(&self) -> HostnameVerification {
        self.hostname
    }

    /// Build the rustls client configuration.
    ///
    /// Trust anchors come from the bundle only; no platform or bundled web
    /// roots are added.
    pub fn client_config(&self) -> Result<ClientConfig, UpstreamError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let roots = Arc::new(self.trust.root_store()?);

        let webpki = WebPkiServerVerifier::builder_with_provider(roots, provider.clone()).build()?;
        let verifier = Arc::new(PinnedTrustVerifier::new(webpki, self.hostname));

        if self.hostname == HostnameVerification::Disabled {
            tracing::warn!("Upstream hostname verification is disabled");
        }

        let mut config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .dangerous()
            .with_custom_certificate_verifier(verifier)
            .with_no_client_auth();
        config.alpn_protocols = vec![ALPN_HTTP1.to_vec()];

        Ok(config)
    }
}
