//! Server certificate verification for the upstream connection.
//!
//! Chain validation always runs against the pinned trust bundle. The host
//! name check is a separate policy so that an upstream reached through an
//! internal address can still be anchored to a known certificate set.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, DigitallySignedStruct, Error, SignatureScheme};

/// Whether the upstream certificate must name the host being connected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostnameVerification {
    /// Standard check: the certificate must be valid for the server name.
    Strict,
    /// Any server name is accepted once the chain is trusted.
    Disabled,
}

impl HostnameVerification {
    pub fn from_flag(verify: bool) -> Self {
        if verify {
            HostnameVerification::Strict
        } else {
            HostnameVerification::Disabled
        }
    }
}

/// Verifier anchored to the trust bundle with a configurable host name policy.
#[derive(Debug)]
pub struct PinnedTrustVerifier {
    inner: Arc<WebPkiServerVerifier>,
    hostname: HostnameVerification,
}

impl PinnedTrustVerifier {
    pub fn new(inner: Arc<WebPkiServerVerifier>, hostname: HostnameVerification) -> Self {
        Self { inner, hostname }
    }
}

impl ServerCertVerifier for PinnedTrustVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, Error> {
        let result = self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        );

        // The name check is the last step of webpki verification, so a name
        // error means the chain itself was already accepted.
        match result {
            Err(Error::InvalidCertificate(
                CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. },
            )) if self.hostname == HostnameVerification::Disabled => {
                tracing::trace!(
                    server_name = ?server_name,
                    "Upstream certificate does not name host, accepted by policy"
                );
                Ok(ServerCertVerified::assertion())
            }
            other => other,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
