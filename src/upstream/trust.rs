//! Trust bundle loading.
//!
//! # Responsibilities
//! - Read the configured certificate store from disk, once
//! - Decode PKCS#12 stores (passphrase protected) and PEM bundles
//! - Turn the certificates into the root store the upstream TLS context trusts
//!
//! # Design Decisions
//! - The format is detected from content: a PEM armour header means PEM,
//!   anything else is treated as PKCS#12
//! - An empty store is an error; a TLS context with no anchors would fail
//!   every handshake at request time instead of at startup

use std::fs;
use std::path::{Path, PathBuf};

use p12_keystore::{KeyStore, KeyStoreEntry};
use rustls::pki_types::CertificateDer;
use rustls::RootCertStore;
use thiserror::Error;

const PEM_ARMOUR: &[u8] = b"-----BEGIN";

/// Errors raised while loading a trust bundle.
#[derive(Debug, Error)]
pub enum TrustStoreError {
    #[error("cannot read trust store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Covers both corrupt files and a wrong passphrase; PKCS#12 cannot tell
    /// them apart.
    #[error("cannot open PKCS#12 trust store (corrupt file or wrong password)")]
    Pkcs12(#[source] p12_keystore::error::Error),

    #[error("cannot parse PEM trust bundle: {0}")]
    Pem(#[source] std::io::Error),

    #[error("trust store contains no certificates")]
    Empty,

    #[error("trust store certificate rejected: {0}")]
    InvalidCertificate(#[source] rustls::Error),
}

/// Encoding of a trust bundle on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustStoreFormat {
    Pkcs12,
    Pem,
}

impl TrustStoreFormat {
    /// Guess the encoding from the first bytes of the file.
    pub fn detect(data: &[u8]) -> Self {
        let start = data
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(data.len());
        if data[start..].starts_with(PEM_ARMOUR) {
            TrustStoreFormat::Pem
        } else {
            TrustStoreFormat::Pkcs12
        }
    }
}

/// The set of certificates the upstream connection is anchored to.
///
/// Immutable once loaded.
#[derive(Debug, Clone)]
pub struct TrustBundle {
    certificates: Vec<CertificateDer<'static>>,
}

impl TrustBundle {
    /// Load a bundle from disk, decoding it according to its detected format.
    pub fn load(path: &Path, password: &str) -> Result<Self, TrustStoreError> {
        let data = fs::read(path).map_err(|source| TrustStoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let format = TrustStoreFormat::detect(&data);
        let bundle = match format {
            TrustStoreFormat::Pem => Self::from_pem(&data)?,
            TrustStoreFormat::Pkcs12 => Self::from_pkcs12(&data, password)?,
        };

        tracing::info!(
            path = %path.display(),
            format = ?format,
            certificates = bundle.len(),
            "Trust store loaded"
        );
        Ok(bundle)
    }

    /// Decode a PKCS#12 store.
    ///
    /// Trusted-certificate entries are taken as they are; for key entries the
    /// leaf of the chain is trusted.
    pub fn from_pkcs12(data: &[u8], password: &str) -> Result<Self, TrustStoreError> {
        let keystore = KeyStore::from_pkcs12(data, password)
            .map_err(TrustStoreError::Pkcs12)?;

        let mut certificates = Vec::new();
        for (alias, entry) in keystore.entries() {
            match entry {
                KeyStoreEntry::Certificate(cert) => {
                    tracing::debug!(alias = %alias, "Trusting certificate entry");
                    certificates.push(CertificateDer::from(cert.as_der().to_vec()));
                }
                KeyStoreEntry::PrivateKeyChain(chain) => {
                    if let Some(leaf) = chain.chain().first() {
                        tracing::debug!(alias = %alias, "Trusting key entry certificate");
                        certificates.push(CertificateDer::from(leaf.as_der().to_vec()));
                    }
                }
            }
        }

        Self::from_certificates(certificates)
    }

    /// Decode a PEM bundle of one or more `CERTIFICATE` blocks.
    pub fn from_pem(data: &[u8]) -> Result<Self, TrustStoreError> {
        let mut reader = data;
        let certificates = rustls_pemfile::certs(&mut reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(TrustStoreError::Pem)?;

        Self::from_certificates(certificates)
    }

    /// Build a bundle from already-decoded DER certificates.
    pub fn from_certificates(
        certificates: Vec<CertificateDer<'static>>,
    ) -> Result<Self, TrustStoreError> {
        if certificates.is_empty() {
            return Err(TrustStoreError::Empty);
        }
        Ok(Self { certificates })
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Root store containing exactly this bundle's certificates.
    pub fn root_store(&self) -> Result<RootCertStore, TrustStoreError> {
        let mut roots = RootCertStore::empty();
        for cert in &self.certificates {
            roots
                .add(cert.clone())
                .map_err(TrustStoreError::InvalidCertificate)?;
        }
        Ok(roots)
    }
}
