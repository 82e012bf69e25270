//! Shared utilities for integration testing: a TLS mock of the flats
//! service and helpers to stand the proxy up in front of it.

#![allow(dead_code)]

use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use flat_proxy::config::ProxyConfig;
use flat_proxy::lifecycle::startup;
use flat_proxy::HttpServer;

/// Name on the upstream certificate; never the address the proxy dials.
pub const UPSTREAM_DNS_NAME: &str = "flats.internal";

/// Path token that makes the mock answer 404.
pub const NOT_FOUND_TOKEN: &str = "NOT_FOUND";
/// Path token that makes the mock answer 500.
pub const FAILING_TOKEN: &str = "EXPLODE";
/// Path token that makes the mock stall before answering.
pub const SLOW_TOKEN: &str = "SLOW";
/// Path token that makes the mock answer with a gzip-encoded body.
pub const GZIP_TOKEN: &str = "GZIP";

/// Password of the PKCS#12 stores minted for tests.
pub const TRUST_STORE_PASSWORD: &str = "changeit";

pub const NOT_FOUND_BODY: &str = r#"{"error":"not found"}"#;

/// Gzip member header followed by opaque bytes; the proxy must not touch it.
pub const GZIP_BODY: &[u8] = &[0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0xab, 0xae, 0x05, 0x00];

/// What the mock upstream saw, sent back as JSON.
#[derive(Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl Echo {
    /// Every value received under `name`, in arrival order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// A CA and a leaf certificate it signed for the mock upstream.
pub struct TestPki {
    pub ca_pem: String,
    pub ca_der: Vec<u8>,
    pub leaf_cert_pem: String,
    pub leaf_key_pem: String,
}

impl TestPki {
    pub fn generate() -> Self {
        let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params
            .distinguished_name
            .push(DnType::CommonName, "flat-proxy test CA");
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let ca_key = KeyPair::generate().unwrap();
        let ca_cert = ca_params.self_signed(&ca_key).unwrap();

        let leaf_params = CertificateParams::new(vec![UPSTREAM_DNS_NAME.to_string()]).unwrap();
        let leaf_key = KeyPair::generate().unwrap();
        let leaf_cert = leaf_params.signed_by(&leaf_key, &ca_cert, &ca_key).unwrap();

        Self {
            ca_pem: ca_cert.pem(),
            ca_der: ca_cert.der().to_vec(),
            leaf_cert_pem: leaf_cert.pem(),
            leaf_key_pem: leaf_key.serialize_pem(),
        }
    }

    /// Write the CA to a file usable as the proxy's trust store.
    pub fn trust_store_file(&self) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(self.ca_pem.as_bytes()).unwrap();
        file
    }

    /// Write the CA as a trusted entry of a PKCS#12 store.
    pub fn trust_store_p12(&self, password: &str) -> NamedTempFile {
        let mut keystore = p12_keystore::KeyStore::new();
        let ca = p12_keystore::Certificate::from_der(&self.ca_der).unwrap();
        keystore.add_entry("flats-ca", p12_keystore::KeyStoreEntry::Certificate(ca));

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&keystore.writer(password).write().unwrap()).unwrap();
        file
    }
}

/// Both rustls providers are compiled in; pick one for the process.
pub fn init_crypto() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

async fn echo(request: Request) -> Response {
    let path = request.uri().path().to_string();

    if path.contains(&format!("/{NOT_FOUND_TOKEN}/")) {
        return (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "application/json")],
            NOT_FOUND_BODY,
        )
            .into_response();
    }
    if path.contains(&format!("/{FAILING_TOKEN}/")) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable").into_response();
    }
    if path.contains(&format!("/{GZIP_TOKEN}/")) {
        return (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/json"),
                (header::CONTENT_ENCODING, "gzip"),
            ],
            GZIP_BODY,
        )
            .into_response();
    }
    if path.contains(&format!("/{SLOW_TOKEN}/")) {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    let echo = Echo {
        method: request.method().to_string(),
        path,
        query: request.uri().query().map(str::to_string),
        headers: request
            .headers()
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect(),
    };
    let body = serde_json::to_vec(&echo).unwrap();
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

/// Start the TLS mock upstream on an ephemeral port.
pub async fn start_tls_upstream(pki: &TestPki) -> SocketAddr {
    init_crypto();
    let tls = RustlsConfig::from_pem(
        pki.leaf_cert_pem.clone().into_bytes(),
        pki.leaf_key_pem.clone().into_bytes(),
    )
    .await
    .unwrap();

    let app = Router::new().fallback(echo);
    let handle = Handle::new();
    let server_handle = handle.clone();
    tokio::spawn(async move {
        let _ = axum_server::bind_rustls("127.0.0.1:0".parse().unwrap(), tls)
            .handle(server_handle)
            .serve(app.into_make_service())
            .await;
    });

    handle.listening().await.unwrap()
}

/// An address nothing listens on.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Proxy configuration pointing at `upstream` and trusting `trust_store`.
pub fn proxy_config(upstream: SocketAddr, trust_store: &NamedTempFile) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.url = format!("https://{upstream}");
    config.trust_store.path = trust_store.path().display().to_string();
    config.trust_store.password = TRUST_STORE_PASSWORD.to_string();
    config
}

pub fn build_proxy(config: ProxyConfig) -> HttpServer {
    init_crypto();
    startup::build_server(config).unwrap()
}

/// Read a response body to bytes.
pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}
