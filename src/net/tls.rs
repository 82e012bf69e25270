//! TLS configuration and certificate loading for the inbound listener.

use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsConfig;

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, std::io::Error> {
    if !cert_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Certificate file not found: {:?}", cert_path),
        ));
    }
    if !key_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Private key file not found: {:?}", key_path),
        ));
    }

    RustlsConfig::from_pem_file(cert_path, key_path).await
}

/// Load the listener TLS settings named in the configuration.
pub async fn load_listener_tls(config: &TlsConfig) -> Result<RustlsConfig, std::io::Error> {
    let tls = load_tls_config(Path::new(&config.cert_path), Path::new(&config.key_path)).await?;
    tracing::info!(
        cert_path = %config.cert_path,
        "Listener TLS configured"
    );
    Ok(tls)
}
