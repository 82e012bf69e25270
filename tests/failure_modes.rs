//! Failure injection: transport errors must become local error responses,
//! never hangs, and the TLS trust policy must hold.

use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

mod common;

use common::TestPki;

const BALCONY_PATH: &str = "/api/v1/flats/find-with-balcony/CHEAPEST/WITH";

async fn status_for(proxy: axum::Router, uri: &str) -> StatusCode {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    proxy.oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    let pki = TestPki::generate();
    let trust_store = pki.trust_store_file();
    let server = common::build_proxy(common::proxy_config(common::closed_port(), &trust_store));

    let status = tokio::time::timeout(
        Duration::from_secs(10),
        status_for(server.router(), BALCONY_PATH),
    )
    .await
    .expect("proxy must answer instead of hanging");

    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn slow_upstream_is_gateway_timeout() {
    let pki = TestPki::generate();
    let upstream = common::start_tls_upstream(&pki).await;
    let trust_store = pki.trust_store_file();
    let mut config = common::proxy_config(upstream, &trust_store);
    config.upstream.read_timeout_secs = 1;
    let server = common::build_proxy(config);

    let started = Instant::now();
    let uri = format!("/api/v1/flats/find-with-balcony/{}/WITH", common::SLOW_TOKEN);
    let status = status_for(server.router(), &uri).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn hostname_mismatch_accepted_when_verification_disabled() {
    let pki = TestPki::generate();
    let upstream = common::start_tls_upstream(&pki).await;
    let trust_store = pki.trust_store_file();
    let config = common::proxy_config(upstream, &trust_store);
    assert!(!config.upstream.verify_hostname);
    let server = common::build_proxy(config);

    // The certificate names flats.internal; the proxy dials 127.0.0.1.
    assert_eq!(status_for(server.router(), BALCONY_PATH).await, StatusCode::OK);
}

#[tokio::test]
async fn hostname_mismatch_rejected_when_verification_enabled() {
    let pki = TestPki::generate();
    let upstream = common::start_tls_upstream(&pki).await;
    let trust_store = pki.trust_store_file();
    let mut config = common::proxy_config(upstream, &trust_store);
    config.upstream.verify_hostname = true;
    let server = common::build_proxy(config);

    assert_eq!(
        status_for(server.router(), BALCONY_PATH).await,
        StatusCode::BAD_GATEWAY
    );
}

#[tokio::test]
async fn certificate_outside_trust_bundle_is_rejected() {
    let upstream_pki = TestPki::generate();
    let upstream = common::start_tls_upstream(&upstream_pki).await;

    // Trust a different CA than the one that signed the upstream certificate.
    let other_pki = TestPki::generate();
    let trust_store = other_pki.trust_store_file();
    let server = common::build_proxy(common::proxy_config(upstream, &trust_store));

    assert_eq!(
        status_for(server.router(), BALCONY_PATH).await,
        StatusCode::BAD_GATEWAY
    );
}

#[tokio::test]
async fn invalid_trust_store_prevents_startup() {
    common::init_crypto();
    let mut trust_store = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut trust_store, b"not a keystore").unwrap();
    let config = common::proxy_config(common::closed_port(), &trust_store);

    let Err(err) = flat_proxy::lifecycle::startup::build_server(config) else {
        panic!("proxy started with an unreadable trust store");
    };
    assert!(err.to_string().contains("PKCS#12"), "unexpected error: {err}");
}

#[tokio::test]
async fn pkcs12_trust_store_anchors_the_upstream() {
    let pki = TestPki::generate();
    let upstream = common::start_tls_upstream(&pki).await;
    let trust_store = pki.trust_store_p12(common::TRUST_STORE_PASSWORD);
    let server = common::build_proxy(common::proxy_config(upstream, &trust_store));

    assert_eq!(status_for(server.router(), BALCONY_PATH).await, StatusCode::OK);
}

#[tokio::test]
async fn wrong_trust_store_password_prevents_startup() {
    common::init_crypto();
    let pki = TestPki::generate();
    let trust_store = pki.trust_store_p12(common::TRUST_STORE_PASSWORD);
    let mut config = common::proxy_config(common::closed_port(), &trust_store);
    config.trust_store.password = "not-the-password".to_string();

    let Err(err) = flat_proxy::lifecycle::startup::build_server(config) else {
        panic!("proxy started with the wrong trust store password");
    };
    assert!(err.to_string().contains("wrong password"), "unexpected error: {err}");
}
