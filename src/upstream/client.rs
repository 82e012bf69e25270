//! The shared outbound HTTP client.
//!
//! # Responsibilities
//! - Own the one `reqwest::Client` every forwarded call goes through
//! - Resolve outbound URLs against the upstream base URL
//! - Issue GETs and collect status, content type and body
//!
//! # Design Decisions
//! - Built once at startup, cloned into handler state; clones share the
//!   connection pool and TLS context, nothing is mutated afterwards
//! - Non-2xx statuses are ordinary responses here; only transport failures
//!   surface as errors

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use url::Url;

use crate::config::UpstreamConfig;
use crate::upstream::error::UpstreamError;
use crate::upstream::tls::UpstreamTls;

/// Upstream response headers that describe the body and travel with it.
///
/// The body is relayed as raw bytes, so its encoding has to be relayed too.
pub const BODY_HEADERS: [HeaderName; 2] = [header::CONTENT_TYPE, header::CONTENT_ENCODING];

/// What came back from the upstream, body fully read.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    /// Only the `BODY_HEADERS` the upstream sent.
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Long-lived client bound to the upstream base URL.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: Url,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl UpstreamClient {
    /// Build the client from validated configuration and a prepared TLS context.
    pub fn new(config: &UpstreamConfig, tls: &UpstreamTls) -> Result<Self, UpstreamError> {
        let base_url = parse_base_url(&config.url)?;
        let connect_timeout = config.connect_timeout();
        let read_timeout = config.read_timeout();

        let http = reqwest::Client::builder()
            .use_preconfigured_tls(tls.client_config()?)
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .http1_only()
            .no_proxy()
            .build()?;

        tracing::info!(
            base_url = %base_url,
            connect_timeout_secs = connect_timeout.as_secs(),
            read_timeout_secs = read_timeout.as_secs(),
            trusted_certificates = tls.trust().len(),
            hostname_verification = ?tls.hostname_verification(),
            "Upstream client initialized"
        );

        Ok(Self {
            http,
            base_url,
            connect_timeout,
            read_timeout,
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Resolve path segments and query pairs against the base URL.
    ///
    /// Segments are appended after any path the base URL carries and are
    /// percent-encoded as needed. Query pairs keep their order; no `?` is
    /// added when there are none.
    pub fn target_url<'a, I>(&self, segments: I, query: &[(String, String)]) -> Url
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);

        // Checked at construction: the base URL can always take segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    /// Send a GET with the given headers and read the whole response.
    ///
    /// The body is not decoded; compressed bytes stay compressed.
    pub async fn get(&self, url: Url, headers: HeaderMap) -> Result<UpstreamResponse, reqwest::Error> {
        let response = self.http.get(url).headers(headers).send().await?;

        let status = response.status();
        let mut body_headers = HeaderMap::new();
        for name in BODY_HEADERS {
            for value in response.headers().get_all(&name) {
                body_headers.append(name.clone(), value.clone());
            }
        }
        let body = response.bytes().await?;

        Ok(UpstreamResponse {
            status,
            headers: body_headers,
            body,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, UpstreamError> {
    let invalid = |reason: &str| UpstreamError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("cannot be used as a base URL"));
    }
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    Ok(url)
}
