//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay the upstream status and body to the client unchanged
//! - Map local failures to status codes
//!
//! # Design Decisions
//! - Upstream 4xx/5xx are relayed as they are, never collapsed into 502
//! - Transport timeouts (connect or read) result in 504 Gateway Timeout
//! - Every other transport failure results in 502 Bad Gateway

use std::error::Error as StdError;

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::upstream::UpstreamResponse;

/// Per-request failures that never reached an upstream status line.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid value '{value}' for query parameter '{name}'")]
    InvalidParameter { name: String, value: String },

    #[error("upstream request to {url} timed out")]
    Timeout {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ForwardError {
    /// Classify a client error for the given target URL.
    pub fn from_transport(url: &str, source: reqwest::Error) -> Self {
        let url = url.to_string();
        if source.is_timeout() {
            ForwardError::Timeout { url, source }
        } else {
            ForwardError::Transport { url, source }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            ForwardError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ForwardError::Transport { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::InvalidParameter { .. } => "invalid_parameter",
            ForwardError::Timeout { .. } => "timeout",
            ForwardError::Transport { .. } => "transport",
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ForwardError::InvalidParameter { .. } => self.to_string(),
            ForwardError::Timeout { .. } => "Upstream request timed out".to_string(),
            ForwardError::Transport { .. } => "Upstream request failed".to_string(),
        };
        (status, message).into_response()
    }
}

/// Render an error with its whole source chain, `a: b: c`.
pub fn error_chain(error: &dyn StdError) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

/// Turn the upstream answer into the client response: same status, same
/// bytes, and the upstream content type and encoding when it sent them.
pub fn relay(upstream: UpstreamResponse) -> Response {
    let mut response = Response::new(Body::from(upstream.body));
    *response.status_mut() = upstream.status;
    response.headers_mut().extend(upstream.headers);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Bytes};
    use axum::http::{header, HeaderMap, HeaderValue};

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    #[tokio::test]
    async fn relays_error_status_and_body_verbatim() {
        let response = relay(UpstreamResponse {
            status: StatusCode::NOT_FOUND,
            headers: json_headers(),
            body: Bytes::from_static(br#"{"error":"not found"}"#),
        });

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"error":"not found"}"#);
    }

    #[test]
    fn relay_without_content_type_adds_none() {
        let response = relay(UpstreamResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        });
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn relay_keeps_content_encoding_with_raw_bytes() {
        let compressed = Bytes::from_static(&[0x1f, 0x8b, 0x08, 0x00, 0x00]);
        let mut headers = json_headers();
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));

        let response = relay(UpstreamResponse {
            status: StatusCode::OK,
            headers,
            body: compressed.clone(),
        });

        assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, compressed);
    }

    #[test]
    fn invalid_parameter_maps_to_bad_request() {
        let err = ForwardError::InvalidParameter {
            name: "size".to_string(),
            value: "ten".to_string(),
        };
        assert_eq!(err.kind(), "invalid_parameter");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn error_chain_joins_sources() {
        #[derive(Debug, Error)]
        #[error("error sending request")]
        struct Outer(#[source] std::io::Error);

        let inner = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        assert_eq!(error_chain(&Outer(inner)), "error sending request: connection refused");
    }
}
