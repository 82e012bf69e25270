//! Endpoint handlers for the two forwarded routes.

use std::time::Instant;

use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, Method, Uri, Version};
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

use crate::http::forward::{self, ForwardRequest, Pagination};
use crate::http::response::{error_chain, relay, ForwardError};
use crate::http::server::AppState;
use crate::observability::metrics;

/// Connection facts logged for every inbound request.
#[derive(Debug, Clone, Copy)]
struct Inbound<'a> {
    method: &'a Method,
    uri: &'a Uri,
    version: Version,
    secure: bool,
}

impl Inbound<'_> {
    fn scheme(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }

    fn log(&self) {
        tracing::info!(
            method = %self.method,
            uri = %self.uri.path(),
            query = self.uri.query().unwrap_or(""),
            "Incoming request"
        );
        tracing::info!(
            protocol = ?self.version,
            scheme = self.scheme(),
            secure = self.secure,
            "Request protocol"
        );
    }
}

/// `GET /api/v1/flats/find-with-balcony/{price_type}/{balcony_type}`
pub async fn find_with_balcony(
    State(state): State<AppState>,
    Path((price_type, balcony_type)): Path<(String, String)>,
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
) -> Result<Response, ForwardError> {
    let inbound = Inbound {
        method: &method,
        uri: &uri,
        version,
        secure: state.secure,
    };
    inbound.log();

    let request = ForwardRequest::find_with_balcony(&price_type, &balcony_type, &headers);
    forward(&state, forward::FIND_WITH_BALCONY, request).await
}

/// `GET /api/v1/flats/get-ordered-by-time-to-metro/{transport_type}/{sort_type}`
pub async fn ordered_by_time_to_metro(
    State(state): State<AppState>,
    Path((transport_type, sort_type)): Path<(String, String)>,
    RawQuery(raw_query): RawQuery,
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
) -> Result<Response, ForwardError> {
    let inbound = Inbound {
        method: &method,
        uri: &uri,
        version,
        secure: state.secure,
    };
    inbound.log();

    let start = Instant::now();
    let query = forward::parse_query(raw_query.as_deref());
    let pagination = Pagination::from_query(&query).inspect_err(|e| {
        tracing::warn!(error = %e, "Rejecting request");
        metrics::record_local_failure(
            forward::ORDERED_BY_TIME_TO_METRO,
            e.kind(),
            e.status().as_u16(),
            start,
        );
    })?;

    let request = ForwardRequest::ordered_by_time_to_metro(
        &transport_type,
        &sort_type,
        pagination,
        &query,
        &headers,
    );
    forward(&state, forward::ORDERED_BY_TIME_TO_METRO, request).await
}

/// Send the request upstream and relay whatever status line comes back.
async fn forward(
    state: &AppState,
    endpoint: &'static str,
    request: ForwardRequest,
) -> Result<Response, ForwardError> {
    let start = Instant::now();
    let request_id = Uuid::new_v4();
    let target = state.upstream.target_url(request.segments(), request.query());
    let span = tracing::info_span!("forward", %request_id, endpoint);

    async move {
        tracing::info!(target_url = %target, "Proxying request to upstream");

        let target_str = target.to_string();
        match state.upstream.get(target, request.into_headers()).await {
            Ok(upstream) => {
                let status = upstream.status;
                if status.is_client_error() || status.is_server_error() {
                    tracing::warn!(
                        status = status.as_u16(),
                        reason = status.canonical_reason().unwrap_or(""),
                        "Error status from upstream, relaying"
                    );
                } else {
                    tracing::info!(status = status.as_u16(), "Response received from upstream");
                }
                metrics::record_request(endpoint, status.as_u16(), start);
                Ok(relay(upstream))
            }
            Err(e) => {
                let err = ForwardError::from_transport(&target_str, e);
                tracing::error!(
                    target_url = %target_str,
                    error = %error_chain(&err),
                    "Upstream request failed"
                );
                metrics::record_local_failure(endpoint, err.kind(), err.status().as_u16(), start);
                Err(err)
            }
        }
    }
    .instrument(span)
    .await
}
