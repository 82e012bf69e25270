//! Translation of an inbound request into the upstream request.
//!
//! # Responsibilities
//! - Rebuild the outbound path from the fixed templates and the path tokens
//! - Carry query parameters through, with `page`/`size` defaults
//! - Copy every inbound header value, in order

use axum::http::HeaderMap;

use crate::http::response::ForwardError;

/// Path prefix shared by both forwarded endpoints.
pub const FLATS_PREFIX: [&str; 3] = ["api", "v1", "flats"];

pub const FIND_WITH_BALCONY: &str = "find-with-balcony";
pub const ORDERED_BY_TIME_TO_METRO: &str = "get-ordered-by-time-to-metro";

pub const PAGE_PARAM: &str = "page";
pub const SIZE_PARAM: &str = "size";

/// Pagination for the ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i32,
    pub size: i32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 0, size: 10 }
    }
}

impl Pagination {
    /// Read `page` and `size` from decoded query pairs.
    ///
    /// The first occurrence of each wins. Missing or empty values fall back
    /// to the defaults; anything else that is not an integer is rejected.
    pub fn from_query(pairs: &[(String, String)]) -> Result<Self, ForwardError> {
        let defaults = Self::default();
        Ok(Self {
            page: parse_int_param(pairs, PAGE_PARAM)?.unwrap_or(defaults.page),
            size: parse_int_param(pairs, SIZE_PARAM)?.unwrap_or(defaults.size),
        })
    }
}

fn parse_int_param(pairs: &[(String, String)], name: &str) -> Result<Option<i32>, ForwardError> {
    let Some((_, value)) = pairs.iter().find(|(key, _)| key == name) else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<i32>()
        .map(Some)
        .map_err(|_| ForwardError::InvalidParameter {
            name: name.to_string(),
            value: value.clone(),
        })
}

/// Decode a raw query string into ordered key/value pairs, duplicates kept.
pub fn parse_query(raw: Option<&str>) -> Vec<(String, String)> {
    raw.map(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .into_owned()
            .collect()
    })
    .unwrap_or_default()
}

/// Copy every header value under every name, preserving value order.
pub fn copy_headers(source: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(source.len());
    tracing::debug!("Copying headers from incoming request");
    for name in source.keys() {
        for value in source.get_all(name) {
            tracing::debug!(header = %name, value = ?value, "Forwarding header");
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}

/// The upstream call to make for one inbound request.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    segments: Vec<String>,
    query: Vec<(String, String)>,
    headers: HeaderMap,
}

impl ForwardRequest {
    /// `/api/v1/flats/find-with-balcony/{price_type}/{balcony_type}`, no query.
    pub fn find_with_balcony(price_type: &str, balcony_type: &str, headers: &HeaderMap) -> Self {
        Self {
            segments: flats_path(FIND_WITH_BALCONY, price_type, balcony_type),
            query: Vec::new(),
            headers: copy_headers(headers),
        }
    }

    /// `/api/v1/flats/get-ordered-by-time-to-metro/{transport_type}/{sort_type}`
    /// with `page` and `size` first, then every other inbound parameter.
    ///
    /// Pass-through values are grouped by name, names in order of first
    /// appearance, values in arrival order.
    pub fn ordered_by_time_to_metro(
        transport_type: &str,
        sort_type: &str,
        pagination: Pagination,
        inbound_query: &[(String, String)],
        headers: &HeaderMap,
    ) -> Self {
        let mut query = Vec::with_capacity(inbound_query.len() + 2);
        query.push((PAGE_PARAM.to_string(), pagination.page.to_string()));
        query.push((SIZE_PARAM.to_string(), pagination.size.to_string()));
        for (key, values) in group_by_name(inbound_query) {
            if key == PAGE_PARAM || key == SIZE_PARAM {
                continue;
            }
            query.extend(values.into_iter().map(|value| (key.to_string(), value.to_string())));
        }

        Self {
            segments: flats_path(ORDERED_BY_TIME_TO_METRO, transport_type, sort_type),
            query,
            headers: copy_headers(headers),
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    /// The outbound path, tokens as given.
    pub fn path(&self) -> String {
        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            path.push_str(segment);
        }
        path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn into_headers(self) -> HeaderMap {
        self.headers
    }
}

/// Values per parameter name, names in order of first appearance.
fn group_by_name(pairs: &[(String, String)]) -> Vec<(&str, Vec<&str>)> {
    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    for (key, value) in pairs {
        match groups.iter_mut().find(|(name, _)| *name == key.as_str()) {
            Some((_, values)) => values.push(value.as_str()),
            None => groups.push((key.as_str(), vec![value.as_str()])),
        }
    }
    groups
}

fn flats_path(operation: &str, first: &str, second: &str) -> Vec<String> {
    FLATS_PREFIX
        .iter()
        .copied()
        .chain([operation, first, second])
        .map(str::to_string)
        .collect()
}
