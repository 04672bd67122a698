//! Facet extraction from the host HTTP request.
//!
//! The request body is buffered once before extraction, so validating it
//! never consumes anything application logic still needs. Every facet is
//! extracted whether or not a schema is declared for it; validation is a
//! separate, later concern.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{FromRequestParts, RawPathParams};
use axum::http::header::{CONTENT_TYPE, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;

/// Router-provided path parameters, injected as a request extension.
///
/// Hosts that are not axum routers can insert this themselves; under an
/// axum router the extractor falls back to the router's own captures.
#[derive(Debug, Clone, Default)]
pub struct PathParams(pub HashMap<String, String>);

/// The five request facets in raw, extracted form.
#[derive(Debug, Clone)]
pub(crate) struct RequestFacets {
    /// Header names lowercased; non-UTF-8 values skipped.
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub path_params: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    /// Content type with parameters (charset etc.) stripped, lowercased.
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl RequestFacets {
    pub async fn extract(parts: &mut Parts, body: Bytes) -> Self {
        let headers = header_map(&parts.headers);
        let query = parts
            .uri
            .query()
            .map(parse_query)
            .unwrap_or_default();
        let cookies = parse_cookies(
            parts
                .headers
                .get(COOKIE)
                .and_then(|v| v.to_str().ok()),
        );
        let content_type = content_type_of(&parts.headers);
        let path_params = extract_path_params(parts).await;

        Self {
            headers,
            query,
            path_params,
            cookies,
            content_type,
            body,
        }
    }
}

async fn extract_path_params(parts: &mut Parts) -> HashMap<String, String> {
    // An explicit PathParams extension wins over router captures, so
    // non-axum hosts and tests can inject params directly.
    if let Some(PathParams(map)) = parts.extensions.get::<PathParams>() {
        return map.clone();
    }

    match RawPathParams::from_request_parts(parts, &()).await {
        Ok(raw) => raw
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        Err(_) => HashMap::new(),
    }
}

fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect()
}

fn parse_query(query: &str) -> HashMap<String, String> {
    match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
        // Collecting pairs in order makes the last duplicate win.
        Ok(pairs) => pairs.into_iter().collect(),
        Err(err) => {
            tracing::debug!(%err, "unparseable query string, treating as empty");
            HashMap::new()
        }
    }
}

/// Parse a `Cookie` header. The last occurrence of a duplicate name wins.
fn parse_cookies(header: Option<&str>) -> HashMap<String, String> {
    let Some(header) = header else {
        return HashMap::new();
    };

    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

fn content_type_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_lowercase()
        })
}
