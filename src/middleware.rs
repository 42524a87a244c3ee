// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Client identity derivation and the middleware guarding `/export`.
//!
//! The feed URL is validated before the client is admitted, so a rejected
//! URL never spends a token.

use crate::error::ExportError;
use crate::handlers::{AppState, ExportParams};
use axum::{
    extract::{ConnectInfo, Query, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Header set by proxies listing the originating client first.
pub const FORWARDED_FOR: &str = "x-forwarded-for";
/// Header set by proxies carrying the single client address.
pub const REAL_IP: &str = "x-real-ip";

/// Identity of the calling client, attached to admitted requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(pub String);

/// Feed URL that passed validation, attached ahead of admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedTarget(pub Url);

/// Derive the rate limiting identity for a request.
///
/// Precedence: first `X-Forwarded-For` entry, then `X-Real-IP`, then the
/// peer address without its port.
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(forwarded) = header(FORWARDED_FOR) {
        let first = forwarded.split(',').next().unwrap_or(forwarded).trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }

    if let Some(real_ip) = header(REAL_IP) {
        return real_ip.to_string();
    }

    match peer {
        Some(addr) => addr.ip().to_string(),
        None => "unknown".to_string(),
    }
}

fn request_identity(request: &Request) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    client_identity(request.headers(), peer)
}

/// Sanitize and validate the `url` query parameter, rejecting the request
/// with 400 before it reaches the rate limiter.
pub async fn validate_target(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExportParams>,
    mut request: Request,
    next: Next,
) -> Response {
    let raw = state
        .validator
        .sanitize_input(params.url.as_deref().unwrap_or_default());

    match state.validator.validate_url(&raw) {
        Ok(url) => {
            request.extensions_mut().insert(FeedTarget(url));
            next.run(request).await
        }
        Err(e) => {
            let err = ExportError::from(e);
            warn!(
                url = %raw,
                client = %request_identity(&request),
                error = %err,
                kind = err.kind(),
                "Invalid URL"
            );
            state.metrics.record_export_failure(&err);
            err.into_response()
        }
    }
}

/// Admit or reject a request against the per-client token bucket.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = request_identity(&request);

    if !state.limiter.admit(&identity).await {
        info!(
            client = %identity,
            path = %request.uri().path(),
            "Request rate limited"
        );
        state.metrics.record_rate_limit(false);
        return ExportError::RateLimited.into_response();
    }

    state.metrics.record_rate_limit(true);
    request.extensions_mut().insert(ClientIdentity(identity));
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("192.0.2.7:54321".parse().unwrap())
    }

    #[test]
    fn test_forwarded_for_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static(" 203.0.113.9 , 10.0.0.1"));
        headers.insert(REAL_IP, HeaderValue::from_static("198.51.100.4"));

        assert_eq!(client_identity(&headers, peer()), "203.0.113.9");
    }

    #[test]
    fn test_real_ip_beats_peer() {
        let mut headers = HeaderMap::new();
        headers.insert(REAL_IP, HeaderValue::from_static("198.51.100.4"));

        assert_eq!(client_identity(&headers, peer()), "198.51.100.4");
    }

    #[test]
    fn test_peer_address_without_port() {
        assert_eq!(client_identity(&HeaderMap::new(), peer()), "192.0.2.7");

        let v6: SocketAddr = "[2001:db8::1]:8080".parse().unwrap();
        assert_eq!(client_identity(&HeaderMap::new(), Some(v6)), "2001:db8::1");
    }

    #[test]
    fn test_blank_headers_are_skipped() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static("  "));
        headers.insert(REAL_IP, HeaderValue::from_static(""));

        assert_eq!(client_identity(&headers, peer()), "192.0.2.7");
        assert_eq!(client_identity(&headers, None), "unknown");
    }
}
