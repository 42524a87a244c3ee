// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound feed fetching.
//!
//! One GET per export, no retries. The request future belongs to the
//! inbound handler, so a dropped client connection aborts the fetch.

use crate::config::FetchConfig;
use crate::error::ExportError;
use crate::feed::{parse_feed, Feed};
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Accept header advertising feed formats first.
pub const FEED_ACCEPT: &str = "application/rss+xml, application/xml, text/xml, */*";

/// Underlying reason a fetch failed.
#[derive(Debug, Error)]
pub enum FetchCause {
    /// Network-level error (DNS, connection, TLS, timeout)
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// Upstream answered with a non-2xx status
    #[error("unexpected status: {0}")]
    Status(StatusCode),

    /// Response body exceeded the configured limit
    #[error("response exceeds {limit} bytes")]
    TooLarge { limit: u64 },
}

/// A failed upstream fetch.
#[derive(Debug, Error)]
#[error("failed to fetch RSS from {url}{}: {source}", status_suffix(.status))]
pub struct FetchError {
    pub url: String,
    /// HTTP status, when the upstream answered at all
    pub status: Option<u16>,
    #[source]
    pub source: FetchCause,
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" (status: {code})"))
        .unwrap_or_default()
}

impl FetchError {
    fn new(url: &Url, source: FetchCause) -> Self {
        let status = match &source {
            FetchCause::Status(status) => Some(status.as_u16()),
            _ => None,
        };
        Self {
            url: url.to_string(),
            status,
            source,
        }
    }
}

/// HTTP client for feed downloads.
pub struct FeedFetcher {
    client: Client,
    max_feed_size: u64,
}

impl FeedFetcher {
    /// Build a fetcher with the configured timeout and identifying headers.
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(FEED_ACCEPT));

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size,
        })
    }

    /// Fetch and parse a feed.
    ///
    /// A feed that parses but holds no items is reported as
    /// [`ExportError::EmptyFeed`].
    pub async fn fetch(&self, url: &Url) -> Result<Feed, ExportError> {
        debug!(url = %url, "Fetching feed");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::new(url, FetchCause::Transport(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(url, FetchCause::Status(status)).into());
        }

        let body = read_limited_bytes(response, self.max_feed_size)
            .await
            .map_err(|cause| FetchError::new(url, cause))?;

        let feed = parse_feed(&body)?;
        debug!(url = %url, items = feed.items.len(), "Parsed feed");

        if feed.items.is_empty() {
            return Err(ExportError::EmptyFeed);
        }
        Ok(feed)
    }
}

/// Read a response body, refusing anything larger than `limit` bytes.
async fn read_limited_bytes(response: reqwest::Response, limit: u64) -> Result<Vec<u8>, FetchCause> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len > limit {
            return Err(FetchCause::TooLarge { limit });
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if (bytes.len() as u64).saturating_add(chunk.len() as u64) > limit {
            return Err(FetchCause::TooLarge { limit });
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
