// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! RSS to CSV Exporter
//!
//! A small HTTP service that fetches a remote RSS, RDF or Atom feed and
//! streams its items back as a CSV download:
//!
//! - Per-client token bucket rate limiting (60 rpm default)
//! - Feed URL sanitization and validation (http/https only)
//! - Bounded outbound fetch with timeout and body size cap
//! - Optional HTML stripping of description and content fields
//! - Streaming CSV output with a per-chunk write timeout

pub mod config;
pub mod error;
pub mod exporter;
pub mod feed;
pub mod fetcher;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod middleware;
pub mod sanitizer;
pub mod validator;

pub use config::Config;
pub use error::{ExportError, InitError};
pub use exporter::CsvExporter;
pub use feed::{parse_feed, Feed, FeedItem, MediaContent};
pub use fetcher::FeedFetcher;
pub use handlers::{router, AppState};
pub use limiter::RateLimiter;
pub use sanitizer::HtmlSanitizer;
pub use validator::UrlValidator;
