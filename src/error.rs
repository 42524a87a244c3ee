// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error taxonomy for the export pipeline and its HTTP mapping.

use crate::feed::ParseError;
use crate::fetcher::FetchError;
use crate::validator::ValidationError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Body returned with every 429.
pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

/// Errors surfaced by an export request.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("no items found in RSS feed")]
    EmptyFeed,

    #[error("rate limit exceeded")]
    RateLimited,

    /// The response stream failed after headers were committed. Only ever
    /// logged; the client sees a truncated body.
    #[error("failed to write CSV: {0}")]
    Write(#[source] std::io::Error),
}

impl ExportError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Fetch(_) => "fetch_error",
            Self::Parse(_) => "parse_error",
            Self::EmptyFeed => "empty_feed",
            Self::RateLimited => "rate_limited",
            Self::Write(_) => "write_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Fetch(_) | Self::Parse(_) | Self::EmptyFeed => {
                StatusCode::BAD_REQUEST
            }
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Write(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ExportError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            Self::Validation(err) => (status, format!("Invalid URL: {err}")).into_response(),
            // A token is always available again within one second.
            Self::RateLimited => {
                (status, [(header::RETRY_AFTER, "1")], RATE_LIMIT_MESSAGE).into_response()
            }
            other => (status, other.to_string()).into_response(),
        }
    }
}

/// Errors raised while assembling application state.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("failed to register metrics: {0}")]
    Metrics(#[from] prometheus::Error),
}
