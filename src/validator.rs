// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Feed URL input sanitization and validation.
//!
//! Rejects, each with its own message:
//! - empty input
//! - input longer than the configured maximum
//! - unparsable URLs
//! - schemes other than http/https
//! - URLs without a host

use crate::config::ValidationConfig;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;
use url::Url;

static INPUT_TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("input tag pattern is valid"));

/// Field name reported for the feed URL parameter.
pub const URL_FIELD: &str = "url";

/// Why a URL was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationErrorKind {
    #[error("URL cannot be empty")]
    Empty,

    #[error("URL is too long")]
    TooLong,

    #[error("invalid URL format")]
    InvalidFormat,

    #[error("URL scheme must be http or https")]
    UnsupportedScheme,

    #[error("URL must have a host")]
    MissingHost,
}

/// A rejected input, tagged with the field it came from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation error on field '{field}': {kind}")]
pub struct ValidationError {
    pub field: &'static str,
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    /// Error on the `url` field.
    pub fn new(kind: ValidationErrorKind) -> Self {
        Self {
            field: URL_FIELD,
            kind,
        }
    }
}

/// Feed URL validator.
pub struct UrlValidator {
    config: ValidationConfig,
}

impl UrlValidator {
    /// Create a new validator with the given configuration.
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Strip anything shaped like a tag from raw query input, then trim.
    ///
    /// This is a cheap guard against reflected markup, separate from the
    /// feed content sanitizer.
    pub fn sanitize_input(&self, input: &str) -> String {
        INPUT_TAG_PATTERN.replace_all(input, "").trim().to_string()
    }

    /// Validate a feed URL, returning the parsed form on success.
    pub fn validate_url(&self, raw: &str) -> Result<Url, ValidationError> {
        if raw.is_empty() {
            debug!("Empty feed URL");
            return Err(ValidationError::new(ValidationErrorKind::Empty));
        }

        if raw.len() > self.config.max_url_length {
            debug!(len = raw.len(), max = self.config.max_url_length, "Feed URL too long");
            return Err(ValidationError::new(ValidationErrorKind::TooLong));
        }

        let url = match Url::parse(raw) {
            Ok(url) => url,
            // http(s) URLs without a host fail to parse at all; report the
            // scheme problem first when there is one, as for parsed URLs.
            Err(url::ParseError::EmptyHost) if has_allowed_scheme(raw) => {
                debug!(url = %raw, "Feed URL has no host");
                return Err(ValidationError::new(ValidationErrorKind::MissingHost));
            }
            Err(url::ParseError::EmptyHost) => {
                debug!(url = %raw, "Feed URL has unsupported scheme");
                return Err(ValidationError::new(ValidationErrorKind::UnsupportedScheme));
            }
            Err(e) => {
                debug!(url = %raw, error = %e, "Invalid feed URL format");
                return Err(ValidationError::new(ValidationErrorKind::InvalidFormat));
            }
        };

        if !matches!(url.scheme(), "http" | "https") {
            debug!(url = %raw, scheme = url.scheme(), "Feed URL has unsupported scheme");
            return Err(ValidationError::new(ValidationErrorKind::UnsupportedScheme));
        }

        // The parser fills in a host for `http:/example.com` or
        // `http:///example.com`; only an explicit authority counts.
        if url.host_str().map_or(true, str::is_empty) || !has_authority(raw) {
            debug!(url = %raw, "Feed URL has no host");
            return Err(ValidationError::new(ValidationErrorKind::MissingHost));
        }

        Ok(url)
    }
}

fn has_allowed_scheme(raw: &str) -> bool {
    raw.split_once(':')
        .map(|(scheme, _)| scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https"))
        .unwrap_or(false)
}

/// Whether a non-empty authority follows `scheme://`.
fn has_authority(raw: &str) -> bool {
    raw.split_once(':')
        .and_then(|(_, rest)| rest.strip_prefix("//"))
        .and_then(|authority| authority.chars().next())
        .map_or(false, |c| !matches!(c, '/' | '\\' | '?' | '#'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_validator() -> UrlValidator {
        UrlValidator::new(ValidationConfig::default())
    }

    fn kind(raw: &str) -> ValidationErrorKind {
        default_validator().validate_url(raw).unwrap_err().kind
    }

    #[test]
    fn test_valid_urls() {
        let validator = default_validator();

        let url = validator
            .validate_url("https://example.com/feed.xml")
            .unwrap();
        assert_eq!(url.host_str(), Some("example.com"));

        assert!(validator
            .validate_url("http://news.example.org:8080/rss?cat=tech")
            .is_ok());
    }

    #[test]
    fn test_empty_url() {
        assert_eq!(kind(""), ValidationErrorKind::Empty);
    }

    #[test]
    fn test_too_long() {
        let validator = UrlValidator::new(ValidationConfig { max_url_length: 30 });
        let err = validator
            .validate_url("https://example.com/a/very/long/feed/path.xml")
            .unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::TooLong);
        assert_eq!(err.field, "url");
    }

    #[test]
    fn test_invalid_format() {
        assert_eq!(kind("not a url"), ValidationErrorKind::InvalidFormat);
        assert_eq!(kind("://missing-scheme.com/"), ValidationErrorKind::InvalidFormat);
    }

    #[test]
    fn test_scheme_rejected() {
        assert_eq!(kind("ftp://example.com/feed"), ValidationErrorKind::UnsupportedScheme);
        assert_eq!(kind("javascript:alert(1)"), ValidationErrorKind::UnsupportedScheme);
        assert_eq!(kind("file:///etc/passwd"), ValidationErrorKind::UnsupportedScheme);
        assert_eq!(kind("ftp://"), ValidationErrorKind::UnsupportedScheme);
    }

    #[test]
    fn test_missing_host() {
        assert_eq!(kind("https://"), ValidationErrorKind::MissingHost);
        assert_eq!(kind("http://:8080/feed"), ValidationErrorKind::MissingHost);
    }

    #[test]
    fn test_host_requires_authority() {
        assert_eq!(kind("http:/example.com"), ValidationErrorKind::MissingHost);
        assert_eq!(kind("https:feed"), ValidationErrorKind::MissingHost);
        assert_eq!(kind("http:///example.com/feed"), ValidationErrorKind::MissingHost);
        assert_eq!(kind("http:\\\\example.com"), ValidationErrorKind::MissingHost);

        let url = default_validator().validate_url("HTTP://Example.com/feed").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_messages_are_distinct() {
        let kinds = [
            ValidationErrorKind::Empty,
            ValidationErrorKind::TooLong,
            ValidationErrorKind::InvalidFormat,
            ValidationErrorKind::UnsupportedScheme,
            ValidationErrorKind::MissingHost,
        ];
        let messages: std::collections::HashSet<_> =
            kinds.iter().map(|k| k.to_string()).collect();
        assert_eq!(messages.len(), kinds.len());
    }

    #[test]
    fn test_sanitize_input() {
        let validator = default_validator();

        assert_eq!(
            validator.sanitize_input("  https://example.com/feed<script>alert(1)</script> "),
            "https://example.com/feedalert(1)"
        );
        assert_eq!(validator.sanitize_input("https://example.com/rss"), "https://example.com/rss");
        assert_eq!(validator.sanitize_input("<b></b>"), "");
    }
}
