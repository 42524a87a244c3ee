// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for abuse simulation.

use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Generate a pool of well-formed feed URLs.
pub fn generate_feed_urls(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("https://feeds-{}.example.com/rss/{}.xml", i / 10, i % 10))
        .collect()
}

/// Feed URL inputs the validator must reject, after input sanitization.
/// - Empty/whitespace/markup only: missing URL
/// - not-a-url, ://missing-scheme.com/: parse failure
/// - ftp/file/javascript/data/gopher: scheme other than http/https
/// - https://, http://:80/: no host
pub fn generate_malformed_urls() -> Vec<&'static str> {
    vec![
        "",
        "   ",
        "<b></b>",
        "not-a-url",
        "ftp://wrong-scheme.com/",
        "://missing-scheme.com/",
        "https://",
        "http://:80/feed",
        "javascript:alert(1)",
        "data:text/html,<script>alert(1)</script>",
        "file:///etc/passwd",
        "gopher://example.com/1",
    ]
}

/// Markup-bearing URL inputs that still name a valid feed once tags are
/// stripped.
pub fn generate_tagged_urls() -> Vec<&'static str> {
    vec![
        "https://example.com/feed<script>alert(1)</script>",
        "<img src=x onerror=alert(1)>https://example.com/rss",
        "https://example.com/<svg/onload=alert(1)>atom.xml",
    ]
}

/// HTML fragments that must reduce to text without any markup.
pub fn generate_hostile_html() -> Vec<&'static str> {
    vec![
        "<script>alert(1)</script>",
        "<SCRIPT SRC=http://evil.example/x.js></SCRIPT>",
        "<img src=x onerror=alert(1)>",
        "<svg/onload=alert(1)>",
        "<style>body{background:url(javascript:alert(1))}</style>text",
        "&lt;script&gt;alert(1)&lt;/script&gt;",
        "<a href=\"javascript:alert(1)\">click</a>",
        "<iframe src=\"https://evil.example\"></iframe>",
        "<div onmouseover=\"alert(1)\">hover</div>",
        "<p>ok</p><script>\ndocument.write('<p>');\n</script>",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_generate_feed_urls() {
        let urls = generate_feed_urls(100);
        assert_eq!(urls.len(), 100);
        assert!(urls.iter().all(|u| u.starts_with("https://")));
    }
}
