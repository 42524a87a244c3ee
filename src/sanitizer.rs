// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTML to plain text reduction for feed fields.
//!
//! Markup is removed by an ordered table of regex rewrites, not by parsing.
//! Nested or malformed markup is handled only as far as the patterns reach:
//! anything shaped like `<...>` that survives the earlier rules is dropped.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// One step of the rewrite pipeline.
#[derive(Debug)]
pub struct RewriteRule {
    /// Stable name for logs and tests
    pub name: &'static str,
    pattern: Regex,
    replacement: &'static str,
}

impl RewriteRule {
    fn new(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("rewrite pattern is a valid literal regex"),
            replacement,
        }
    }

    /// Apply this rule to `input`.
    pub fn apply<'a>(&self, input: &'a str) -> Cow<'a, str> {
        self.pattern.replace_all(input, self.replacement)
    }
}

/// Rewrites applied after entity decoding, in order. Later rules assume the
/// earlier ones already ran: script and style bodies must go before the
/// generic tag stripper, and structural tags must become newlines before
/// it erases them.
static RULES: LazyLock<Vec<RewriteRule>> = LazyLock::new(|| {
    vec![
        RewriteRule::new("script", r"(?is)<script[^>]*>.*?</script>", ""),
        RewriteRule::new("style", r"(?is)<style[^>]*>.*?</style>", ""),
        RewriteRule::new("line_break", r"(?i)<br\s*/?>", "\n"),
        RewriteRule::new("block", r"(?i)</?(?:p|div|h[1-6]|ul|ol|li)[^>]*>", "\n"),
        RewriteRule::new("tag", r"<[^>]+>", ""),
        RewriteRule::new("blank_lines", r"\n{3,}", "\n\n"),
    ]
});

/// Stateless HTML stripper. Cheap to clone; all instances share the same
/// compiled rule table.
#[derive(Debug, Clone, Copy)]
pub struct HtmlSanitizer {
    rules: &'static [RewriteRule],
}

impl Default for HtmlSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlSanitizer {
    pub fn new() -> Self {
        Self {
            rules: RULES.as_slice(),
        }
    }

    /// The rewrite rules in application order.
    pub fn rules(&self) -> &'static [RewriteRule] {
        self.rules
    }

    /// Reduce an HTML fragment to readable plain text.
    ///
    /// Entities are decoded first, so escaped markup such as `&lt;b&gt;`
    /// is treated as a tag and removed along with real ones.
    pub fn strip_html(&self, input: &str) -> String {
        if input.is_empty() {
            return String::new();
        }

        let mut text = html_escape::decode_html_entities(input).into_owned();
        for rule in self.rules {
            text = rule.apply(&text).into_owned();
        }
        text.trim().to_string()
    }
}
