// src/fetch/pattern.rs
// =============================================================================
// Finds links with a regular expression instead of parsing HTML.
//
// It matches href="...", src="..." and action="..." with a double-quoted
// value made of URL-safe characters. That misses some links (single quotes,
// query strings with '?' or '&') but it works on any text, even broken HTML,
// and it is very fast.
// =============================================================================

use regex::bytes::Regex;

use super::LinkExtractor;

const LINK_PATTERN: &str = r#"(href|src|action)="([a-zA-Z0-9:/\-._~]+)""#;

pub struct PatternLinkExtractor {
    pattern: Regex,
}

impl PatternLinkExtractor {
    pub fn new() -> Self {
        // LINK_PATTERN is a constant known to be valid, so this can't fail
        let pattern = Regex::new(LINK_PATTERN).expect("link pattern is a valid regex");
        Self { pattern }
    }
}

impl Default for PatternLinkExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkExtractor for PatternLinkExtractor {
    fn extract_links(&self, body: &[u8]) -> Vec<String> {
        self.pattern
            .captures_iter(body)
            .filter_map(|caps| caps.get(2))
            .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
            .collect()
    }
}
