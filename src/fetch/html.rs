// src/fetch/html.rs
// =============================================================================
// This module extracts links from HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// Unlike the pattern extractor, this understands single quotes, entities
// like &amp; and unquoted attributes. Links are returned raw (not resolved);
// the crawl engine resolves them against the page URL.
//
// Rust concepts:
// - Iterators: For processing collections
// - find_map: Take the first attribute that is present
// =============================================================================

use scraper::{Html, Selector};

use super::LinkExtractor;

// Every element that can point at another resource we might crawl
const LINK_SELECTOR: &str =
    "a[href], area[href], link[href], img[src], script[src], iframe[src], frame[src], form[action]";

pub struct HtmlLinkExtractor {
    selector: Selector,
}

impl HtmlLinkExtractor {
    pub fn new() -> Self {
        // Selector::parse returns Result, but LINK_SELECTOR is a constant
        // and known to be valid, so a failure here is a programmer error
        let selector = Selector::parse(LINK_SELECTOR).expect("link selector is valid CSS");
        Self { selector }
    }
}

impl Default for HtmlLinkExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, body: &[u8]) -> Vec<String> {
        // Invalid UTF-8 becomes U+FFFD instead of failing the whole page
        let html = String::from_utf8_lossy(body);
        let document = Html::parse_document(&html);

        // select() walks the document in order, so links keep page order
        document
            .select(&self.selector)
            .filter_map(|element| {
                ["href", "src", "action"]
                    .iter()
                    .find_map(|name| element.value().attr(name))
            })
            .map(str::trim)
            .filter(|link| !link.is_empty())
            .map(str::to_string)
            .collect()
    }
}
