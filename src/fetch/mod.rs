// src/fetch/mod.rs
// =============================================================================
// This module is everything the crawler needs from the outside world.
//
// Submodules:
// - http: Downloads pages with reqwest
// - pattern: Finds links with a regular expression (fast, forgiving)
// - html: Finds links by parsing the HTML (slower, more accurate)
//
// The crawl engine only sees the two traits below, so tests can swap in
// fake implementations that never touch the network.
//
// Rust concepts:
// - Traits: Shared behavior that different types can implement
// - async-trait: Lets a trait have async methods and still be used as dyn Trait
// - Send + Sync: The implementation can be shared between threads
// =============================================================================

mod html;
mod http;
mod pattern;

use async_trait::async_trait;

use crate::crawl::CrawlError;

pub use html::HtmlLinkExtractor;
pub use http::HttpFetcher;
pub use pattern::PatternLinkExtractor;

// What came back from fetching one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// HTTP status code (any status counts as a page)
    pub status: u16,
    /// The Content-Type header, if the server sent one
    pub content_type: Option<String>,
    /// The URL after following redirects; links are resolved against this
    pub final_url: String,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, CrawlError>;
}

pub trait LinkExtractor: Send + Sync {
    /// Returns raw link strings in the order they appear in `body`.
    /// Duplicates are kept.
    fn extract_links(&self, body: &[u8]) -> Vec<String>;
}
