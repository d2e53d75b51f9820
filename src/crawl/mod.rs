// src/crawl/mod.rs
// =============================================================================
// This module handles recursive website crawling.
//
// Features:
// - Follows links from a seed page down to a maximum depth
// - Visits every URL at most once per run
// - Runs many fetches at the same time, with a cap
// - Builds a tree of pages that mirrors how they were discovered
// - Knows when the crawl is finished, even though new work keeps appearing
//
// Submodules:
// - settings: The knobs for one run
// - resolve: Relative link -> absolute URL
// - cache: "Have we seen this URL before?"
// - queue: Bounded work queue with completion detection
// - tree: The result tree and how it is printed
// - engine: Ties everything together
// =============================================================================

mod cache;
mod engine;
mod error;
mod queue;
mod resolve;
mod settings;
mod tree;

pub use engine::{CrawlReport, Crawler};
pub use error::CrawlError;
pub use queue::QueueOutcome;
pub use settings::CrawlSettings;
pub use tree::{CrawlEntry, CrawlSummary};
