// src/crawl/error.rs
// =============================================================================
// Errors that can happen while crawling.
//
// None of these stop the whole crawl. A fetch error is stored on the page
// entry where it happened, and the crawl carries on with the other pages.
// The only errors that reach the caller are bad settings (before anything
// starts) and a closed queue (which the engine turns into an error leaf).
//
// Rust concepts:
// - thiserror: Derives Display and std::error::Error from #[error(...)]
// - Clone on errors: Entries are cloned in rare cases, so their errors must be too
// =============================================================================

use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrawlError {
    /// The request could not be sent or no response came back
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// A response arrived but its body could not be read
    #[error("failed to read body of {url}: {reason}")]
    BodyRead { url: String, reason: String },

    /// A task was submitted after the work queue shut down
    #[error("work queue is closed")]
    QueueClosed,

    /// Settings rejected when the crawl was configured
    #[error("invalid crawl settings: {0}")]
    InvalidSettings(String),
}

// In JSON output an error is just its message
impl Serialize for CrawlError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
