// src/crawl/cache.rs
// =============================================================================
// Remembers every URL that has been admitted to the crawl.
//
// Many workers discover links at the same time. When two of them find the
// same URL, exactly one may schedule it. admit() does the "is it there?"
// check and the insert as one step, so they can't both win.
//
// Rust concepts:
// - DashSet: A HashSet split into shards, each with its own lock
// - insert returns false if the value was already present
// =============================================================================

use dashmap::DashSet;

#[derive(Debug, Default)]
pub struct UrlCache {
    seen: DashSet<String>,
}

impl UrlCache {
    pub fn new() -> Self {
        Self::default()
    }

    // Returns true the first time a URL is admitted, false every time after
    //
    // The caller that gets true owns scheduling that URL.
    // No normalization happens here; pass the resolver's output.
    pub fn admit(&self, url: &str) -> bool {
        // Only the shard holding this URL is locked, and only for the insert
        self.seen.insert(url.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }
}
