// src/crawl/settings.rs
// =============================================================================
// The knobs for one crawl run.
//
// Settings are checked once, when they are created. After that they never
// change, so every worker can read them without locking.
// =============================================================================

use std::time::Duration;

use super::error::CrawlError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSettings {
    max_depth: usize,
    wait_time: Duration,
    max_concurrent_requests: usize,
    max_queue_capacity: usize,
    deadline: Option<Duration>,
}

impl CrawlSettings {
    /// Creates settings for a crawl run.
    ///
    /// `max_concurrent_requests` and `max_queue_capacity` must both be at
    /// least 1, otherwise `CrawlError::InvalidSettings` is returned.
    pub fn new(
        max_depth: usize,
        wait_time_millis: u64,
        max_concurrent_requests: usize,
        max_queue_capacity: usize,
    ) -> Result<Self, CrawlError> {
        if max_concurrent_requests == 0 {
            return Err(CrawlError::InvalidSettings(
                "max concurrent requests must be at least 1".to_string(),
            ));
        }
        if max_queue_capacity == 0 {
            return Err(CrawlError::InvalidSettings(
                "max queue capacity must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            max_depth,
            wait_time: Duration::from_millis(wait_time_millis),
            max_concurrent_requests,
            max_queue_capacity,
            deadline: None,
        })
    }

    /// Stops the crawl after `deadline` even if work is left.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Pause taken after every fetch
    pub fn wait_time(&self) -> Duration {
        self.wait_time
    }

    pub fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent_requests
    }

    pub fn max_queue_capacity(&self) -> usize {
        self.max_queue_capacity
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_depth: 1,
            wait_time: Duration::ZERO,
            max_concurrent_requests: 8,
            max_queue_capacity: 64,
            deadline: None,
        }
    }
}
