// src/crawl/tree.rs
// =============================================================================
// The result of a crawl: a tree with one entry per visited page.
//
// Building the tree concurrently:
// - When a worker finishes a page, it knows how many new links it admitted.
//   It creates its entry with exactly that many empty child slots, and puts
//   the entry into the slot its parent reserved for it.
// - Each child task is told "your parent is X, your slot is i". It writes
//   into that one slot and nowhere else.
// - A slot is a OnceLock: it can be set once and never changed, so nobody
//   needs a lock on the tree and children can finish in any order while
//   the order of the slots stays the order of the links on the page.
//
// While the crawl runs, entries are PendingEntry (shared through Arc).
// When it is over, they are turned into plain owned CrawlEntry values.
//
// Rust concepts:
// - Arc: Shared ownership between tasks
// - OnceLock: A cell that is written at most once, safe across threads
// - Arc::try_unwrap: Take back sole ownership when no one else holds a clone
// =============================================================================

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::Serialize;

use super::error::CrawlError;

/// Content type reported when the server sends none, or the fetch failed.
pub const UNKNOWN_CONTENT_TYPE: &str = "unknown";

// One page of the finished crawl
//
// An entry with an error never has children.
// Every child's depth is its parent's depth + 1.
// A child slot is None only if the crawl was cut short by a deadline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlEntry {
    pub depth: usize,
    pub url: String,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CrawlError>,
    pub children: Vec<Option<CrawlEntry>>,
}

/// Counts collected by walking a finished tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub pages: usize,
    pub failures: usize,
    pub missing: usize,
    pub max_depth: usize,
}

impl CrawlEntry {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    // Walks the tree depth-first, parents before children, skipping empty slots
    pub fn iter(&self) -> impl Iterator<Item = &CrawlEntry> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let entry = stack.pop()?;
            stack.extend(entry.children.iter().rev().flatten());
            Some(entry)
        })
    }

    pub fn summary(&self) -> CrawlSummary {
        let missing = self
            .iter()
            .map(|entry| entry.children.iter().filter(|c| c.is_none()).count())
            .sum();

        self.iter().fold(
            CrawlSummary {
                missing,
                ..CrawlSummary::default()
            },
            |mut summary, entry| {
                summary.pages += 1;
                if !entry.is_ok() {
                    summary.failures += 1;
                }
                summary.max_depth = summary.max_depth.max(entry.depth);
                summary
            },
        )
    }

    // Writes the tree as text: one line per entry, one tab per depth level
    //
    // An entry with an error shows the error message instead of its URL.
    // With `show_types`, successful entries also show their content type.
    pub fn write_tree<W: fmt::Write>(&self, out: &mut W, show_types: bool) -> fmt::Result {
        let indent = "\t".repeat(self.depth);

        if let Some(err) = &self.error {
            return writeln!(out, "{}{}", indent, err);
        }

        if show_types {
            writeln!(out, "{}{} [{}]", indent, self.url, self.content_type)?;
        } else {
            writeln!(out, "{}{}", indent, self.url)?;
        }

        for child in self.children.iter().flatten() {
            child.write_tree(out, show_types)?;
        }
        Ok(())
    }
}

impl fmt::Display for CrawlEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, false)
    }
}

// An entry that is still being built
pub(crate) struct PendingEntry {
    depth: usize,
    url: String,
    content_type: String,
    error: Option<CrawlError>,
    children: Vec<OnceLock<Arc<PendingEntry>>>,
}

impl PendingEntry {
    pub(crate) fn new(
        depth: usize,
        url: String,
        content_type: Option<String>,
        error: Option<CrawlError>,
        slots: usize,
    ) -> Self {
        // Errors never have children
        let slots = if error.is_some() { 0 } else { slots };

        Self {
            depth,
            url,
            content_type: content_type.unwrap_or_else(|| UNKNOWN_CONTENT_TYPE.to_string()),
            error,
            children: (0..slots).map(|_| OnceLock::new()).collect(),
        }
    }

    pub(crate) fn failed(depth: usize, url: String, error: CrawlError) -> Self {
        Self::new(depth, url, None, Some(error), 0)
    }

    // The invisible entry above the crawl, with one slot for the seed page
    pub(crate) fn root() -> Arc<Self> {
        Arc::new(Self::new(0, String::new(), None, None, 1))
    }

    // Puts `child` into slot `index`; returns the stored entry
    //
    // None if the slot doesn't exist or was already filled.
    pub(crate) fn fill(&self, index: usize, child: PendingEntry) -> Option<Arc<PendingEntry>> {
        let slot = self.children.get(index)?;
        let child = Arc::new(child);
        slot.set(Arc::clone(&child)).ok()?;
        Some(child)
    }

    fn into_entry(self) -> CrawlEntry {
        CrawlEntry {
            depth: self.depth,
            url: self.url,
            content_type: self.content_type,
            error: self.error,
            children: self
                .children
                .into_iter()
                .map(|slot| slot.into_inner().map(finish))
                .collect(),
        }
    }

    fn snapshot(&self) -> CrawlEntry {
        CrawlEntry {
            depth: self.depth,
            url: self.url.clone(),
            content_type: self.content_type.clone(),
            error: self.error.clone(),
            children: self
                .children
                .iter()
                .map(|slot| slot.get().map(|child| child.snapshot()))
                .collect(),
        }
    }
}

// Turns a pending entry into an owned one
//
// Normally this is the last reference. If some task still holds a clone
// (it was aborted but not dropped yet), copy instead of moving.
pub(crate) fn finish(entry: Arc<PendingEntry>) -> CrawlEntry {
    match Arc::try_unwrap(entry) {
        Ok(owned) => owned.into_entry(),
        Err(shared) => shared.snapshot(),
    }
}
