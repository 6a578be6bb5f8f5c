//! Engine types
//!
//! What a single fetch hands back to the traversal layer.

use crate::types::PageCursor;

/// Where a page's data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSource {
    /// Served from the response cache without a network call
    Cache,
    /// Fetched from the network (and cached)
    Network,
    /// Soft failure: a permanent error or an exhausted attempt budget
    Unavailable,
}

/// One decoded page plus the cursor to the next one
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage<T> {
    /// Decoded body; `None` only when `source` is `Unavailable`
    pub value: Option<T>,
    /// Next page of the collection, if any
    pub next: PageCursor,
    /// Where the data came from
    pub source: PageSource,
}

impl<T> FetchedPage<T> {
    /// A soft failure: no data and no further pages
    pub fn unavailable() -> Self {
        Self {
            value: None,
            next: None,
            source: PageSource::Unavailable,
        }
    }

    /// Whether the page carries data
    pub fn is_available(&self) -> bool {
        self.source != PageSource::Unavailable
    }

    /// Whether the page was served from the cache
    pub fn is_cached(&self) -> bool {
        self.source == PageSource::Cache
    }

    /// Split into the decoded value and the next cursor
    pub fn into_parts(self) -> (Option<T>, PageCursor) {
        (self.value, self.next)
    }
}
