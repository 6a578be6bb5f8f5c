//! Cached response records

use crate::pagination::next_cursor_from_headers;
use crate::types::{HeaderMapping, PageCursor, RequestIdentity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored response: status, lower-cased headers and raw body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// HTTP status code
    pub status: u16,
    /// Response headers keyed by lower-cased name
    #[serde(default)]
    pub headers: HeaderMapping,
    /// Raw response body
    pub body: String,
    /// When the response was stored
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry stamped with the current time
    pub fn new(status: u16, headers: HeaderMapping, body: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            stored_at: Utc::now(),
        }
    }

    /// Look up a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Next-page cursor carried by this response's `Link` header
    pub fn next_cursor(&self) -> PageCursor {
        next_cursor_from_headers(&self.headers)
    }

    /// Whether this response is the final page of its collection
    pub fn is_last_page(&self) -> bool {
        self.next_cursor().is_none()
    }
}

/// On-disk form of a cache entry: the entry plus the identity it answers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Request the entry answers
    pub request: RequestIdentity,
    /// Stored response
    #[serde(flatten)]
    pub entry: CacheEntry,
}
