//! Response cache module
//!
//! Persists raw request/response pairs keyed by [`RequestIdentity`] so that
//! repeated runs do not spend API quota on data already fetched.
//!
//! # Overview
//!
//! The cache module provides:
//! - `CacheEntry` - Immutable status/headers/body record
//! - `ResponseCache` - Storage trait consumed by the fetch engine
//! - `DiskCache` - Human-inspectable JSON files under a cache root, one
//!   directory per tracked repository
//! - `MemoryCache` - In-process store for tests and uncached runs
//!
//! [`RequestIdentity`]: crate::types::RequestIdentity

mod disk;
mod entry;
mod memory;

pub use disk::DiskCache;
pub use entry::{CacheEntry, CacheRecord};
pub use memory::MemoryCache;

use crate::error::Result;
use crate::types::RequestIdentity;
use async_trait::async_trait;

/// Storage backend for cached responses
///
/// At most one entry exists per identity; `put` overwrites.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Look up the entry for `identity`
    async fn get(&self, identity: &RequestIdentity) -> Result<Option<CacheEntry>>;

    /// Store `entry` under `identity`, replacing any previous entry
    async fn put(&self, identity: &RequestIdentity, entry: &CacheEntry) -> Result<()>;

    /// Remove the entry for `identity`; a missing entry is not an error
    async fn invalidate(&self, identity: &RequestIdentity) -> Result<()>;

    /// Remove every entry stored under the given repository scope
    async fn clear_scope(&self, scope: &str) -> Result<()>;
}
