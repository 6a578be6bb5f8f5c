//! In-process response cache

use super::{CacheEntry, ResponseCache};
use crate::error::Result;
use crate::types::{validate_scope, RequestIdentity};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Response cache held in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<RequestIdentity, CacheEntry>>,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RequestIdentity, CacheEntry>> {
        // A poisoned map is still structurally valid.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, identity: &RequestIdentity) -> Result<Option<CacheEntry>> {
        validate_scope(&identity.scope)?;
        Ok(self.lock().get(identity).cloned())
    }

    async fn put(&self, identity: &RequestIdentity, entry: &CacheEntry) -> Result<()> {
        validate_scope(&identity.scope)?;
        self.lock().insert(identity.clone(), entry.clone());
        Ok(())
    }

    async fn invalidate(&self, identity: &RequestIdentity) -> Result<()> {
        validate_scope(&identity.scope)?;
        self.lock().remove(identity);
        Ok(())
    }

    async fn clear_scope(&self, scope: &str) -> Result<()> {
        validate_scope(scope)?;
        self.lock().retain(|identity, _| identity.scope != scope);
        Ok(())
    }
}
