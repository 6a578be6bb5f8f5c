//! Fetch engine module
//!
//! The public entry point: fetch one URL, consulting the response cache
//! first, retrying through the backoff policy on a miss, and decoding the
//! body into the caller's type.
//!
//! # Overview
//!
//! The engine module provides:
//! - `Fetcher` - Composes cache, executor and backoff policy
//! - `FetchedPage` - Decoded value plus next-page cursor
//! - `fetch_all` - Cursor walker for whole collections
//!
//! Fetches are sequential: each call, waits included, completes before the
//! caller issues the next one, so one policy instance sees every request
//! made with a token.

mod types;

pub use types::{FetchedPage, PageSource};

use crate::cache::{CacheEntry, DiskCache, ResponseCache};
use crate::config::FetchConfig;
use crate::error::{Error, Result};
use crate::http::HttpExecutor;
use crate::retry::{BackoffPolicy, Decision, Sleeper, TokioSleeper};
use crate::types::{FetchContext, RequestIdentity};
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Rate-limit-aware, cache-first fetcher
pub struct Fetcher {
    /// Network attempts
    executor: HttpExecutor,
    /// Response cache
    cache: Arc<dyn ResponseCache>,
    /// Retry decisions
    policy: BackoffPolicy,
    /// Performs the waits the policy asks for
    sleeper: Arc<dyn Sleeper>,
}

impl Fetcher {
    /// Create a fetcher with the default policy and real sleeps
    pub fn new(executor: HttpExecutor, cache: Arc<dyn ResponseCache>) -> Self {
        Self {
            executor,
            cache,
            policy: BackoffPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Create a fetcher backed by a disk cache, as described by `config`
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        config.validate()?;
        let executor = HttpExecutor::with_config(config.http_client_config())?;
        let cache = Arc::new(DiskCache::new(&config.cache_dir));
        Ok(Self::new(executor, cache).with_policy(config.backoff_policy()))
    }

    /// Set the backoff policy
    #[must_use]
    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the sleeper used for backoff and rate-limit waits
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Get the backoff policy
    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Remove every cached response of a tracked repository
    pub async fn clear_scope(&self, repo: &str) -> Result<()> {
        info!(repo, "clearing response cache");
        self.cache.clear_scope(repo).await
    }

    /// Fetch `url` and decode its body as `T`
    ///
    /// Cached responses are used without a network call, except that with
    /// `revalidate_last_page` a cached final page (no next cursor) is fetched
    /// again, since new items may have been appended since it was stored.
    ///
    /// A permanent HTTP failure or an exhausted attempt budget is logged and
    /// returned as [`FetchedPage::unavailable`], not as an error. A body that
    /// fails to decode is invalidated and fetched once more; a second decode
    /// failure is an [`Error::Decode`]. Cache read failures are errors.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        ctx: &FetchContext,
        url: &str,
        revalidate_last_page: bool,
    ) -> Result<FetchedPage<T>> {
        url::Url::parse(url).map_err(|source| Error::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let identity = RequestIdentity::get(ctx, url);

        let mut decode_error = None;
        for pass in 0..2 {
            let Some((entry, source)) = self.load(ctx, &identity, revalidate_last_page).await?
            else {
                return Ok(FetchedPage::unavailable());
            };

            match serde_json::from_str::<T>(&entry.body) {
                Ok(value) => {
                    return Ok(FetchedPage {
                        value: Some(value),
                        next: entry.next_cursor(),
                        source,
                    })
                }
                Err(e) => {
                    if pass == 0 {
                        warn!(url, error = %e, "cache entry corrupted; removing and refetching");
                    }
                    self.cache.invalidate(&identity).await?;
                    decode_error = Some(e);
                }
            }
        }

        Err(Error::decode(
            url,
            decode_error.map_or_else(String::new, |e| e.to_string()),
        ))
    }

    /// Fetch every page of a collection, following cursors until none is left
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        ctx: &FetchContext,
        url: &str,
        revalidate_last_page: bool,
    ) -> Result<Vec<T>> {
        self.fetch_all_capped(ctx, url, revalidate_last_page, usize::MAX)
            .await
    }

    /// Like [`fetch_all`](Self::fetch_all), but stop requesting further pages
    /// once at least `max_items` items have been collected
    pub async fn fetch_all_capped<T: DeserializeOwned>(
        &self,
        ctx: &FetchContext,
        url: &str,
        revalidate_last_page: bool,
        max_items: usize,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut cursor = Some(url.to_string());
        let mut pages = 0usize;

        while let Some(page_url) = cursor.take() {
            if items.len() >= max_items {
                break;
            }
            let page = self
                .fetch::<Vec<T>>(ctx, &page_url, revalidate_last_page)
                .await?;
            pages += 1;
            let (value, next) = page.into_parts();
            items.extend(value.unwrap_or_default());
            cursor = next;
        }

        debug!(url, pages, items = items.len(), "collection fetched");
        Ok(items)
    }

    /// Cached entry or fresh network response, or `None` on soft failure
    async fn load(
        &self,
        ctx: &FetchContext,
        identity: &RequestIdentity,
        revalidate_last_page: bool,
    ) -> Result<Option<(CacheEntry, PageSource)>> {
        if let Some(entry) = self.cache.get(identity).await? {
            if !revalidate_last_page || !entry.is_last_page() {
                return Ok(Some((entry, PageSource::Cache)));
            }
            info!(url = %identity.url, "revalidating cached last page");
        }

        let Some(entry) = self.fetch_with_retry(ctx, identity).await else {
            return Ok(None);
        };

        if let Err(e) = self.cache.put(identity, &entry).await {
            warn!(url = %identity.url, error = %e, "failed to cache response; continuing uncached");
        }
        Ok(Some((entry, PageSource::Network)))
    }

    /// Run the executor through the backoff policy
    async fn fetch_with_retry(
        &self,
        ctx: &FetchContext,
        identity: &RequestIdentity,
    ) -> Option<CacheEntry> {
        let mut attempt = 0;
        loop {
            let outcome = self.executor.execute(ctx, identity).await;
            match self.policy.decide(attempt, outcome, Utc::now()) {
                Decision::Done(entry) => return Some(entry),
                Decision::Retry { wait, cause } => {
                    warn!(
                        url = %identity.url,
                        attempt = attempt + 1,
                        max_attempts = self.policy.max_attempts,
                        "{cause}; retrying in {wait:?}"
                    );
                    self.sleeper.sleep(wait).await;
                    attempt += 1;
                }
                Decision::GiveUp(reason) => {
                    warn!(url = %identity.url, "unable to fetch: {reason}");
                    return None;
                }
            }
        }
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("executor", &self.executor)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
