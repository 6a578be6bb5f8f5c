//! Client-side request pacing
//!
//! The remote quota belongs to the access token, so the limiter is keyed by
//! token: every fetch using the same token draws from one bucket, no matter
//! how many traversals run. Uses the governor crate's keyed token bucket.

use governor::{DefaultKeyedRateLimiter, Quota};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Key used for unauthenticated requests
const ANONYMOUS: &str = "";

/// Configuration for client-side pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Sustained requests per second per token
    pub requests_per_second: u32,
    /// Requests allowed back to back before pacing kicks in
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

fn default_burst_size() -> u32 {
    1
}

impl RateLimiterConfig {
    /// Create a new pacing config
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
        }
    }

    /// GitHub's authenticated budget (5000/hour), spread evenly
    pub fn github_hourly() -> Self {
        Self {
            requests_per_second: 1,
            burst_size: 100,
        }
    }
}

/// Token bucket shared by all requests made with the same access token
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<DefaultKeyedRateLimiter<String>>,
}

impl RateLimiter {
    /// Create a new limiter with the given config
    pub fn new(config: &RateLimiterConfig) -> Self {
        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_second(per_second).allow_burst(burst);

        Self {
            limiter: Arc::new(DefaultKeyedRateLimiter::keyed(quota)),
        }
    }

    /// Wait until a request with `token` may be sent
    pub async fn wait(&self, token: Option<&str>) {
        let key = token.unwrap_or(ANONYMOUS).to_string();
        self.limiter.until_key_ready(&key).await;
    }

    /// Take a permit for `token` if one is available right now
    pub fn try_acquire(&self, token: Option<&str>) -> bool {
        let key = token.unwrap_or(ANONYMOUS).to_string();
        self.limiter.check_key(&key).is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}
