//! Retry state machine over classified attempts

use crate::cache::CacheEntry;
use crate::http::FetchOutcome;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Retry limits for one logical fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Network attempts per logical fetch, rate-limited ones included
    pub max_attempts: u32,
    /// Wait after the first transient failure
    pub initial_backoff: Duration,
    /// Upper bound for transient-failure waits
    pub max_backoff: Duration,
    /// Added to the quota reset time to absorb clock skew
    pub rate_limit_padding: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(1000),
            rate_limit_padding: Duration::from_secs(1),
        }
    }
}

/// Why another attempt is being made
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryCause {
    /// Quota exhausted until `reset_at`
    RateLimited {
        /// When the quota window resets
        reset_at: DateTime<Utc>,
    },
    /// Network trouble or a not-yet-ready response
    Transient {
        /// Human-readable cause
        cause: String,
    },
}

impl fmt::Display for RetryCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryCause::RateLimited { reset_at } => write!(
                f,
                "rate limit for this access token exceeded; resets at {}",
                reset_at.with_timezone(&chrono::Local)
            ),
            RetryCause::Transient { cause } => f.write_str(cause),
        }
    }
}

/// Why the policy stopped without a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GiveUp {
    /// The server answered with a status retrying cannot fix
    Permanent {
        /// HTTP status code
        status: u16,
        /// Request and response summary
        diagnostic: String,
    },
    /// Every attempt failed recoverably
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Cause of the final failure
        last: RetryCause,
    },
}

impl fmt::Display for GiveUp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GiveUp::Permanent { diagnostic, .. } => f.write_str(diagnostic),
            GiveUp::Exhausted { attempts, last } => {
                write!(f, "gave up after {attempts} attempts; last failure: {last}")
            }
        }
    }
}

/// What to do after an attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Use this response
    Done(CacheEntry),
    /// Wait, then make another attempt
    Retry {
        /// How long to wait first
        wait: Duration,
        /// Why the attempt failed
        cause: RetryCause,
    },
    /// Stop without a response
    GiveUp(GiveUp),
}

impl BackoffPolicy {
    /// Wait after the `attempt`-th (0-based) transient failure: the initial
    /// backoff doubled per attempt, capped at `max_backoff`
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let delay = self
            .initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff);
        std::cmp::min(delay, self.max_backoff)
    }

    /// Wait until `reset_at` plus padding, measured from `now`
    pub fn rate_limit_wait(&self, reset_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
        let padding =
            chrono::Duration::from_std(self.rate_limit_padding).unwrap_or(chrono::Duration::zero());
        let resume_at = reset_at + padding;
        (resume_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// Decide what follows the `attempt`-th (0-based) attempt
    pub fn decide(&self, attempt: u32, outcome: FetchOutcome, now: DateTime<Utc>) -> Decision {
        let cause = match outcome {
            FetchOutcome::Success(entry) => return Decision::Done(entry),
            FetchOutcome::Permanent { status, diagnostic } => {
                return Decision::GiveUp(GiveUp::Permanent { status, diagnostic })
            }
            FetchOutcome::RateLimited { reset_at } => RetryCause::RateLimited { reset_at },
            FetchOutcome::Transient { cause } => RetryCause::Transient { cause },
        };

        let attempts = attempt + 1;
        if attempts >= self.max_attempts {
            return Decision::GiveUp(GiveUp::Exhausted {
                attempts,
                last: cause,
            });
        }

        let wait = match &cause {
            RetryCause::RateLimited { reset_at } => self.rate_limit_wait(*reset_at, now),
            RetryCause::Transient { .. } => self.backoff_for(attempt),
        };
        Decision::Retry { wait, cause }
    }
}
