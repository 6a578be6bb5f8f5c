//! Attempt outcomes and status classification

use crate::cache::CacheEntry;
use crate::types::{HeaderMapping, RequestIdentity};
use chrono::{DateTime, Utc};
use std::fmt;

/// Remaining requests in the current quota window
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Unix second at which the quota window resets
pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

const DIAGNOSTIC_BODY_CHARS: usize = 200;

/// Result of one network attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 200 with its full response
    Success(CacheEntry),
    /// Quota exhausted until `reset_at`
    RateLimited {
        /// When the quota window resets
        reset_at: DateTime<Utc>,
    },
    /// Worth retrying after a short pause
    Transient {
        /// Human-readable cause
        cause: String,
    },
    /// Retrying this URL will not help
    Permanent {
        /// HTTP status code
        status: u16,
        /// Request and response summary
        diagnostic: String,
    },
}

impl FetchOutcome {
    /// Create a transient outcome
    pub fn transient(cause: impl Into<String>) -> Self {
        Self::Transient {
            cause: cause.into(),
        }
    }

    /// Whether the attempt produced a usable response
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOutcome::Success(entry) => write!(f, "HTTP {}", entry.status),
            FetchOutcome::RateLimited { reset_at } => {
                write!(f, "rate limit exceeded; resets at {reset_at}")
            }
            FetchOutcome::Transient { cause } => write!(f, "transient failure: {cause}"),
            FetchOutcome::Permanent { diagnostic, .. } => {
                write!(f, "permanent failure: {diagnostic}")
            }
        }
    }
}

/// Classify a complete response
///
/// - 200 is a success.
/// - 202 means the server is still computing (statistics endpoints); retry.
/// - 403 with zero quota remaining and a reset time is a rate limit.
/// - Everything else is permanent for this URL.
pub fn classify(
    identity: &RequestIdentity,
    status: u16,
    headers: HeaderMapping,
    body: String,
) -> FetchOutcome {
    match status {
        200 => FetchOutcome::Success(CacheEntry::new(status, headers, body)),
        202 => FetchOutcome::transient("202 Accepted; results are still being computed"),
        403 => match rate_limit_reset(&headers) {
            Some(reset_at) => FetchOutcome::RateLimited { reset_at },
            None => permanent(identity, status, &body),
        },
        _ => permanent(identity, status, &body),
    }
}

/// Reset time of an exhausted quota, if the headers report one
fn rate_limit_reset(headers: &HeaderMapping) -> Option<DateTime<Utc>> {
    let remaining: u64 = headers.get(RATE_LIMIT_REMAINING_HEADER)?.trim().parse().ok()?;
    if remaining != 0 {
        return None;
    }
    let reset: i64 = headers.get(RATE_LIMIT_RESET_HEADER)?.trim().parse().ok()?;
    DateTime::from_timestamp(reset, 0)
}

fn permanent(identity: &RequestIdentity, status: u16, body: &str) -> FetchOutcome {
    let mut snippet: String = body.chars().take(DIAGNOSTIC_BODY_CHARS).collect();
    if body.chars().count() > DIAGNOSTIC_BODY_CHARS {
        snippet.push_str("...");
    }
    FetchOutcome::Permanent {
        status,
        diagnostic: format!("{identity} -> HTTP {status}: {}", snippet.trim()),
    }
}
