//! HTTP executor module
//!
//! Performs a single GET and classifies what came back.
//!
//! # Features
//!
//! - **Fixed Headers**: User agent, accept-encoding, bearer token and an
//!   optional `Accept` override on every request
//! - **Classification**: Every attempt ends as exactly one [`FetchOutcome`]
//! - **Client-side Pacing**: Optional token bucket keyed by access token,
//!   so all fetches sharing a token share one quota

mod client;
mod outcome;
mod rate_limit;

pub(crate) use client::check_accept_encoding;
pub use client::{HttpClientConfig, HttpClientConfigBuilder, HttpExecutor};
pub use outcome::{
    classify, FetchOutcome, RATE_LIMIT_REMAINING_HEADER, RATE_LIMIT_RESET_HEADER,
};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
