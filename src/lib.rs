// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # stargazers-fetch
//!
//! A rate-limit-aware, disk-cached fetch engine for paginated GitHub API
//! collections: stargazers, their followers, starred and subscribed
//! repositories, contributor statistics.
//!
//! ## Features
//!
//! - **Cache First**: Every successful response is stored on disk and reused
//! - **Link Header Pagination**: `rel="next"` cursors drive collection walks
//! - **Quota Aware**: Exhausted quotas wait until the reset time, then resume
//! - **Soft Failures**: One unreachable URL never aborts a long traversal
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stargazers_fetch::{FetchConfig, FetchContext, Fetcher, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let fetcher = Fetcher::from_config(&FetchConfig::default())?;
//!     let ctx = FetchContext::new("cockroachdb/cockroach").with_token("ghp_...");
//!
//!     let mut cursor = Some("https://api.github.com/repos/cockroachdb/cockroach/stargazers".to_string());
//!     while let Some(url) = cursor {
//!         let page = fetcher.fetch::<Vec<serde_json::Value>>(&ctx, &url, true).await?;
//!         // Process page.value
//!         cursor = page.next;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │             Fetcher::fetch(ctx, url, revalidate)             │
//! └──────────────────────────────────────────────────────────────┘
//!          │                    │                      │
//! ┌────────┴───────┐  ┌─────────┴─────────┐  ┌─────────┴────────┐
//! │ ResponseCache  │  │   BackoffPolicy   │  │    Pagination    │
//! ├────────────────┤  ├───────────────────┤  ├──────────────────┤
//! │ DiskCache      │  │ Exponential wait  │  │ Link rel="next"  │
//! │ MemoryCache    │  │ Quota reset wait  │  │                  │
//! └────────────────┘  └─────────┬─────────┘  └──────────────────┘
//!                     ┌─────────┴─────────┐
//!                     │   HttpExecutor    │
//!                     │ classify(status)  │
//!                     └───────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Link header cursor extraction
pub mod pagination;

/// Response cache
pub mod cache;

/// HTTP executor, status classification and client-side pacing
pub mod http;

/// Backoff and rate-limit policy
pub mod retry;

/// Fetch orchestration
pub mod engine;

/// Engine configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use cache::{CacheEntry, DiskCache, MemoryCache, ResponseCache};
pub use config::FetchConfig;
pub use engine::{FetchedPage, Fetcher, PageSource};
pub use error::{Error, Result};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
