//! Backoff and rate-limit policy
//!
//! Decides, after every network attempt, whether to stop or to wait and try
//! again. Waits are handed to a [`Sleeper`], so every suspension point in the
//! engine goes through one place.

mod policy;
mod sleeper;

pub use policy::{BackoffPolicy, Decision, GiveUp, RetryCause};
pub use sleeper::{RecordingSleeper, Sleeper, TokioSleeper};
